//! Rendering and writing of aggregated usage reports.

use std::path::Path;

use ledger_core::error::Result;
use ledger_core::formatting::{fit_left, fit_right, format_currency, format_period, format_tokens};
use ledger_core::models::{UsageReport, UserUsage};
use tracing::{info, warn};

use crate::aggregator::UsageAggregator;

const NAME_WIDTH: usize = 24;
const COUNT_WIDTH: usize = 12;
const COST_WIDTH: usize = 12;
const COST_DECIMALS: u32 = 4;

/// Pretty-print a report as JSON with two-space indentation.
pub fn render_json(report: &UsageReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write a report as pretty JSON to `path`, creating parent directories.
///
/// The file is written next to its destination and renamed into place. The
/// temporary file is removed again when the rename fails.
pub fn write_json(path: &Path, report: &UsageReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = render_json(report)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        warn!("Failed to move report into {}: {}", path.display(), e);
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }

    info!("Wrote usage report for {} users to {}", report.len(), path.display());
    Ok(())
}

/// Render a plain-text table with one row per user, most expensive first,
/// followed by a totals row.
pub fn render_summary(report: &UsageReport) -> String {
    let mut users: Vec<&UserUsage> = report.values().collect();
    users.sort_by(|a, b| b.cost.total_cmp(&a.cost).then_with(|| a.id.cmp(&b.id)));

    let mut out = String::new();
    out.push_str(&summary_line(
        "User",
        "Requests",
        "Input",
        "Output",
        "Cost",
        "Period (UTC)",
    ));
    let rule_width = NAME_WIDTH + 3 * (COUNT_WIDTH + 1) + COST_WIDTH + 1;
    out.push_str(&"─".repeat(rule_width));
    out.push('\n');

    for user in &users {
        out.push_str(&summary_line(
            &user.name,
            &format_tokens(user.total_requests()),
            &format_tokens(user.total_input_tokens()),
            &format_tokens(user.total_output_tokens()),
            &format_currency(user.cost, COST_DECIMALS),
            &format_period(user.start, user.end),
        ));
    }

    let totals = UsageAggregator::calculate_totals(report);
    out.push_str(&"─".repeat(rule_width));
    out.push('\n');
    out.push_str(&summary_line(
        &format!("Total ({} users)", totals.users),
        &format_tokens(totals.requests),
        &format_tokens(totals.input_tokens),
        &format_tokens(totals.output_tokens),
        &format_currency(totals.cost, COST_DECIMALS),
        "",
    ));
    out
}

fn summary_line(
    name: &str,
    requests: &str,
    input: &str,
    output: &str,
    cost: &str,
    period: &str,
) -> String {
    let line = format!(
        "{} {} {} {} {}  {}",
        fit_left(name, NAME_WIDTH),
        fit_right(requests, COUNT_WIDTH),
        fit_right(input, COUNT_WIDTH),
        fit_right(output, COUNT_WIDTH),
        fit_right(cost, COST_WIDTH),
        period,
    );
    format!("{}\n", line.trim_end())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
