mod bootstrap;

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use ledger_core::error::LedgerError;
use ledger_core::settings::{Cli, Command, CostArgs};
use ledger_data::aggregator::UsageAggregator;
use ledger_data::reader::{load_usage_file, load_user_map};
use ledger_data::report::{render_json, render_summary, write_json};

fn main() -> Result<()> {
    let cli = Cli::parse();

    bootstrap::setup_logging(cli.effective_log_level(), cli.log_file.as_deref())?;
    tracing::info!("usage-ledger v{} starting", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Command::Cost(args) => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            run_cost(args, &mut out)?;
            out.flush()?;
        }
    }

    Ok(())
}

/// Load the inputs named by `args`, aggregate them and emit the report.
///
/// JSON goes to `--output` when set. Stdout receives the summary table with
/// `--summary`, the JSON report when there is no `--output`, and nothing
/// otherwise.
fn run_cost(args: &CostArgs, out: &mut impl Write) -> Result<()> {
    let prices = args.price_table().context("Failed to load price table")?;

    let names = args
        .user_map
        .as_deref()
        .map(load_user_map)
        .transpose()
        .context("Failed to load user map")?;

    let records = load_usage_file(&args.usage_file).with_context(|| {
        format!("Failed to load usage file {}", args.usage_file.display())
    })?;
    tracing::info!(
        "Loaded {} usage records from {}",
        records.len(),
        args.usage_file.display()
    );

    let report = match UsageAggregator::aggregate(&records, names.as_ref(), &prices) {
        Ok(report) => report,
        Err(e @ LedgerError::UnknownPricingKey(_)) => {
            return Err(anyhow::Error::new(e).context(format!(
                "Failed to calculate usage cost (priced models: {})",
                prices.model_names().join(", ")
            )));
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to calculate usage cost")),
    };

    if let Some(path) = &args.output {
        write_json(path, &report)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    if args.summary {
        write!(out, "{}", render_summary(&report))?;
    } else if args.output.is_none() {
        writeln!(out, "{}", render_json(&report)?)?;
    }

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
