//! Usage-export and name-map loading.
//!
//! The usage export is the comma-separated file offered by the OpenAI usage
//! page. Its header row is skipped and the columns are read positionally:
//!
//! ```text
//! organization_id,n_requests,operation,n_context_tokens_total,
//! n_generated_tokens_total,usage_type,model,timestamp,user
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use ledger_core::error::{LedgerError, Result};
use ledger_core::models::{RawUsageRecord, UserMap};
use tracing::debug;

/// Number of positional columns a usage row must provide.
pub const USAGE_COLUMNS: usize = 9;

// ── Public API ────────────────────────────────────────────────────────────────

/// Read and parse a usage export from disk.
pub fn load_usage_file(path: &Path) -> Result<Vec<RawUsageRecord>> {
    let content = read_file(path)?;
    let records = parse_usage_csv(&content)?;
    debug!("Parsed {} usage rows from {}", records.len(), path.display());
    Ok(records)
}

/// Parse the text of a usage export into records, preserving row order.
///
/// Blank lines are ignored and the first non-blank line is treated as the
/// header. Columns beyond the ninth are ignored. Any row that is too short
/// or carries a non-numeric count fails the whole parse.
pub fn parse_usage_csv(content: &str) -> Result<Vec<RawUsageRecord>> {
    let mut records = Vec::new();
    let mut header_seen = false;

    for (index, raw_line) in content.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() {
            continue;
        }
        if !header_seen {
            header_seen = true;
            continue;
        }
        records.push(parse_row(line, index + 1)?);
    }

    Ok(records)
}

/// Load a flat JSON object mapping user ids to display names.
pub fn load_user_map(path: &Path) -> Result<UserMap> {
    let content = read_file(path)?;
    let map: UserMap = serde_json::from_str(&content)?;
    debug!("Loaded {} user names from {}", map.len(), path.display());
    Ok(map)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| LedgerError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Split one data row and convert its columns. `line` is 1-based.
fn parse_row(text: &str, line: usize) -> Result<RawUsageRecord> {
    let cols: Vec<&str> = text.split(',').map(str::trim).collect();
    if cols.len() < USAGE_COLUMNS {
        return Err(LedgerError::MalformedRow {
            line,
            reason: format!("expected {} columns, found {}", USAGE_COLUMNS, cols.len()),
        });
    }

    Ok(RawUsageRecord {
        organization_id: cols[0].to_string(),
        request_count: parse_count(cols[1], "n_requests", line)?,
        operation: cols[2].to_string(),
        input_token_count: parse_count(cols[3], "n_context_tokens_total", line)?,
        output_token_count: parse_count(cols[4], "n_generated_tokens_total", line)?,
        usage_type: cols[5].to_string(),
        model: cols[6].to_string(),
        timestamp: parse_epoch_seconds(cols[7], line)?,
        user_id: cols[8].to_string(),
    })
}

fn parse_count(value: &str, column: &str, line: usize) -> Result<u64> {
    value.parse::<u64>().map_err(|e| LedgerError::MalformedRow {
        line,
        reason: format!("{column} {value:?} is not a non-negative integer: {e}"),
    })
}

/// Unix epoch seconds. Fractional seconds are truncated.
fn parse_epoch_seconds(value: &str, line: usize) -> Result<DateTime<Utc>> {
    let secs = match value.parse::<i64>() {
        Ok(secs) => Some(secs),
        Err(_) => value
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64),
    };

    secs.and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or_else(|| LedgerError::MalformedRow {
            line,
            reason: format!("timestamp {value:?} is not a Unix epoch in seconds"),
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const HEADER: &str = "organization_id,n_requests,operation,n_context_tokens_total,n_generated_tokens_total,usage_type,model,timestamp,user";

    fn row(requests: u64, input: u64, output: u64, model: &str, ts: i64, user: &str) -> String {
        format!("org-1,{requests},completion,{input},{output},text,{model},{ts},{user}")
    }

    // ── parse_usage_csv ───────────────────────────────────────────────────────

    #[test]
    fn test_parse_basic_rows() {
        let content = format!(
            "{HEADER}\n{}\n{}\n",
            row(1, 500, 0, "gpt-4", 1_700_000_000, "user-a"),
            row(2, 10, 20, "gpt-3.5-turbo-0613", 1_700_000_060, "user-b"),
        );
        let records = parse_usage_csv(&content).unwrap();

        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.organization_id, "org-1");
        assert_eq!(first.request_count, 1);
        assert_eq!(first.operation, "completion");
        assert_eq!(first.input_token_count, 500);
        assert_eq!(first.output_token_count, 0);
        assert_eq!(first.usage_type, "text");
        assert_eq!(first.model, "gpt-4");
        assert_eq!(
            first.timestamp,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        );
        assert_eq!(first.user_id, "user-a");
        assert_eq!(records[1].user_id, "user-b");
    }

    #[test]
    fn test_parse_header_only() {
        let records = parse_usage_csv(&format!("{HEADER}\n")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_empty_content() {
        assert!(parse_usage_csv("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_skips_blank_lines_and_crlf() {
        let content = format!(
            "\n{HEADER}\r\n\r\n{}\r\n\n",
            row(1, 1, 1, "gpt-4", 1_700_000_000, "user-a")
        );
        let records = parse_usage_csv(&content).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "user-a");
    }

    #[test]
    fn test_parse_preserves_row_order() {
        let content = format!(
            "{HEADER}\n{}\n{}\n{}",
            row(1, 1, 1, "gpt-4", 1_700_000_300, "c"),
            row(1, 1, 1, "gpt-4", 1_700_000_100, "a"),
            row(1, 1, 1, "gpt-4", 1_700_000_200, "b"),
        );
        let users: Vec<String> = parse_usage_csv(&content)
            .unwrap()
            .into_iter()
            .map(|r| r.user_id)
            .collect();
        assert_eq!(users, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_parse_ignores_extra_columns() {
        let content = format!(
            "{HEADER}\n{},extra,columns",
            row(3, 1, 1, "gpt-4", 1_700_000_000, "user-a")
        );
        let records = parse_usage_csv(&content).unwrap();
        assert_eq!(records[0].request_count, 3);
        assert_eq!(records[0].user_id, "user-a");
    }

    #[test]
    fn test_parse_fractional_timestamp_truncates() {
        let content = format!(
            "{HEADER}\norg-1,1,completion,1,1,text,gpt-4,1700000000.75,user-a"
        );
        let records = parse_usage_csv(&content).unwrap();
        assert_eq!(
            records[0].timestamp,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_short_row_fails_with_line_number() {
        let content = format!(
            "{HEADER}\n{}\norg-1,1,completion",
            row(1, 1, 1, "gpt-4", 1_700_000_000, "user-a")
        );
        let err = parse_usage_csv(&content).unwrap_err();
        match err {
            LedgerError::MalformedRow { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("expected 9 columns, found 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_non_numeric_tokens_fails() {
        let content = format!("{HEADER}\norg-1,1,completion,lots,1,text,gpt-4,1700000000,user-a");
        let err = parse_usage_csv(&content).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedRow { line: 2, .. }));
        assert!(err.to_string().contains("n_context_tokens_total"));
    }

    #[test]
    fn test_parse_bad_timestamp_fails() {
        let content = format!("{HEADER}\norg-1,1,completion,1,1,text,gpt-4,yesterday,user-a");
        let err = parse_usage_csv(&content).unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    // ── load_usage_file ───────────────────────────────────────────────────────

    #[test]
    fn test_load_usage_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.csv");
        let content = format!("{HEADER}\n{}\n", row(4, 10, 5, "gpt-4", 1_700_000_000, "u"));
        std::fs::write(&path, content).unwrap();

        let records = load_usage_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request_count, 4);
    }

    #[test]
    fn test_load_usage_file_missing() {
        let dir = TempDir::new().unwrap();
        let err = load_usage_file(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, LedgerError::FileRead { .. }));
    }

    // ── load_user_map ─────────────────────────────────────────────────────────

    #[test]
    fn test_load_user_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"{"user-a": "Alice", "user-b": "Bob"}"#).unwrap();

        let map = load_user_map(&path).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["user-a"], "Alice");
    }

    #[test]
    fn test_load_user_map_rejects_non_string_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"{"user-a": 7}"#).unwrap();

        let err = load_user_map(&path).unwrap_err();
        assert!(matches!(err, LedgerError::JsonParse(_)));
    }
}
