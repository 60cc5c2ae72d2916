use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Mapping from billed user id to a human-readable display name.
pub type UserMap = HashMap<String, String>;

/// Per-user aggregates keyed by user id, sorted for stable output.
pub type UsageReport = BTreeMap<String, UserUsage>;

/// One row of an organisation usage export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUsageRecord {
    /// Organisation the row was billed to. Not used for aggregation.
    pub organization_id: String,
    /// Number of API calls represented by this row.
    pub request_count: u64,
    /// Operation tag such as `"completion"`. Not used for aggregation.
    pub operation: String,
    /// Prompt (context) tokens for this row.
    pub input_token_count: u64,
    /// Generated tokens for this row.
    pub output_token_count: u64,
    /// Selects the pricing sub-table, e.g. `"text"`.
    pub usage_type: String,
    /// Model identifier as it appears in the price table.
    pub model: String,
    /// When the usage occurred.
    pub timestamp: DateTime<Utc>,
    /// Billed user id.
    pub user_id: String,
}

/// Running totals for one model within one user's usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub model: String,
    pub n_requests: u64,
    pub n_input_tokens: u64,
    pub n_output_tokens: u64,
    /// USD, derived from the cumulative token counts.
    pub cost: f64,
}

impl ModelUsage {
    /// A zeroed aggregate for `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            n_requests: 0,
            n_input_tokens: 0,
            n_output_tokens: 0,
            cost: 0.0,
        }
    }
}

/// Everything one user consumed during the export window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserUsage {
    /// Display name, or the raw id when no mapping exists.
    pub name: String,
    pub id: String,
    /// Earliest timestamp seen for this user.
    #[serde(with = "millis_rfc3339")]
    pub start: DateTime<Utc>,
    /// Latest timestamp seen for this user.
    #[serde(with = "millis_rfc3339")]
    pub end: DateTime<Utc>,
    pub models: BTreeMap<String, ModelUsage>,
    /// USD, the sum of every model's cost.
    pub cost: f64,
}

impl UserUsage {
    /// A user aggregate with no models yet and a zero-width period at
    /// `timestamp`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            start: timestamp,
            end: timestamp,
            models: BTreeMap::new(),
            cost: 0.0,
        }
    }

    // The per-user totals saturate at `u64::MAX`. Each model's own
    // counts are overflow-checked while folding, their sum is not.

    /// Total requests across all models.
    pub fn total_requests(&self) -> u64 {
        self.models.values().fold(0, |acc: u64, m| acc.saturating_add(m.n_requests))
    }

    /// Total input tokens across all models.
    pub fn total_input_tokens(&self) -> u64 {
        self.models.values().fold(0, |acc: u64, m| acc.saturating_add(m.n_input_tokens))
    }

    /// Total output tokens across all models.
    pub fn total_output_tokens(&self) -> u64 {
        self.models.values().fold(0, |acc: u64, m| acc.saturating_add(m.n_output_tokens))
    }
}

/// Report timestamps as RFC 3339 UTC with exactly three fractional digits,
/// e.g. `2023-11-14T22:13:20.000Z`.
mod millis_rfc3339 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
