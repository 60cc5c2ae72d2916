use std::path::PathBuf;
use thiserror::Error;

/// A price-table lookup that found no entry for a usage record.
///
/// Both variants carry the full `(model, usage_type)` pair so the caller can
/// tell which level of the table needs fixing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// The model has no entry in the price table at all.
    #[error("Unknown model: {model}")]
    UnknownModel { model: String, usage_type: String },

    /// The model is priced, but not for this usage type.
    #[error("Unknown usage type: {usage_type} for model {model}")]
    UnknownUsageType { model: String, usage_type: String },
}

impl PricingError {
    /// The model named by the offending record.
    pub fn model(&self) -> &str {
        match self {
            Self::UnknownModel { model, .. } | Self::UnknownUsageType { model, .. } => model,
        }
    }

    /// The usage type named by the offending record.
    pub fn usage_type(&self) -> &str {
        match self {
            Self::UnknownModel { usage_type, .. } | Self::UnknownUsageType { usage_type, .. } => {
                usage_type
            }
        }
    }
}

/// All errors produced by the ledger crates.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A usage record referenced a `(model, usage_type)` pair with no price.
    #[error(transparent)]
    UnknownPricingKey(#[from] PricingError),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A row of the usage export could not be turned into a record.
    #[error("Malformed usage row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// A cumulative request or token count no longer fits in a `u64`.
    #[error("{counter} count overflowed for user {user_id} on model {model}")]
    CountOverflow {
        user_id: String,
        model: String,
        counter: &'static str,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the ledger crates.
pub type Result<T> = std::result::Result<T, LedgerError>;
