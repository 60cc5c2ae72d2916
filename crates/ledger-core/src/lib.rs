//! Core types for the usage ledger: usage records and aggregates, the
//! two-level price table, the shared error type, display formatting and
//! command-line settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod pricing;
pub mod settings;

pub use error::{LedgerError, PricingError, Result};
