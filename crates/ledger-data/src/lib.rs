//! Data layer for the usage ledger.
//!
//! Reads usage exports and name maps, folds usage records into per-user
//! cost aggregates and renders the resulting report.

pub mod aggregator;
pub mod reader;
pub mod report;

pub use ledger_core as core;
