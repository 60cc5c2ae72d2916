use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Result;
use crate::pricing::PriceTable;

// ── Cli ────────────────────────────────────────────────────────────────────────

/// Cost accounting for OpenAI organisation usage exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "usage-ledger",
    about = "Cost accounting for OpenAI organisation usage exports",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level
    #[arg(
        long,
        global = true,
        default_value = "WARNING",
        value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"]
    )]
    pub log_level: String,

    /// Log file path (defaults to stderr)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Calculate the cost of each user in an organization.
    Cost(CostArgs),
}

/// Arguments for the `cost` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CostArgs {
    /// The path to the user map JSON file, which defines the mapping from
    /// user IDs to names.
    #[arg(long)]
    pub user_map: Option<PathBuf>,

    /// The path to the output JSON file.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// A price table JSON file whose models replace the built-in rates.
    #[arg(long, env = "USAGE_LEDGER_PRICES")]
    pub prices: Option<PathBuf>,

    /// Print a per-user summary table instead of JSON on stdout.
    #[arg(long)]
    pub summary: bool,

    /// The path to the usage CSV file, as exported from the OpenAI usage page.
    #[arg(value_name = "USAGE_FILE")]
    pub usage_file: PathBuf,
}

impl Cli {
    /// The effective log level, with `--debug` taking precedence.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }
}

impl CostArgs {
    /// Build the price table for this run.
    ///
    /// The built-in rates are overlaid with, in order of preference, the
    /// `--prices` file (which must load) or the per-user default file
    /// (skipped with a warning when unreadable).
    pub fn price_table(&self) -> Result<PriceTable> {
        Self::price_table_from(self.prices.as_deref(), &default_pricing_path())
    }

    /// Same as [`price_table`](Self::price_table) with an explicit default
    /// path, so tests can point it at a temporary directory.
    pub fn price_table_from(explicit: Option<&Path>, default_path: &Path) -> Result<PriceTable> {
        let base = PriceTable::default();

        if let Some(path) = explicit {
            info!("Using price overrides from {}", path.display());
            return Ok(base.with_overrides(PriceTable::load_from(path)?));
        }

        if default_path.exists() {
            match PriceTable::load_from(default_path) {
                Ok(overrides) => {
                    info!("Using price overrides from {}", default_path.display());
                    return Ok(base.with_overrides(overrides));
                }
                Err(e) => warn!("Ignoring {}: {}", default_path.display(), e),
            }
        }

        Ok(base)
    }
}

/// `~/.usage-ledger/pricing.json`
pub fn default_pricing_path() -> PathBuf {
    default_pricing_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
}

/// The default price override file rooted at `base_dir`.
pub fn default_pricing_path_in(base_dir: &Path) -> PathBuf {
    base_dir.join(".usage-ledger").join("pricing.json")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
