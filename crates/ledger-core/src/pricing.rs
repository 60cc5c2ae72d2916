use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, PricingError, Result};

/// A price quoted per block of tokens, e.g. `$0.03` per `1000` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchPrice {
    /// USD charged for one batch.
    pub cost: f64,
    /// Number of tokens in one batch.
    pub tokens: u64,
}

impl BatchPrice {
    pub const fn new(cost: f64, tokens: u64) -> Self {
        Self { cost, tokens }
    }

    /// Price `token_count` tokens at this rate. Fractional batches are
    /// charged proportionally.
    pub fn cost_of(&self, token_count: u64) -> f64 {
        (token_count as f64 / self.tokens as f64) * self.cost
    }
}

/// Input and output rates for one `(model, usage_type)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageTypePricing {
    pub input: BatchPrice,
    pub output: BatchPrice,
}

impl UsageTypePricing {
    pub const fn new(input: BatchPrice, output: BatchPrice) -> Self {
        Self { input, output }
    }

    /// Cost in USD of the given cumulative token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        self.input.cost_of(input_tokens) + self.output.cost_of(output_tokens)
    }
}

// ── Built-in rates (USD per 1000 tokens) ─────────────────────────────────────

fn text_pricing(input_per_1k: f64, output_per_1k: f64) -> HashMap<String, UsageTypePricing> {
    let mut by_usage_type = HashMap::new();
    by_usage_type.insert(
        "text".to_string(),
        UsageTypePricing::new(
            BatchPrice::new(input_per_1k, 1000),
            BatchPrice::new(output_per_1k, 1000),
        ),
    );
    by_usage_type
}

fn default_price_map() -> HashMap<String, HashMap<String, UsageTypePricing>> {
    let mut map = HashMap::new();
    map.insert("gpt-4-1106-preview".to_string(), text_pricing(0.01, 0.03));
    map.insert("gpt-4".to_string(), text_pricing(0.03, 0.06));
    map.insert("gpt-4-0613".to_string(), text_pricing(0.03, 0.06));
    map.insert("gpt4-32k".to_string(), text_pricing(0.06, 0.12));
    map.insert("gpt-3.5-turbo-1106".to_string(), text_pricing(0.001, 0.002));
    map.insert("gpt-3.5-turbo-0613".to_string(), text_pricing(0.001, 0.002));
    map.insert("gpt-3.5-turbo-16k-0613".to_string(), text_pricing(0.001, 0.002));
    map.insert("gpt-3.5-turbo-0301".to_string(), text_pricing(0.001, 0.002));
    map.insert("gpt-3.5-turbo-instruct".to_string(), text_pricing(0.0015, 0.002));
    map
}

/// Two-level price lookup: model name → usage type → rates.
///
/// The JSON form is the nested object itself:
///
/// ```json
/// { "gpt-4": { "text": { "input":  { "cost": 0.03, "tokens": 1000 },
///                        "output": { "cost": 0.06, "tokens": 1000 } } } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    models: HashMap<String, HashMap<String, UsageTypePricing>>,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            models: default_price_map(),
        }
    }
}

impl PriceTable {
    /// A table with no entries. Every lookup against it fails.
    pub fn empty() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    /// Add or replace the rates for one `(model, usage_type)` pair.
    pub fn insert(
        &mut self,
        model: impl Into<String>,
        usage_type: impl Into<String>,
        pricing: UsageTypePricing,
    ) {
        self.models
            .entry(model.into())
            .or_default()
            .insert(usage_type.into(), pricing);
    }

    /// Resolve the rates for a record.
    ///
    /// A missing model and a missing usage type are reported separately so
    /// the caller knows which level of the table to fix.
    pub fn lookup(
        &self,
        model: &str,
        usage_type: &str,
    ) -> std::result::Result<&UsageTypePricing, PricingError> {
        let by_usage_type = self
            .models
            .get(model)
            .ok_or_else(|| PricingError::UnknownModel {
                model: model.to_string(),
                usage_type: usage_type.to_string(),
            })?;

        by_usage_type
            .get(usage_type)
            .ok_or_else(|| PricingError::UnknownUsageType {
                model: model.to_string(),
                usage_type: usage_type.to_string(),
            })
    }

    /// Model names in sorted order.
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Merge `overrides` on top of this table. A model present in
    /// `overrides` replaces this table's entry for that model wholesale.
    pub fn with_overrides(mut self, overrides: PriceTable) -> Self {
        for (model, by_usage_type) in overrides.models {
            self.models.insert(model, by_usage_type);
        }
        self
    }

    /// Parse a price table from JSON and reject zero-sized batches.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let table: PriceTable = serde_json::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    /// Read and parse a price table file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| LedgerError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json_str(&content)?;
        debug!(
            "Loaded pricing for {} models from {}",
            table.models.len(),
            path.display()
        );
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        for (model, by_usage_type) in &self.models {
            for (usage_type, pricing) in by_usage_type {
                if pricing.input.tokens == 0 || pricing.output.tokens == 0 {
                    return Err(LedgerError::Config(format!(
                        "batch size for {model}/{usage_type} must be greater than zero"
                    )));
                }
            }
        }
        Ok(())
    }
}
