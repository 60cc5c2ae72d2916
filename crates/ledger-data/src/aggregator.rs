//! Per-user, per-model usage aggregation and costing.

use ledger_core::error::{LedgerError, Result};
use ledger_core::models::{ModelUsage, RawUsageRecord, UsageReport, UserMap, UserUsage};
use ledger_core::pricing::PriceTable;
use serde::Serialize;
use tracing::debug;

// ── UsageAccumulator ──────────────────────────────────────────────────────────

/// Running state of one aggregation pass.
///
/// Records are folded in arrival order. A model's cost is always recomputed
/// from its cumulative token counts, and a user's cost is always the re-sum of
/// its model costs, so the final snapshot does not depend on record order or
/// on how the token volume was split across rows.
pub struct UsageAccumulator<'a> {
    prices: &'a PriceTable,
    names: Option<&'a UserMap>,
    users: UsageReport,
    records_folded: usize,
}

impl<'a> UsageAccumulator<'a> {
    pub fn new(prices: &'a PriceTable, names: Option<&'a UserMap>) -> Self {
        Self {
            prices,
            names,
            users: UsageReport::new(),
            records_folded: 0,
        }
    }

    /// Fold one record into the running totals.
    ///
    /// Fails without touching any aggregate when the record's
    /// `(model, usage_type)` pair is not priced or when one of the model's
    /// cumulative counts would overflow.
    pub fn fold_record(&mut self, record: &RawUsageRecord) -> Result<()> {
        let prices = self.prices;
        let pricing = prices.lookup(&record.model, &record.usage_type)?;
        let (n_requests, n_input_tokens, n_output_tokens) = self.next_counts(record)?;

        let names = self.names;
        let user = self
            .users
            .entry(record.user_id.clone())
            .or_insert_with(|| {
                let name = names
                    .and_then(|m| m.get(&record.user_id))
                    .cloned()
                    .unwrap_or_else(|| record.user_id.clone());
                UserUsage::new(record.user_id.clone(), name, record.timestamp)
            });

        if record.timestamp < user.start {
            user.start = record.timestamp;
        }
        if record.timestamp > user.end {
            user.end = record.timestamp;
        }

        let model = user
            .models
            .entry(record.model.clone())
            .or_insert_with(|| ModelUsage::new(record.model.clone()));

        model.n_requests = n_requests;
        model.n_input_tokens = n_input_tokens;
        model.n_output_tokens = n_output_tokens;
        model.cost = pricing.cost(model.n_input_tokens, model.n_output_tokens);

        user.cost = user.models.values().map(|m| m.cost).sum();

        self.records_folded += 1;
        Ok(())
    }

    /// The model's cumulative counts once `record` is added to them.
    fn next_counts(&self, record: &RawUsageRecord) -> Result<(u64, u64, u64)> {
        let current = self
            .users
            .get(&record.user_id)
            .and_then(|u| u.models.get(&record.model));
        let (requests, input, output) = current
            .map(|m| (m.n_requests, m.n_input_tokens, m.n_output_tokens))
            .unwrap_or_default();

        let add = |total: u64, delta: u64, counter: &'static str| {
            total
                .checked_add(delta)
                .ok_or_else(|| LedgerError::CountOverflow {
                    user_id: record.user_id.clone(),
                    model: record.model.clone(),
                    counter,
                })
        };

        Ok((
            add(requests, record.request_count, "request")?,
            add(input, record.input_token_count, "input token")?,
            add(output, record.output_token_count, "output token")?,
        ))
    }

    /// Number of records folded so far.
    pub fn records_folded(&self) -> usize {
        self.records_folded
    }

    /// Hand back the completed per-user mapping.
    pub fn finish(self) -> UsageReport {
        self.users
    }
}

// ── ReportTotals ──────────────────────────────────────────────────────────────

/// Organisation-wide sums over a [`UsageReport`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportTotals {
    pub users: usize,
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

// ── UsageAggregator ───────────────────────────────────────────────────────────

/// Stateless entry points over [`UsageAccumulator`].
pub struct UsageAggregator;

impl UsageAggregator {
    /// Fold `records` into per-user aggregates priced against `prices`.
    ///
    /// Display names come from `names` when the user id is present there and
    /// fall back to the raw id otherwise. The first record whose
    /// `(model, usage_type)` is missing from `prices` aborts the run and no
    /// partial result is returned.
    pub fn aggregate<'r>(
        records: impl IntoIterator<Item = &'r RawUsageRecord>,
        names: Option<&UserMap>,
        prices: &PriceTable,
    ) -> Result<UsageReport> {
        let mut acc = UsageAccumulator::new(prices, names);
        for record in records {
            acc.fold_record(record)?;
        }

        debug!("Aggregated {} usage records", acc.records_folded());
        let report = acc.finish();
        debug!("Report covers {} users", report.len());
        Ok(report)
    }

    /// Sum every user in `report` into a single [`ReportTotals`].
    ///
    /// Counts saturate at `u64::MAX`; they are display totals only.
    pub fn calculate_totals(report: &UsageReport) -> ReportTotals {
        let mut totals = ReportTotals {
            users: report.len(),
            ..ReportTotals::default()
        };
        for user in report.values() {
            totals.requests = totals.requests.saturating_add(user.total_requests());
            totals.input_tokens = totals.input_tokens.saturating_add(user.total_input_tokens());
            totals.output_tokens = totals.output_tokens.saturating_add(user.total_output_tokens());
            totals.cost += user.cost;
        }
        totals
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
