use indexmap::IndexMap;

use crate::error::DivisionFailure;
use crate::models::{DivisionInvoice, InvoiceStats, InvoiceStatus, DIVISIONS};
use crate::services::fetch::DivisionFetch;

/// Concatenation-mode merge result: every successful division's records in
/// canonical division order, plus the divisions that failed.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub invoices: Vec<DivisionInvoice>,
    pub failed: Vec<DivisionFailure>,
}

impl MergeOutcome {
    /// True when at least one division failed but others still delivered.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Deduplication-mode merge result. `invoices` is the distinct-by-number
/// view in first-seen order; `stats` counts the raw stream before
/// deduplication, so totals reflect volume while the list reflects
/// distinct business invoices.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub stats: InvoiceStats,
    pub invoices: Vec<DivisionInvoice>,
    pub failed: Vec<DivisionFailure>,
}

impl DedupOutcome {
    /// The trailing `n` distinct invoices, the dashboard's recent window.
    pub fn recent(&self, n: usize) -> &[DivisionInvoice] {
        let start = self.invoices.len().saturating_sub(n);
        &self.invoices[start..]
    }
}

/// Concatenates successful divisions in canonical order, keeping each
/// division's internal order. A failed division is skipped and recorded,
/// never fatal.
pub fn merge_concat(fetches: Vec<DivisionFetch>) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    for fetch in in_canonical_order(fetches) {
        match fetch.outcome {
            Ok(invoices) => outcome.invoices.extend(invoices),
            Err(error) => outcome.failed.push(DivisionFailure {
                division: fetch.division,
                error,
            }),
        }
    }
    outcome
}

/// First-seen-wins deduplication by `invoice_number` over canonical
/// division order. When the same number appears in two divisions, the
/// earlier division's record is kept, regardless of which request answered
/// first. Stats are accumulated on the raw stream before deduplication.
pub fn merge_dedup(fetches: Vec<DivisionFetch>) -> DedupOutcome {
    let mut stats = InvoiceStats::default();
    let mut distinct: IndexMap<String, DivisionInvoice> = IndexMap::new();
    let mut failed = Vec::new();

    for fetch in in_canonical_order(fetches) {
        match fetch.outcome {
            Ok(invoices) => {
                stats.submitted += invoices.len();
                for record in invoices {
                    match record.invoice.status {
                        InvoiceStatus::Approved => stats.processed += 1,
                        InvoiceStatus::Pending => stats.pending += 1,
                    }
                    distinct
                        .entry(record.invoice.invoice_number.clone())
                        .or_insert(record);
                }
            }
            Err(error) => failed.push(DivisionFailure {
                division: fetch.division,
                error,
            }),
        }
    }

    DedupOutcome {
        stats,
        invoices: distinct.into_values().collect(),
        failed,
    }
}

/// Reorders fetch results to canonical division order. The fetch layer
/// already yields them this way; re-sorting here keeps the tie-break
/// independent of the caller's assembly order.
fn in_canonical_order(mut fetches: Vec<DivisionFetch>) -> Vec<DivisionFetch> {
    fetches.sort_by_key(|fetch| {
        DIVISIONS
            .iter()
            .position(|&d| d == fetch.division)
            .unwrap_or(DIVISIONS.len())
    });
    fetches
}
