use crate::error::{ApiError, DivisionFailure};
use crate::models::{DivisionInvoice, InvoiceStats};
use crate::services::auth::AuthContext;
use crate::services::client::{ApiClient, InvoiceQuery};
use crate::services::export::{dashboard_rows, export, ExportFormat};
use crate::services::fetch::fetch_all_divisions;
use crate::services::merge::merge_dedup;
use crate::utils::DateRange;

/// Everything the dashboard shows for one date window.
#[derive(Debug)]
pub struct DashboardData {
    pub range: DateRange,
    pub stats: InvoiceStats,
    pub recent: Vec<DivisionInvoice>,
    pub failed: Vec<DivisionFailure>,
}

/// How many distinct invoices the recent list shows.
const RECENT_WINDOW: usize = 10;

/// Fetches every division for the window, deduplicates by invoice number,
/// and reduces the raw stream to counters. Divisions that failed are
/// reported back so the caller can show a banner next to the data that
/// did arrive.
pub async fn load_dashboard(
    client: &ApiClient,
    auth: &AuthContext,
    range: DateRange,
) -> DashboardData {
    let query = InvoiceQuery::default().in_range(range);
    let fetches = fetch_all_divisions(client, auth, &query).await;
    let merged = merge_dedup(fetches);

    DashboardData {
        range,
        stats: merged.stats,
        recent: merged.recent(RECENT_WINDOW).to_vec(),
        failed: merged.failed,
    }
}

/// Encodes the recent-invoice list for download, projected to the export
/// columns.
pub fn export_recent(
    recent: &[DivisionInvoice],
    format: ExportFormat,
) -> Result<Vec<u8>, ApiError> {
    export(&dashboard_rows(recent), format)
}
