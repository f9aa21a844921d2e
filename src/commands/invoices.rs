use std::path::Path;

use crate::error::ApiError;
use crate::models::{Division, InvoiceId, DIVISIONS};
use crate::services::auth::AuthContext;
use crate::services::client::{ApiClient, InvoiceQuery, UploadReceipt};
use crate::services::editor::EditBuffer;
use crate::services::fetch::fetch_divisions;
use crate::services::merge::{merge_concat, MergeOutcome};
use crate::utils::DateRange;

fn selected(filter: Option<Division>) -> Vec<Division> {
    match filter {
        Some(division) => vec![division],
        None => DIVISIONS.to_vec(),
    }
}

/// Cross-division listing. With a filter, only that division is fetched;
/// the filter narrows the requests, it never re-filters fetched records.
pub async fn list_invoices(
    client: &ApiClient,
    auth: &AuthContext,
    filter: Option<Division>,
) -> MergeOutcome {
    let fetches =
        fetch_divisions(client, auth, &selected(filter), &InvoiceQuery::default()).await;
    merge_concat(fetches)
}

/// The approval queue: pending invoices in the window, across divisions.
pub async fn pending_queue(
    client: &ApiClient,
    auth: &AuthContext,
    filter: Option<Division>,
    range: DateRange,
) -> MergeOutcome {
    let query = InvoiceQuery::pending().in_range(range);
    let fetches = fetch_divisions(client, auth, &selected(filter), &query).await;
    merge_concat(fetches)
}

/// Transitions one pending invoice to approved. The backend owns the
/// transition; this never flips status locally.
pub async fn approve(
    client: &ApiClient,
    auth: &AuthContext,
    division: Division,
    id: &InvoiceId,
) -> Result<(), ApiError> {
    client.approve_invoice(auth, division, id).await
}

/// Uploads a PDF for extraction. The file must exist and carry a .pdf
/// name; both are checked before any request goes out.
pub async fn upload(
    client: &ApiClient,
    auth: &AuthContext,
    division: Division,
    path: &Path,
) -> Result<UploadReceipt, ApiError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ApiError::Validation(format!("not a file path: {}", path.display())))?
        .to_string();
    let bytes = std::fs::read(path)
        .map_err(|e| ApiError::Validation(format!("cannot read {}: {}", path.display(), e)))?;
    client
        .upload_invoice(auth, division, &file_name, bytes)
        .await
}

/// Fetches one invoice and opens an edit session over it.
pub async fn open_editor(
    client: &ApiClient,
    auth: &AuthContext,
    division: Division,
    id: &InvoiceId,
) -> Result<EditBuffer, ApiError> {
    let invoice = client.get_invoice(auth, division, id).await?;
    Ok(EditBuffer::load(division, invoice))
}

pub async fn download_pdf(
    client: &ApiClient,
    auth: &AuthContext,
    division: Division,
    id: &InvoiceId,
) -> Result<Vec<u8>, ApiError> {
    client.get_pdf(auth, division, id).await
}
