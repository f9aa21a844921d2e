use futures::future;
use tracing::warn;

use crate::error::ApiError;
use crate::models::{Division, DivisionInvoice, DIVISIONS};
use crate::services::auth::AuthContext;
use crate::services::client::{ApiClient, InvoiceQuery};

/// One division's fetch result, success or typed failure. The merge layer
/// consumes these without ever aborting on a single failed division.
#[derive(Debug)]
pub struct DivisionFetch {
    pub division: Division,
    pub outcome: Result<Vec<DivisionInvoice>, ApiError>,
}

/// Fetches one division and stamps every record with it; the backend does
/// not echo the division in its payload. Backend ordering is preserved.
pub async fn fetch_division(
    client: &ApiClient,
    auth: &AuthContext,
    division: Division,
    query: &InvoiceQuery,
) -> Result<Vec<DivisionInvoice>, ApiError> {
    let invoices = client.get_invoices(auth, division, query).await?;
    Ok(invoices
        .into_iter()
        .map(|invoice| DivisionInvoice { division, invoice })
        .collect())
}

/// Fetches every division concurrently. Results come back one per division
/// in canonical order, whatever order the responses arrived in.
pub async fn fetch_all_divisions(
    client: &ApiClient,
    auth: &AuthContext,
    query: &InvoiceQuery,
) -> Vec<DivisionFetch> {
    fetch_divisions(client, auth, &DIVISIONS, query).await
}

/// Same as [`fetch_all_divisions`] over an explicit subset, for views with
/// a division filter.
pub async fn fetch_divisions(
    client: &ApiClient,
    auth: &AuthContext,
    divisions: &[Division],
    query: &InvoiceQuery,
) -> Vec<DivisionFetch> {
    let requests = divisions
        .iter()
        .map(|&division| async move {
            let outcome = fetch_division(client, auth, division, query).await;
            if let Err(error) = &outcome {
                warn!(%division, %error, "division fetch failed");
            }
            DivisionFetch { division, outcome }
        })
        .collect::<Vec<_>>();

    future::join_all(requests).await
}
