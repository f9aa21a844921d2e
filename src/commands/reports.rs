use serde_json::Value;

use crate::error::ApiError;
use crate::services::auth::AuthContext;
use crate::services::client::ApiClient;
use crate::services::export::{export, ExportFormat};
use crate::utils::DateRange;

/// Fetches the backend-generated report rows for a window.
pub async fn generate(
    client: &ApiClient,
    auth: &AuthContext,
    range: &DateRange,
) -> Result<Vec<Value>, ApiError> {
    client.generate_report(auth, range).await
}

/// Encodes report rows for download. Rows arrive already filtered by the
/// backend's date window; nothing is filtered here.
pub fn encode(rows: &[Value], format: ExportFormat) -> Result<Vec<u8>, ApiError> {
    export(rows, format)
}
