use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::models::{Division, EditableField, Invoice, LineItem, LineItemField, ParsedInvoiceData};
use crate::services::auth::AuthContext;
use crate::services::client::ApiClient;

/// In-progress edit session for one invoice: a flat field buffer plus the
/// decoded line-item structure from its `data` blob.
///
/// The structured buffer is the single source of truth for line items.
/// Every line-item mutation re-encodes the whole structure back into the
/// flat buffer's `data` field, so the two can never drift apart. The flat
/// `data` field is never written any other way while the session lives.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    division: Division,
    invoice: Invoice,
    parsed: Option<ParsedInvoiceData>,
}

impl EditBuffer {
    /// Starts an edit session from a fetched invoice. An absent or
    /// unrecognized `data` blob leaves the structured buffer empty:
    /// line-item editing is disabled but flat fields stay editable.
    pub fn load(division: Division, invoice: Invoice) -> Self {
        let parsed = invoice
            .data
            .as_ref()
            .and_then(Value::as_str)
            .and_then(decode_blob);
        if parsed.is_none() {
            debug!(%division, id = %invoice.id, "invoice data blob absent or unrecognized");
        }
        Self {
            division,
            invoice,
            parsed,
        }
    }

    pub fn division(&self) -> Division {
        self.division
    }

    pub fn invoice(&self) -> &Invoice {
        &self.invoice
    }

    /// None when the `data` blob could not be decoded; line items render
    /// as "not available" in that case.
    pub fn line_items(&self) -> Option<&[LineItem]> {
        self.parsed.as_ref().map(|p| p.line_items.as_slice())
    }

    pub fn can_edit_line_items(&self) -> bool {
        self.parsed.is_some()
    }

    /// Updates one flat field. Line items are untouched.
    pub fn set_field(&mut self, field: EditableField, value: &str) {
        match field {
            EditableField::InvoiceNumber => self.invoice.invoice_number = value.to_string(),
            EditableField::SupplierName => self.invoice.supplier_name = value.to_string(),
            // Opaque pass-through: the edited text goes up as-is, never
            // parsed into a number.
            EditableField::TotalAmount => {
                self.invoice.total_amount = Some(Value::String(value.to_string()))
            }
            EditableField::InvoiceDate => self.invoice.invoice_date = value.to_string(),
            EditableField::ReferenceNumber => {
                self.invoice.reference_number = Some(Value::String(value.to_string()))
            }
        }
    }

    /// Mutates one line-item cell in place, then re-encodes the entire
    /// structure into the flat buffer's `data` field. Out-of-range indexes
    /// fail validation and leave both buffers untouched.
    pub fn set_line_item(
        &mut self,
        index: usize,
        field: LineItemField,
        value: &str,
    ) -> Result<(), ApiError> {
        let parsed = self.parsed.as_mut().ok_or_else(|| {
            ApiError::Validation("line items are not available for this invoice".to_string())
        })?;
        let len = parsed.line_items.len();
        let item = parsed.line_items.get_mut(index).ok_or_else(|| {
            ApiError::Validation(format!("line item index {} out of range ({})", index, len))
        })?;

        let cell = Some(Value::String(value.to_string()));
        match field {
            LineItemField::ItemDescription => item.item_description = cell,
            LineItemField::ProductCode => item.product_code = cell,
            LineItemField::Quantity => item.quantity = cell,
            LineItemField::UnitPrice => item.unit_price = cell,
            LineItemField::LineTotal => item.line_total = cell,
        }

        self.invoice.data = Some(Value::String(serde_json::to_string(parsed)?));
        Ok(())
    }

    /// Sends the whole flat buffer to the edit endpoint. On success the
    /// buffer is the new canonical invoice and the session is over; on
    /// failure the buffer is left as-is for retry. The backend has no
    /// version check, so a concurrent edit is silently overwritten.
    pub async fn commit(
        self,
        client: &ApiClient,
        auth: &AuthContext,
    ) -> Result<Invoice, CommitError> {
        debug!(division = %self.division, id = %self.invoice.id, "committing edit (last write wins)");
        match client
            .edit_invoice(auth, self.division, &self.invoice.id, &self.invoice)
            .await
        {
            Ok(()) => Ok(self.invoice),
            Err(error) => Err(CommitError {
                error,
                buffer: self,
            }),
        }
    }
}

/// A blob only counts as structured data when it carries a `line_items`
/// array; anything else (bad JSON, a bare object, `line_items: null`)
/// renders as "not available".
fn decode_blob(blob: &str) -> Option<ParsedInvoiceData> {
    let value: Value = serde_json::from_str(blob).ok()?;
    if !value.get("line_items").is_some_and(Value::is_array) {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// A failed commit hands the untouched buffer back so the caller can
/// surface the error and retry without losing edits.
#[derive(Debug)]
pub struct CommitError {
    pub error: ApiError,
    pub buffer: EditBuffer,
}

impl std::fmt::Display for CommitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for CommitError {}
