use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Keeps a present-but-null field distinguishable from an absent one:
/// `null` decodes to `Some(Value::Null)` and re-encodes as `null`, while a
/// missing key stays `None` and is skipped on re-encode. Plain
/// `Option<Value>` would fold both into `None` and drop keys the backend
/// sent.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// An organizational unit that scopes invoice storage and access.
///
/// `DIVISIONS` is the canonical order; every multi-division iteration and
/// every merge tie-break uses it, so results never depend on which request
/// happened to answer first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Division {
    Engineering,
    UltraFiltration,
    Water,
}

pub const DIVISIONS: [Division; 3] = [
    Division::Engineering,
    Division::UltraFiltration,
    Division::Water,
];

impl Division {
    pub fn as_str(&self) -> &'static str {
        match self {
            Division::Engineering => "engineering",
            Division::UltraFiltration => "ultra_filtration",
            Division::Water => "water",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Division {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "engineering" => Ok(Division::Engineering),
            "ultra_filtration" => Ok(Division::UltraFiltration),
            "water" => Ok(Division::Water),
            other => Err(format!("unknown division: {}", other)),
        }
    }
}

/// Workflow state of an invoice. The only transition is pending -> approved,
/// and only the approve endpoint performs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Approved,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Pending => f.write_str("pending"),
            InvoiceStatus::Approved => f.write_str("approved"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Gate,
    Store,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Gate => "gate",
            Role::Store => "store",
        }
    }
}

/// Backend-assigned identifier, scoped to a division. Some divisions hand
/// out numeric ids and some strings, so the raw JSON form is kept and
/// echoed back unchanged on edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(Value);

impl InvoiceId {
    /// Rendering for URL path segments: strings go in bare, everything
    /// else uses its JSON form.
    pub fn as_path_segment(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_path_segment())
    }
}

impl From<i64> for InvoiceId {
    fn from(id: i64) -> Self {
        InvoiceId(Value::from(id))
    }
}

impl From<&str> for InvoiceId {
    fn from(id: &str) -> Self {
        InvoiceId(Value::from(id))
    }
}

/// A flat invoice record as the backend returns it. Amount-like fields are
/// opaque scalars: the backend is not consistent about numbers vs. strings
/// and this layer never coerces them. Unknown fields land in `extra` and
/// round-trip untouched through edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub supplier_name: String,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_amount: Option<Value>,
    #[serde(default)]
    pub invoice_date: String,
    pub status: InvoiceStatus,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_number: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub processed_by: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub approved_by: Option<Value>,
    /// Serialized `ParsedInvoiceData` blob. Derived from the structured
    /// line items during editing; never hand-edited while an edit session
    /// holds the decoded form.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Decoded form of the `data` blob. Line-item order is significant and
/// preserved; unrecognized top-level fields survive in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedInvoiceData {
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One product/service entry inside an invoice. Identity is positional;
/// every column is an opaque scalar passed through without validation, and
/// an explicitly-null column re-encodes as null rather than vanishing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub item_description: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_code: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit_price: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub line_total: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An invoice stamped with the division it was fetched from. The backend
/// does not echo the division in its payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionInvoice {
    pub division: Division,
    #[serde(flatten)]
    pub invoice: Invoice,
}

/// Dashboard counters over the raw (non-deduplicated) record stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceStats {
    pub submitted: usize,
    pub processed: usize,
    pub pending: usize,
}

/// The flat fields an edit session may change. This is the whole schema:
/// field names from the wire never drive editing, and anything not listed
/// here (ids, audit fields, the `data` blob) is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableField {
    InvoiceNumber,
    SupplierName,
    TotalAmount,
    InvoiceDate,
    ReferenceNumber,
}

pub const EDITABLE_FIELDS: [EditableField; 5] = [
    EditableField::InvoiceNumber,
    EditableField::SupplierName,
    EditableField::TotalAmount,
    EditableField::InvoiceDate,
    EditableField::ReferenceNumber,
];

impl EditableField {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditableField::InvoiceNumber => "invoice_number",
            EditableField::SupplierName => "supplier_name",
            EditableField::TotalAmount => "total_amount",
            EditableField::InvoiceDate => "invoice_date",
            EditableField::ReferenceNumber => "reference_number",
        }
    }
}

impl FromStr for EditableField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "invoice_number" => Ok(EditableField::InvoiceNumber),
            "supplier_name" => Ok(EditableField::SupplierName),
            "total_amount" => Ok(EditableField::TotalAmount),
            "invoice_date" => Ok(EditableField::InvoiceDate),
            "reference_number" => Ok(EditableField::ReferenceNumber),
            other => Err(format!("field is not editable: {}", other)),
        }
    }
}

/// The five line-item columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemField {
    ItemDescription,
    ProductCode,
    Quantity,
    UnitPrice,
    LineTotal,
}

impl LineItemField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemField::ItemDescription => "item_description",
            LineItemField::ProductCode => "product_code",
            LineItemField::Quantity => "quantity",
            LineItemField::UnitPrice => "unit_price",
            LineItemField::LineTotal => "line_total",
        }
    }
}

impl FromStr for LineItemField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "item_description" => Ok(LineItemField::ItemDescription),
            "product_code" => Ok(LineItemField::ProductCode),
            "quantity" => Ok(LineItemField::Quantity),
            "unit_price" => Ok(LineItemField::UnitPrice),
            "line_total" => Ok(LineItemField::LineTotal),
            other => Err(format!("unknown line item field: {}", other)),
        }
    }
}
