use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::models::DivisionInvoice;

/// Download encodings for merged record sets and report rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Tabular,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Tabular => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "json" => Ok(ExportFormat::Json),
            "tabular" | "csv" => Ok(ExportFormat::Tabular),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// Encodes a record set for download. No filtering happens here; callers
/// bound the set first.
///
/// Json is pretty-printed with fields in received order. Tabular derives
/// its header row from the first record's key set and emits every row's
/// values in that key order; an empty set has no first record to take
/// headers from and fails with [`ApiError::EmptyExport`].
pub fn export<T: Serialize>(records: &[T], format: ExportFormat) -> Result<Vec<u8>, ApiError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_vec_pretty(records)?),
        ExportFormat::Tabular => export_tabular(records),
    }
}

fn export_tabular<T: Serialize>(records: &[T]) -> Result<Vec<u8>, ApiError> {
    if records.is_empty() {
        return Err(ApiError::EmptyExport);
    }

    let rows: Vec<Value> = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()?;
    let headers: Vec<String> = match &rows[0] {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => {
            return Err(ApiError::Validation(
                "tabular export requires object-shaped records".to_string(),
            ))
        }
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in &rows {
        let cells: Vec<String> = headers.iter().map(|key| cell_text(row.get(key))).collect();
        writer.write_record(&cells)?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Csv(e.into_error().into()))
}

/// Flat rendering of an opaque scalar: strings bare, null/absent empty,
/// everything else in its JSON form.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// The dashboard's export projection: one flat row per merged record,
/// limited to the columns the download carries. The scanning date is not
/// part of the typed model; it rides along in the record's extra fields.
pub fn dashboard_rows(records: &[DivisionInvoice]) -> Vec<Value> {
    records
        .iter()
        .map(|record| {
            serde_json::json!({
                "division": record.division,
                "invoice_number": record.invoice.invoice_number,
                "supplier_name": record.invoice.supplier_name,
                "invoice_date": record.invoice.invoice_date,
                "total_amount": record.invoice.total_amount,
                "scanning_date": record.invoice.extra.get("scanning_date"),
            })
        })
        .collect()
}
