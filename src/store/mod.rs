//! Record store adapter over a `SheetBackend`.
//!
//! Fails soft: every backend error is logged and turned into an empty list or `false`.
//! Callers only ever see the boolean outcome.
//!
//! `update_rate` is a read-scan-write with no lock around it. Two concurrent updates of
//! the same `idOp` race and the sheet keeps whichever write lands last.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::sheets::SheetBackend;

pub const ID_HEADER: &str = "idOp";
pub const RATE_HEADER: &str = "tasa";
pub const EMAIL_HEADER: &str = "email";

/// One data row of the rate sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    #[serde(rename = "idOp")]
    pub operation_id: i64,
    #[serde(rename = "tasa")]
    pub rate: f64,
    pub email: String,
}

/// Zero-based column positions of the known fields, resolved from the header row.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Columns {
    id: Option<usize>,
    rate: Option<usize>,
    email: Option<usize>,
}

impl Columns {
    fn from_header(header: &[Value]) -> Self {
        let mut columns = Columns::default();
        for (index, cell) in header.iter().enumerate() {
            let name = cell_text(cell);
            let slot = if name.eq_ignore_ascii_case(ID_HEADER) {
                &mut columns.id
            } else if name.eq_ignore_ascii_case(RATE_HEADER) {
                &mut columns.rate
            } else if name.eq_ignore_ascii_case(EMAIL_HEADER) {
                &mut columns.email
            } else {
                continue;
            };
            // First matching header wins
            if slot.is_none() {
                *slot = Some(index);
            }
        }
        columns
    }
}

#[derive(Debug, PartialEq)]
enum RowError {
    MissingColumn(&'static str),
    Blank(&'static str),
    NotNumeric { field: &'static str, value: String },
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowError::MissingColumn(field) => write!(f, "no '{}' column in header", field),
            RowError::Blank(field) => write!(f, "'{}' is blank", field),
            RowError::NotNumeric { field, value } => write!(f, "'{}' is not numeric: {:?}", field, value),
        }
    }
}

pub struct RateStore {
    backend: Arc<dyn SheetBackend>,
}

impl RateStore {
    pub fn new(backend: Arc<dyn SheetBackend>) -> Self {
        Self { backend }
    }

    /// All records in sheet order. Empty when the sheet is empty or cannot be read.
    pub async fn list_records(&self) -> Vec<RateRecord> {
        let rows = match self.backend.read_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to read rate sheet: {}", e);
                return Vec::new();
            }
        };

        let Some((header, data)) = rows.split_first() else {
            return Vec::new();
        };
        let columns = Columns::from_header(header);

        data.iter()
            .enumerate()
            .filter(|(_, row)| !is_blank_row(row))
            .filter_map(|(offset, row)| match parse_row(&columns, row) {
                Ok(record) => Some(record),
                Err(e) => {
                    // offset 0 is sheet row 2
                    warn!("Skipping sheet row {}: {}", offset + 2, e);
                    None
                }
            })
            .collect()
    }

    /// Overwrite the rate cell of the first row whose `idOp` matches `operation_id`.
    ///
    /// `operation_id` is compared in normalized string form (see [`normalize_id`]),
    /// so `"100"`, `100` and `100.0` all address the same row.
    pub async fn update_rate(&self, operation_id: &str, new_rate: f64) -> bool {
        let key = normalize_text_id(operation_id);

        let rows = match self.backend.read_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to read rate sheet while updating idOp {}: {}", key, e);
                return false;
            }
        };

        let Some((header, data)) = rows.split_first() else {
            warn!("idOp {} not found: rate sheet is empty", key);
            return false;
        };
        let columns = Columns::from_header(header);
        let (Some(id_col), Some(rate_col)) = (columns.id, columns.rate) else {
            warn!("Rate sheet header lacks '{}' or '{}' column; cannot update idOp {}", ID_HEADER, RATE_HEADER, key);
            return false;
        };

        let position = data.iter().position(|row| {
            row.get(id_col)
                .and_then(normalize_id)
                .is_some_and(|candidate| candidate == key)
        });
        let Some(offset) = position else {
            warn!("idOp {} not found in rate sheet", key);
            return false;
        };

        let sheet_row = offset + 2;
        match self.backend.write_cell(sheet_row, rate_col + 1, rate_value(new_rate)).await {
            Ok(()) => {
                info!("Rate updated for idOp {} (sheet row {}): {}", key, sheet_row, new_rate);
                true
            }
            Err(e) => {
                error!("Failed to write rate for idOp {} (sheet row {}): {}", key, sheet_row, e);
                false
            }
        }
    }
}

fn parse_row(columns: &Columns, row: &[Value]) -> Result<RateRecord, RowError> {
    let id_col = columns.id.ok_or(RowError::MissingColumn(ID_HEADER))?;
    let rate_col = columns.rate.ok_or(RowError::MissingColumn(RATE_HEADER))?;

    let operation_id = coerce_id(row.get(id_col)).map_err(|e| e.for_field(ID_HEADER))?;
    let rate = coerce_rate(row.get(rate_col)).map_err(|e| e.for_field(RATE_HEADER))?;
    let email = columns
        .email
        .and_then(|col| row.get(col))
        .map(|cell| cell_text(cell).trim().to_string())
        .unwrap_or_default();

    Ok(RateRecord { operation_id, rate, email })
}

/// Coercion failure before the field name is known.
enum CellError {
    Blank,
    NotNumeric(String),
}

impl CellError {
    fn for_field(self, field: &'static str) -> RowError {
        match self {
            CellError::Blank => RowError::Blank(field),
            CellError::NotNumeric(value) => RowError::NotNumeric { field, value },
        }
    }
}

fn coerce_id(cell: Option<&Value>) -> Result<i64, CellError> {
    let cell = cell.ok_or(CellError::Blank)?;
    match cell {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(integral))
            .ok_or_else(|| CellError::NotNumeric(n.to_string())),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(CellError::Blank);
            }
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
                .ok_or_else(|| CellError::NotNumeric(s.to_string()))
        }
        Value::Null => Err(CellError::Blank),
        other => Err(CellError::NotNumeric(other.to_string())),
    }
}

fn coerce_rate(cell: Option<&Value>) -> Result<f64, CellError> {
    let cell = cell.ok_or(CellError::Blank)?;
    match cell {
        Value::Number(n) => n.as_f64().ok_or_else(|| CellError::NotNumeric(n.to_string())),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(CellError::Blank);
            }
            parse_decimal(s).ok_or_else(|| CellError::NotNumeric(s.to_string()))
        }
        Value::Null => Err(CellError::Blank),
        other => Err(CellError::NotNumeric(other.to_string())),
    }
}

/// Parse a decimal, accepting a comma as the separator when the text has no dot.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim();
    let parsed = if !text.contains('.') && text.matches(',').count() == 1 {
        text.replace(',', ".").parse::<f64>()
    } else {
        text.parse::<f64>()
    };
    parsed.ok().filter(|v| v.is_finite())
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Lookup key for an `idOp` cell or payload value: integral numbers lose any `.0`,
/// text is trimmed. `None` for blanks and non-scalar values.
pub fn normalize_id(value: &Value) -> Option<String> {
    let key = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64().and_then(integral).map(|i| i.to_string()).unwrap_or_else(|| n.to_string()),
        },
        Value::String(s) => normalize_text_id(s),
        _ => return None,
    };
    Some(key).filter(|k| !k.is_empty())
}

fn normalize_text_id(text: &str) -> String {
    let text = text.trim();
    match text.parse::<f64>().ok().and_then(integral) {
        Some(i) => i.to_string(),
        None => text.to_string(),
    }
}

fn rate_value(rate: f64) -> Value {
    serde_json::Number::from_f64(rate).map(Value::Number).unwrap_or(Value::Null)
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_blank_row(row: &[Value]) -> bool {
    row.iter().all(|cell| cell_text(cell).is_empty())
}
