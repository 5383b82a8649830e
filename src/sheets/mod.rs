//! Tabular backend seam.
//!
//! A `SheetBackend` exposes one tab of a spreadsheet as rows of raw JSON cell values
//! (row 1 first, trailing blank cells omitted) and can overwrite a single cell.
//! `GoogleSheetsClient` is the production implementation.

pub mod auth;
pub mod google;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use google::GoogleSheetsClient;

/// Errors from a tabular backend. The store adapter turns all of these into
/// soft failures.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Spreadsheet has no tabs")]
    NoTabs,

    #[error("Invalid cell position row {row}, column {column}")]
    InvalidCell { row: usize, column: usize },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait SheetBackend: Send + Sync + 'static {
    /// All rows of the tab, header row included.
    async fn read_rows(&self) -> Result<Vec<Vec<Value>>, SheetError>;

    /// Overwrite one cell. `row` and `column` are 1-based, as in the sheet UI.
    async fn write_cell(&self, row: usize, column: usize, value: Value) -> Result<(), SheetError>;
}

/// A1 column letters for a 1-based column index (1 → A, 27 → AA).
pub fn column_letters(column: usize) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quote a tab title for use in an A1 range (`'My Tab'!B2`).
pub fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}
