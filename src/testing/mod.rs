use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::sheets::{SheetBackend, SheetError};

/// In-process stand-in for a spreadsheet tab, used by unit and integration tests.
///
/// Rows are stored exactly as a backend would return them; `write_cell` pads short rows
/// with empty strings the way a real sheet fills in skipped cells.
#[derive(Debug, Default)]
pub struct InMemorySheet {
    rows: Mutex<Vec<Vec<Value>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemorySheet {
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    /// Snapshot of the current rows
    pub fn rows(&self) -> Vec<Vec<Value>> {
        self.lock().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<Value>>> {
        // A panicking test must not poison the sheet for the assertions that follow it
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn unavailable() -> SheetError {
        SheetError::Status {
            url: "memory://sheet".to_string(),
            status: 503,
            body: "sheet unavailable".to_string(),
        }
    }
}

#[async_trait]
impl SheetBackend for InMemorySheet {
    async fn read_rows(&self) -> Result<Vec<Vec<Value>>, SheetError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.rows())
    }

    async fn write_cell(&self, row: usize, column: usize, value: Value) -> Result<(), SheetError> {
        if row == 0 || column == 0 {
            return Err(SheetError::InvalidCell { row, column });
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let mut rows = self.lock();
        if rows.len() < row {
            rows.resize_with(row, Vec::new);
        }
        let cells = &mut rows[row - 1];
        if cells.len() < column {
            cells.resize(column, Value::String(String::new()));
        }
        cells[column - 1] = value;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
