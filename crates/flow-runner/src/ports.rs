use std::collections::HashMap;
use std::path::Path;

use crate::errors::SourceError;

/// One row of input data: field name to string value.
pub type Record = HashMap<String, String>;

/// Ordered supply of records for a run.
///
/// File parsing (and dropping empty trailing rows) belongs to the concrete
/// implementation outside the engine; the controller only pulls records one
/// at a time in source order.
pub trait RecordSource: Send {
    /// Load records from a file, replacing any previously loaded set.
    fn load(&mut self, path: &Path) -> Result<(), SourceError>;

    /// Next record in source order, or `None` when exhausted.
    fn next(&mut self) -> Option<Record>;

    /// Rewind to before the first record.
    fn reset(&mut self);

    /// Field names in column order.
    fn field_names(&self) -> Vec<String>;

    /// Total number of loaded records.
    fn count(&self) -> usize;
}

/// Vec-backed record source for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryRecords {
    fields: Vec<String>,
    rows: Vec<Record>,
    cursor: usize,
}

impl InMemoryRecords {
    pub fn new(fields: Vec<String>, rows: Vec<Record>) -> Self {
        Self {
            fields,
            rows,
            cursor: 0,
        }
    }
}

impl RecordSource for InMemoryRecords {
    fn load(&mut self, _path: &Path) -> Result<(), SourceError> {
        Err(SourceError::new("in-memory source cannot load from disk"))
    }

    fn next(&mut self) -> Option<Record> {
        let record = self.rows.get(self.cursor).cloned();
        if record.is_some() {
            self.cursor += 1;
        }
        record
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn count(&self) -> usize {
        self.rows.len()
    }
}
