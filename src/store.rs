use crate::record::Record;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row with this seat number.
    #[error("student record not found: {0}")]
    NotFound(String),

    /// Backend failure (database, serialization, IO).
    #[error("record store error: {0}")]
    Backend(String),
}

/// Key-value access to student rows, keyed by normalized seat number.
///
/// `save_record` replaces the whole row. Rows are created by bulk import only, so saving
/// an unknown key is a `NotFound` failure rather than an insert.
pub trait RecordStore {
    fn fetch_record(&self, key: &str) -> Result<Option<Record>, StoreError>;
    fn save_record(&mut self, key: &str, record: &Record) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    rows: HashMap<String, Record>,
    saves: usize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a row, bypassing the workflow.
    pub fn insert(&mut self, key: &str, record: Record) {
        self.rows.insert(key.to_string(), record);
    }

    /// Number of successful `save_record` calls.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl RecordStore for MemoryRecordStore {
    fn fetch_record(&self, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.rows.get(key).cloned())
    }

    fn save_record(&mut self, key: &str, record: &Record) -> Result<(), StoreError> {
        let Some(row) = self.rows.get_mut(key) else {
            return Err(StoreError::NotFound(key.to_string()));
        };
        *row = record.clone();
        self.saves += 1;
        Ok(())
    }
}
