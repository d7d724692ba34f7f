//! Relational-persistence collaborator interface.
//!
//! The pipeline chooses the target tables from the processing mode and
//! hands over finished records; everything about the actual database
//! lives with the embedding application.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use thiserror::Error;

use crate::models::extraction::LineItem;
use crate::models::record::ProcessingRecord;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Insert into {table} failed: {message}")]
    InsertFailed { table: String, message: String },

    #[error("Persistence backend unavailable: {0}")]
    Unavailable(String),
}

pub trait RecordStore {
    /// Insert a finished record into the given table, returning the new
    /// row's identifier.
    fn insert(&self, table: &str, record: &ProcessingRecord) -> Result<String, PersistenceError>;

    /// Insert line items into the given child table under a parent row.
    fn insert_line_items(
        &self,
        table: &str,
        parent_id: &str,
        items: &[LineItem],
    ) -> Result<(), PersistenceError>;
}

/// In-memory record store for tests. Remembers which tables received
/// which rows so mode routing is assertable.
pub struct MemoryRecordStore {
    rows: Mutex<Vec<(String, ProcessingRecord)>>,
    line_rows: Mutex<Vec<(String, String, LineItem)>>,
    next_id: AtomicU64,
    fail_inserts: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            line_rows: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fail_inserts: AtomicBool::new(false),
        }
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn line_row_count(&self) -> usize {
        self.line_rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Tables that received record inserts, in insertion order.
    pub fn tables(&self) -> Vec<String> {
        self.rows
            .lock()
            .map(|rows| rows.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }

    /// Tables that received line-item inserts, in insertion order.
    pub fn line_tables(&self) -> Vec<String> {
        self.line_rows
            .lock()
            .map(|rows| rows.iter().map(|(t, _, _)| t.clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, table: &str, record: &ProcessingRecord) -> Result<String, PersistenceError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(PersistenceError::InsertFailed {
                table: table.to_string(),
                message: "insert failure injected".into(),
            });
        }
        let id = format!("row-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| PersistenceError::Unavailable("store lock poisoned".into()))?;
        rows.push((table.to_string(), record.clone()));
        Ok(id)
    }

    fn insert_line_items(
        &self,
        table: &str,
        parent_id: &str,
        items: &[LineItem],
    ) -> Result<(), PersistenceError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(PersistenceError::InsertFailed {
                table: table.to_string(),
                message: "insert failure injected".into(),
            });
        }
        let mut rows = self
            .line_rows
            .lock()
            .map_err(|_| PersistenceError::Unavailable("store lock poisoned".into()))?;
        for item in items {
            rows.push((table.to_string(), parent_id.to_string(), item.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::ProcessingMode;
    use uuid::Uuid;

    fn record() -> ProcessingRecord {
        ProcessingRecord::failed(
            Uuid::new_v4(),
            "x.pdf",
            ProcessingMode::Upload,
            "u",
            "n/a".into(),
            0.0,
        )
    }

    #[test]
    fn insert_returns_distinct_ids() {
        let store = MemoryRecordStore::new();
        let a = store.insert("invoices", &record()).unwrap();
        let b = store.insert("invoices", &record()).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.row_count(), 2);
        assert_eq!(store.tables(), vec!["invoices", "invoices"]);
    }

    #[test]
    fn line_items_attach_to_parent() {
        let store = MemoryRecordStore::new();
        let parent = store.insert("invoices", &record()).unwrap();
        store
            .insert_line_items(
                "invoice_line_items",
                &parent,
                &[LineItem::default(), LineItem::default()],
            )
            .unwrap();
        assert_eq!(store.line_row_count(), 2);
        assert_eq!(
            store.line_tables(),
            vec!["invoice_line_items", "invoice_line_items"]
        );
    }

    #[test]
    fn injected_failure_surfaces() {
        let store = MemoryRecordStore::new();
        store.fail_inserts(true);
        assert!(matches!(
            store.insert("invoices", &record()),
            Err(PersistenceError::InsertFailed { .. })
        ));
    }
}
