//! Object-storage collaborator interface.
//!
//! The pipeline needs exactly three operations: upload a document, fetch
//! it back, and delete it (the compensation hook used when a later
//! persistence write fails). Concrete backends live with the embedding
//! application.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use thiserror::Error;

use crate::models::record::StoredFile;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Stored object not found: {0}")]
    NotFound(String),
}

pub trait ObjectStore {
    fn upload(&self, content: &[u8], filename: &str) -> Result<StoredFile, UploadError>;
    fn download(&self, id: &str) -> Result<Vec<u8>, UploadError>;
    fn delete(&self, id: &str) -> Result<(), UploadError>;
}

/// In-memory object store for tests and local runs.
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    next_id: AtomicU64,
    fail_uploads: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Make subsequent uploads fail (for failure-path tests).
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().map(|m| m.len()).unwrap_or(0)
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn upload(&self, content: &[u8], filename: &str) -> Result<StoredFile, UploadError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(UploadError::Io("storage unavailable".into()));
        }
        let id = format!("obj-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| UploadError::Io("store lock poisoned".into()))?;
        objects.insert(id.clone(), (filename.to_string(), content.to_vec()));
        Ok(StoredFile {
            url: Some(format!("memory://{id}")),
            id,
        })
    }

    fn download(&self, id: &str) -> Result<Vec<u8>, UploadError> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| UploadError::Io("store lock poisoned".into()))?;
        objects
            .get(id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| UploadError::NotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> Result<(), UploadError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| UploadError::Io("store lock poisoned".into()))?;
        objects
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| UploadError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_download_roundtrip() {
        let store = MemoryObjectStore::new();
        let stored = store.upload(b"pdf bytes", "invoice.pdf").unwrap();
        assert!(stored.url.as_deref().is_some_and(|u| u.contains(&stored.id)));
        assert_eq!(store.download(&stored.id).unwrap(), b"pdf bytes");
    }

    #[test]
    fn delete_removes_object() {
        let store = MemoryObjectStore::new();
        let stored = store.upload(b"x", "a.pdf").unwrap();
        assert_eq!(store.object_count(), 1);
        store.delete(&stored.id).unwrap();
        assert_eq!(store.object_count(), 0);
        assert!(matches!(
            store.download(&stored.id),
            Err(UploadError::NotFound(_))
        ));
    }

    #[test]
    fn failing_store_rejects_uploads() {
        let store = MemoryObjectStore::new();
        store.fail_uploads(true);
        assert!(store.upload(b"x", "a.pdf").is_err());
        store.fail_uploads(false);
        assert!(store.upload(b"x", "a.pdf").is_ok());
    }
}
