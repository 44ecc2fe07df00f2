use super::{StorageBackend, StoreKind};
use crate::error::{PapersError, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since the repository is
/// single-threaded, so the trait can take `&self` everywhere. Documents still
/// live on disk: point `doc_dir` at a temp directory when a test attaches one.
pub struct MemBackend {
    entries: RefCell<BTreeMap<(StoreKind, String), String>>,
    initialized: RefCell<bool>,
    doc_dir: PathBuf,
    simulate_write_error: RefCell<bool>,
}

impl Default for MemBackend {
    fn default() -> Self {
        Self {
            entries: RefCell::new(BTreeMap::new()),
            initialized: RefCell::new(true),
            doc_dir: PathBuf::from("memory://doc"),
            simulate_write_error: RefCell::new(false),
        }
    }
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doc_dir(mut self, doc_dir: impl Into<PathBuf>) -> Self {
        self.doc_dir = doc_dir.into();
        self
    }

    pub fn uninitialized() -> Self {
        let backend = Self::default();
        *backend.initialized.borrow_mut() = false;
        backend
    }

    /// Makes every following `write` fail.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Number of stored entries of one kind.
    pub fn count(&self, kind: StoreKind) -> usize {
        self.entries.borrow().keys().filter(|(k, _)| *k == kind).count()
    }
}

impl StorageBackend for MemBackend {
    fn root(&self) -> PathBuf {
        PathBuf::from("memory://")
    }

    fn is_initialized(&self) -> bool {
        *self.initialized.borrow()
    }

    fn init(&self) -> Result<()> {
        *self.initialized.borrow_mut() = true;
        Ok(())
    }

    fn read(&self, kind: StoreKind, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(&(kind, key.to_string())).cloned())
    }

    fn write(&self, kind: StoreKind, key: &str, content: &str) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(PapersError::Api("Simulated write error".to_string()));
        }
        self.entries
            .borrow_mut()
            .insert((kind, key.to_string()), content.to_string());
        Ok(())
    }

    fn delete(&self, kind: StoreKind, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .borrow_mut()
            .remove(&(kind, key.to_string()))
            .is_some())
    }

    fn list_keys(&self, kind: StoreKind) -> Result<Vec<String>> {
        Ok(self
            .entries
            .borrow()
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, key)| key.clone())
            .collect())
    }

    fn entry_path(&self, kind: StoreKind, key: &str) -> PathBuf {
        PathBuf::from(format!("memory://{}/{}.{}", kind.dir_name(), key, kind.extension()))
    }

    fn doc_dir(&self) -> PathBuf {
        self.doc_dir.clone()
    }
}
