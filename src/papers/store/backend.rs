use super::StoreKind;
use crate::error::Result;
use std::path::PathBuf;

/// Raw storage I/O for records and metadata.
///
/// Keys are citekeys that already passed validation. Content is text, the
/// repository handles encoding.
pub trait StorageBackend {
    /// Repository root, used for display and config lookup.
    fn root(&self) -> PathBuf;

    fn is_initialized(&self) -> bool;

    /// Creates the sub-store layout. Idempotent.
    fn init(&self) -> Result<()>;

    /// Reads an entry. `Ok(None)` when it does not exist.
    fn read(&self, kind: StoreKind, key: &str) -> Result<Option<String>>;

    /// Replaces an entry. MUST be atomic (temp file + rename).
    fn write(&self, kind: StoreKind, key: &str, content: &str) -> Result<()>;

    /// Deletes an entry, returning whether it existed.
    fn delete(&self, kind: StoreKind, key: &str) -> Result<bool>;

    /// All keys in a sub-store, sorted.
    fn list_keys(&self, kind: StoreKind) -> Result<Vec<String>>;

    /// Where an entry lives. Also used as the origin in parse errors.
    fn entry_path(&self, kind: StoreKind, key: &str) -> PathBuf;

    /// Directory managed documents are stored in.
    fn doc_dir(&self) -> PathBuf;
}
