//! # Storage Layer
//!
//! A repository is three parallel sub-stores keyed by citekey:
//!
//! ```text
//! ~/.papers/
//! ├── config.json        # PapersConfig
//! ├── bib/<key>.bib      # bibliographic record (BibTeX)
//! ├── meta/<key>.yaml    # tags, document reference, extra keys
//! ├── doc/<key>.<ext>    # managed documents (optional)
//! └── notes/             # free-form notes, untouched by the store
//! ```
//!
//! [`StorageBackend`] covers the raw I/O for records and metadata, the
//! "how" of storage. [`Repository`](crate::repo::Repository) owns the "what":
//! key uniqueness, the order of writes across the triad and the consistency
//! check. Documents go through [`DocumentManager`](crate::docs::DocumentManager)
//! inside the backend's `doc_dir`.
//!
//! ## Atomic Writes
//!
//! Every `write` stages the new content in a hidden temp file next to the
//! target and renames it into place. A crash leaves either the old or the new
//! file, never a truncated one. Writes across files are not transactional,
//! which is why the repository checks consistency on open.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: the real directory layout above.
//! - [`mem_backend::MemBackend`]: maps behind `RefCell`, for tests.

use std::fmt;

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;

pub use backend::StorageBackend;

/// One of the two text sub-stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreKind {
    Bib,
    Meta,
}

impl StoreKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            StoreKind::Bib => "bib",
            StoreKind::Meta => "meta",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            StoreKind::Bib => "bib",
            StoreKind::Meta => "yaml",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Citekeys present in one sub-store but not the other, papers that do not
/// parse, and papers whose managed document is gone.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Record exists, metadata does not.
    pub missing_metadata: Vec<String>,
    /// Metadata exists, record does not.
    pub missing_record: Vec<String>,
    /// Metadata points at a document that does not exist.
    pub missing_documents: Vec<String>,
    /// Both files exist but one of them fails to parse.
    pub unreadable: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.missing_metadata.is_empty()
            && self.missing_record.is_empty()
            && self.missing_documents.is_empty()
            && self.unreadable.is_empty()
    }

    /// Human readable findings, one per line.
    pub fn findings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for key in &self.missing_metadata {
            out.push(format!("{}: record without metadata", key));
        }
        for key in &self.missing_record {
            out.push(format!("{}: metadata without record", key));
        }
        for key in &self.missing_documents {
            out.push(format!("{}: document file is missing", key));
        }
        for key in &self.unreadable {
            out.push(format!("{}: record or metadata cannot be parsed", key));
        }
        out
    }
}
