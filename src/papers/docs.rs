//! # Document Manager
//!
//! Brings external files (PDF, PS, ...) under the repository's `doc/`
//! directory as `<citekey>.<ext>`, or records them by reference.
//!
//! ## Modes
//!
//! - [`ImportMode::Copy`]: the source stays where it is, a copy is staged in
//!   `doc/` and renamed into place.
//! - [`ImportMode::Move`]: a plain `rename` when source and `doc/` share a
//!   filesystem. Otherwise the file is copied like above and the source is
//!   deleted only once the destination exists.
//! - [`ImportMode::Link`]: nothing is copied. The absolute path of the source
//!   is recorded and the file is never deleted by the repository.

use crate::error::{PapersError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    #[default]
    Copy,
    Move,
    Link,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportMode::Copy => "copy",
            ImportMode::Move => "move",
            ImportMode::Link => "link",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "copy" => Ok(ImportMode::Copy),
            "move" => Ok(ImportMode::Move),
            "link" => Ok(ImportMode::Link),
            other => Err(format!(
                "Unknown import mode: {} (expected copy, move or link)",
                other
            )),
        }
    }
}

/// Where a paper's document lives.
///
/// Managed documents store a file name relative to `doc/`; external
/// (link-mode) documents store an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub path: String,
    #[serde(default)]
    pub external: bool,
}

impl DocumentRef {
    pub fn managed(name: impl Into<String>) -> Self {
        Self {
            path: name.into(),
            external: false,
        }
    }

    pub fn external(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            external: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentManager {
    doc_dir: PathBuf,
}

impl DocumentManager {
    pub fn new(doc_dir: impl Into<PathBuf>) -> Self {
        Self {
            doc_dir: doc_dir.into(),
        }
    }

    pub fn doc_dir(&self) -> &Path {
        &self.doc_dir
    }

    pub fn resolve_path(&self, doc: &DocumentRef) -> PathBuf {
        if doc.external {
            PathBuf::from(&doc.path)
        } else {
            self.doc_dir.join(&doc.path)
        }
    }

    pub fn exists(&self, doc: &DocumentRef) -> bool {
        self.resolve_path(doc).is_file()
    }

    /// The managed file name for `citekey`, keeping the extension of `source`.
    pub fn file_name(citekey: &str, source: &Path) -> String {
        match source.extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("{}.{}", citekey, ext),
            _ => citekey.to_string(),
        }
    }

    /// Attaches `source` to `citekey`.
    ///
    /// `current` is the paper's present document. Replacing it requires
    /// `overwrite`; otherwise the call fails with `AlreadyExists` and nothing
    /// on disk changes. On success with `overwrite`, the previous managed file
    /// is deleted when it differs from the new destination.
    pub fn attach(
        &self,
        citekey: &str,
        source: &Path,
        mode: ImportMode,
        current: Option<&DocumentRef>,
        overwrite: bool,
    ) -> Result<DocumentRef> {
        if !source.is_file() {
            return Err(PapersError::io_at(
                source,
                std::io::Error::new(std::io::ErrorKind::NotFound, "document not found"),
            ));
        }
        if let Some(existing) = current {
            if !overwrite {
                return Err(PapersError::AlreadyExists {
                    citekey: citekey.to_string(),
                    path: self.resolve_path(existing),
                });
            }
        }

        let new_ref = match mode {
            ImportMode::Link => {
                let abs = fs::canonicalize(source).map_err(|e| PapersError::io_at(source, e))?;
                DocumentRef::external(abs.to_string_lossy().into_owned())
            }
            ImportMode::Copy | ImportMode::Move => {
                let name = Self::file_name(citekey, source);
                let dest = self.doc_dir.join(&name);
                if dest.exists() && !overwrite && !same_file(source, &dest) {
                    return Err(PapersError::AlreadyExists {
                        citekey: citekey.to_string(),
                        path: dest,
                    });
                }
                self.ensure_doc_dir()?;
                if !same_file(source, &dest) {
                    if mode == ImportMode::Move {
                        self.move_into(source, &dest)?;
                    } else {
                        self.copy_into(source, &dest)?;
                    }
                }
                DocumentRef::managed(name)
            }
        };

        if let Some(previous) = current {
            if !previous.external && previous != &new_ref {
                if let Err(e) = self.detach(previous) {
                    warn!(citekey, error = %e, "could not delete replaced document");
                }
            }
        }
        Ok(new_ref)
    }

    /// Deletes a managed document. External documents are left alone.
    ///
    /// Returns whether a file was deleted; a missing file is not an error.
    pub fn detach(&self, doc: &DocumentRef) -> Result<bool> {
        if doc.external {
            debug!(path = %doc.path, "keeping external document");
            return Ok(false);
        }
        let path = self.resolve_path(doc);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted document");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PapersError::io_at(&path, e)),
        }
    }

    /// Renames a managed document to follow a new citekey.
    pub fn rename(&self, doc: &DocumentRef, new_key: &str) -> Result<DocumentRef> {
        if doc.external {
            return Ok(doc.clone());
        }
        let from = self.resolve_path(doc);
        let name = Self::file_name(new_key, &from);
        let to = self.doc_dir.join(&name);
        if to.exists() {
            return Err(PapersError::AlreadyExists {
                citekey: new_key.to_string(),
                path: to,
            });
        }
        fs::rename(&from, &to).map_err(|e| PapersError::io_at(&from, e))?;
        debug!(from = %from.display(), to = %to.display(), "renamed document");
        Ok(DocumentRef::managed(name))
    }

    fn ensure_doc_dir(&self) -> Result<()> {
        if !self.doc_dir.exists() {
            fs::create_dir_all(&self.doc_dir).map_err(|e| PapersError::io_at(&self.doc_dir, e))?;
        }
        Ok(())
    }

    /// Copies through a temp file in `doc/` so `dest` is never half written.
    fn copy_into(&self, source: &Path, dest: &Path) -> Result<()> {
        let tmp = self.doc_dir.join(format!(".doc-{}.tmp", Uuid::new_v4()));
        if let Err(e) = fs::copy(source, &tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(PapersError::io_at(source, e));
        }
        if let Err(e) = fs::rename(&tmp, dest) {
            let _ = fs::remove_file(&tmp);
            return Err(PapersError::io_at(dest, e));
        }
        debug!(from = %source.display(), to = %dest.display(), "copied document");
        Ok(())
    }

    fn move_into(&self, source: &Path, dest: &Path) -> Result<()> {
        match fs::rename(source, dest) {
            Ok(()) => {
                debug!(from = %source.display(), to = %dest.display(), "moved document");
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "rename failed, falling back to copy");
                self.copy_into(source, dest)?;
                if let Err(e) = fs::remove_file(source) {
                    warn!(path = %source.display(), error = %e, "document copied but source not removed");
                }
                Ok(())
            }
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        docs: DocumentManager,
        outside: PathBuf,
    }

    fn setup() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let outside = tmp.path().join("downloads");
        fs::create_dir_all(&outside).unwrap();
        let docs = DocumentManager::new(tmp.path().join("doc"));
        Fixture {
            _tmp: tmp,
            docs,
            outside,
        }
    }

    fn source(fx: &Fixture, name: &str, bytes: &[u8]) -> PathBuf {
        let path = fx.outside.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_copy_keeps_source() {
        let fx = setup();
        let src = source(&fx, "paper.PDF", b"%PDF-1.4 body");

        let doc = fx
            .docs
            .attach("Page99", &src, ImportMode::Copy, None, false)
            .unwrap();

        assert_eq!(doc, DocumentRef::managed("Page99.PDF"));
        assert!(src.exists());
        assert_eq!(fs::read(fx.docs.resolve_path(&doc)).unwrap(), b"%PDF-1.4 body");
    }

    #[test]
    fn test_move_removes_source() {
        let fx = setup();
        let src = source(&fx, "paper.pdf", b"bytes");

        let doc = fx
            .docs
            .attach("Page99", &src, ImportMode::Move, None, false)
            .unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(fx.docs.resolve_path(&doc)).unwrap(), b"bytes");
    }

    #[test]
    fn test_link_records_absolute_path() {
        let fx = setup();
        let src = source(&fx, "paper.ps", b"ps");

        let doc = fx
            .docs
            .attach("Page99", &src, ImportMode::Link, None, false)
            .unwrap();

        assert!(doc.external);
        assert!(Path::new(&doc.path).is_absolute());
        assert!(!fx.docs.doc_dir().join("Page99.ps").exists());

        // Detaching never deletes the user's file.
        assert!(!fx.docs.detach(&doc).unwrap());
        assert!(src.exists());
    }

    #[test]
    fn test_existing_document_requires_overwrite() {
        let fx = setup();
        let first = source(&fx, "a.pdf", b"first");
        let second = source(&fx, "b.djvu", b"second");
        let current = fx
            .docs
            .attach("K", &first, ImportMode::Copy, None, false)
            .unwrap();

        let err = fx
            .docs
            .attach("K", &second, ImportMode::Copy, Some(&current), false)
            .unwrap_err();
        assert!(matches!(err, PapersError::AlreadyExists { .. }));
        assert!(fx.docs.exists(&current));

        let replaced = fx
            .docs
            .attach("K", &second, ImportMode::Copy, Some(&current), true)
            .unwrap();
        assert_eq!(replaced.path, "K.djvu");
        assert!(!fx.docs.exists(&current));
    }

    #[test]
    fn test_orphan_destination_is_not_clobbered() {
        let fx = setup();
        fs::create_dir_all(fx.docs.doc_dir()).unwrap();
        fs::write(fx.docs.doc_dir().join("K.pdf"), b"orphan").unwrap();
        let src = source(&fx, "k.pdf", b"new");

        let err = fx
            .docs
            .attach("K", &src, ImportMode::Copy, None, false)
            .unwrap_err();
        assert!(matches!(err, PapersError::AlreadyExists { .. }));
        assert_eq!(fs::read(fx.docs.doc_dir().join("K.pdf")).unwrap(), b"orphan");
    }

    #[test]
    fn test_missing_source() {
        let fx = setup();
        let err = fx
            .docs
            .attach("K", &fx.outside.join("nope.pdf"), ImportMode::Copy, None, false)
            .unwrap_err();
        assert!(matches!(err, PapersError::IoPath { .. }));
    }

    #[test]
    fn test_detach_missing_file_is_ok() {
        let fx = setup();
        assert!(!fx.docs.detach(&DocumentRef::managed("gone.pdf")).unwrap());
    }

    #[test]
    fn test_rename() {
        let fx = setup();
        let src = source(&fx, "x.pdf", b"x");
        let doc = fx
            .docs
            .attach("Old", &src, ImportMode::Copy, None, false)
            .unwrap();

        let renamed = fx.docs.rename(&doc, "New").unwrap();
        assert_eq!(renamed.path, "New.pdf");
        assert!(fx.docs.exists(&renamed));
        assert!(!fx.docs.exists(&doc));
    }

    #[test]
    fn test_no_temp_files_left() {
        let fx = setup();
        let src = source(&fx, "x.pdf", b"x");
        fx.docs
            .attach("K", &src, ImportMode::Copy, None, false)
            .unwrap();
        let names: Vec<_> = fs::read_dir(fx.docs.doc_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["K.pdf"]);
    }

    #[test]
    fn test_import_mode_parsing() {
        assert_eq!("Move".parse::<ImportMode>().unwrap(), ImportMode::Move);
        assert_eq!(ImportMode::default(), ImportMode::Copy);
        assert!("hardlink".parse::<ImportMode>().is_err());
    }
}
