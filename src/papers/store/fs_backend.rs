use super::{StorageBackend, StoreKind};
use crate::error::{PapersError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// The on-disk repository layout.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub const DOC_DIR: &'static str = "doc";
    pub const NOTES_DIR: &'static str = "notes";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn store_dir(&self, kind: StoreKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    fn file_name(kind: StoreKind, key: &str) -> String {
        format!("{}.{}", key, kind.extension())
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| PapersError::io_at(path, e))?;
        }
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn root(&self) -> PathBuf {
        self.root.clone()
    }

    fn is_initialized(&self) -> bool {
        self.store_dir(StoreKind::Bib).is_dir()
    }

    fn init(&self) -> Result<()> {
        for dir in [
            self.store_dir(StoreKind::Bib),
            self.store_dir(StoreKind::Meta),
            self.root.join(Self::DOC_DIR),
            self.root.join(Self::NOTES_DIR),
        ] {
            self.ensure_dir(&dir)?;
        }
        Ok(())
    }

    fn read(&self, kind: StoreKind, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(kind, key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PapersError::io_at(&path, e)),
        }
    }

    fn write(&self, kind: StoreKind, key: &str, content: &str) -> Result<()> {
        let dir = self.store_dir(kind);
        self.ensure_dir(&dir)?;

        let target = dir.join(Self::file_name(kind, key));
        let tmp = dir.join(format!(".{}-{}.tmp", key, Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, content) {
            let _ = fs::remove_file(&tmp);
            return Err(PapersError::io_at(&tmp, e));
        }
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(PapersError::io_at(&target, e));
        }
        debug!(path = %target.display(), "wrote");
        Ok(())
    }

    fn delete(&self, kind: StoreKind, key: &str) -> Result<bool> {
        let path = self.entry_path(kind, key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PapersError::io_at(&path, e)),
        }
    }

    fn list_keys(&self, kind: StoreKind) -> Result<Vec<String>> {
        let dir = self.store_dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|e| PapersError::io_at(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PapersError::io_at(&dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            // Staged writes and editor swap files.
            if name.starts_with('.') {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(kind.extension()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn entry_path(&self, kind: StoreKind, key: &str) -> PathBuf {
        self.store_dir(kind).join(Self::file_name(kind, key))
    }

    fn doc_dir(&self) -> PathBuf {
        self.root.join(Self::DOC_DIR)
    }
}
