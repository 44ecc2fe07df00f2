//! Repository configuration, stored as `config.json` at the repository root.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `import_mode` | `copy` | How `add`/`attach` bring documents in: `copy`, `move` or `link` |
//! | `import_extensions` | `[".bib", ".bibtex", ".yaml", ".yml"]` | Files `import` picks up from directories |
//!
//! The config is loaded once and passed to the repository explicitly; nothing
//! reads it from global state.

use crate::docs::ImportMode;
use crate::error::{PapersError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PapersConfig {
    /// Default document import mode when the caller does not choose one.
    #[serde(default)]
    pub import_mode: ImportMode,

    /// Extensions considered when importing a directory.
    #[serde(default = "default_import_ext")]
    pub import_extensions: Vec<String>,
}

fn default_import_ext() -> Vec<String> {
    vec![
        ".bib".to_string(),
        ".bibtex".to_string(),
        ".yaml".to_string(),
        ".yml".to_string(),
    ]
}

impl Default for PapersConfig {
    fn default() -> Self {
        Self {
            import_mode: ImportMode::default(),
            import_extensions: default_import_ext(),
        }
    }
}

impl PapersConfig {
    /// Loads `config.json` from `repo_dir`, defaults when it does not exist.
    pub fn load<P: AsRef<Path>>(repo_dir: P) -> Result<Self> {
        let config_path = repo_dir.as_ref().join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(&config_path).map_err(|e| PapersError::io_at(&config_path, e))?;
        let config: PapersConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, repo_dir: P) -> Result<()> {
        let repo_dir = repo_dir.as_ref();
        if !repo_dir.exists() {
            fs::create_dir_all(repo_dir).map_err(|e| PapersError::io_at(repo_dir, e))?;
        }

        let config_path = repo_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content).map_err(|e| PapersError::io_at(&config_path, e))?;
        Ok(())
    }

    /// Whether `path` has one of the import extensions (case-insensitive).
    pub fn is_importable(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = format!(".{}", ext.to_lowercase());
        self.import_extensions
            .iter()
            .any(|e| normalize_ext(e) == ext)
    }
}

fn normalize_ext(ext: &str) -> String {
    let ext = ext.to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PapersConfig::default();
        assert_eq!(config.import_mode, ImportMode::Copy);
        assert_eq!(config.import_extensions, vec![".bib", ".bibtex", ".yaml", ".yml"]);
    }

    #[test]
    fn test_load_missing_config() {
        let tmp = TempDir::new().unwrap();
        let config = PapersConfig::load(tmp.path()).unwrap();
        assert_eq!(config, PapersConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let config = PapersConfig {
            import_mode: ImportMode::Link,
            ..Default::default()
        };
        config.save(tmp.path()).unwrap();

        let loaded = PapersConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded.import_mode, ImportMode::Link);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), r#"{"import_mode": "move"}"#).unwrap();
        let loaded = PapersConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded.import_mode, ImportMode::Move);
        assert_eq!(loaded.import_extensions.len(), 4);
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "{not json").unwrap();
        assert!(matches!(
            PapersConfig::load(tmp.path()),
            Err(PapersError::Serialization(_))
        ));
    }

    #[test]
    fn test_is_importable() {
        let config = PapersConfig {
            import_extensions: vec!["bib".into(), ".YML".into()],
            ..Default::default()
        };
        assert!(config.is_importable(Path::new("refs/a.BIB")));
        assert!(config.is_importable(Path::new("b.yml")));
        assert!(!config.is_importable(Path::new("c.yaml")));
        assert!(!config.is_importable(Path::new("Makefile")));
    }
}
