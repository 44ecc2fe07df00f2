use crate::citekey::validate_citekey;
use crate::codec::{self, Format};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{PapersError, Result};
use crate::repo::{NewPaper, Repository};
use crate::store::StorageBackend;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Imports every entry from the given files and directories.
///
/// Directories are scanned (not recursively) for files with one of the
/// configured import extensions. Entries keep their own key when it is valid
/// and unused; otherwise a key is derived. A file that fails to parse is
/// reported and skipped, the rest of the import goes on.
pub fn run<B: StorageBackend>(repo: &mut Repository<B>, paths: &[PathBuf]) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(path)
                .map_err(|e| PapersError::io_at(path, e))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && repo.config().is_importable(p))
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            result.add_message(CmdMessage::warning(format!(
                "Path not found: {}",
                path.display()
            )));
        }
    }

    let mut imported = 0;
    for file in files {
        match import_file(repo, &file, &mut result) {
            Ok(count) => imported += count,
            Err(e) => {
                warn!(path = %file.display(), error = %e, "import failed");
                result.add_message(CmdMessage::warning(format!(
                    "Failed to import {}: {}",
                    file.display(),
                    e
                )));
            }
        }
    }

    result.add_message(CmdMessage::success(format!("Total imported: {}", imported)));
    Ok(result)
}

fn import_file<B: StorageBackend>(
    repo: &mut Repository<B>,
    path: &Path,
    result: &mut CmdResult,
) -> Result<usize> {
    let format = Format::from_path(path).unwrap_or(Format::Bibtex);
    let text = fs::read_to_string(path).map_err(|e| PapersError::io_at(path, e))?;
    let entries = codec::decode_entries(&text, format, &path.display().to_string())?;

    let mut count = 0;
    for entry in entries {
        let mut new = NewPaper::new(entry.record);
        if validate_citekey(&entry.key).is_ok() && !repo.key_in_use(&entry.key)? {
            new = new.with_citekey(entry.key.clone());
        }
        match repo.add(new) {
            Ok(report) => {
                result.add_message(CmdMessage::info(format!("Imported {}", report.paper.citekey)));
                result.affected.push(report.paper);
                count += 1;
            }
            Err(e) => {
                result.add_message(CmdMessage::warning(format!(
                    "Skipped '{}' from {}: {}",
                    entry.key,
                    path.display(),
                    e
                )));
            }
        }
    }
    Ok(count)
}
