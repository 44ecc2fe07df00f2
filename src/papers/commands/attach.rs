use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::repo::{AttachOptions, Repository};
use crate::store::StorageBackend;
use std::path::Path;

pub fn run<B: StorageBackend>(
    repo: &mut Repository<B>,
    citekey: &str,
    document: &Path,
    options: AttachOptions,
) -> Result<CmdResult> {
    let paper = repo.attach_document(citekey, document, options)?;
    let mut result = CmdResult::default();
    if let Some(path) = repo.document_path(&paper) {
        result.add_message(CmdMessage::success(format!(
            "Attached {} to {}",
            path.display(),
            citekey
        )));
        result.paths.push(path);
    }
    result.affected.push(paper);
    Ok(result)
}
