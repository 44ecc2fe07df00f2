use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::repo::Repository;
use crate::store::StorageBackend;

/// Document paths of the given papers. Papers without a document produce a
/// warning instead of a path.
pub fn run<B: StorageBackend>(repo: &Repository<B>, citekeys: &[String]) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    for key in citekeys {
        let paper = repo.get(key)?;
        match repo.document_path(&paper) {
            Some(path) => {
                if !path.exists() {
                    result.add_message(CmdMessage::warning(format!(
                        "{}: document missing at {}",
                        key,
                        path.display()
                    )));
                }
                result.paths.push(path);
            }
            None => result.add_message(CmdMessage::warning(format!("{} has no document", key))),
        }
    }
    Ok(result)
}
