use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::repo::Repository;
use crate::store::StorageBackend;

pub fn run<B: StorageBackend>(repo: &mut Repository<B>, citekeys: &[String]) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    for key in citekeys {
        let report = repo.remove(key)?;
        let detail = if report.removed_document {
            " and its document"
        } else {
            ""
        };
        result.add_message(CmdMessage::success(format!("Removed {}{}", key, detail)));
        if let Some(e) = report.document_error {
            result.add_message(CmdMessage::warning(format!(
                "Document of {} was not deleted: {}",
                key, e
            )));
        }
    }
    Ok(result)
}
