use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::repo::Repository;
use crate::store::StorageBackend;

pub fn run<B: StorageBackend>(
    repo: &mut Repository<B>,
    citekey: &str,
    new_key: &str,
) -> Result<CmdResult> {
    let paper = repo.rename(citekey, new_key)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Renamed {} to {}",
        citekey, new_key
    )));
    result.affected.push(paper);
    Ok(result)
}
