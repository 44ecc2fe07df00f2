use crate::codec::{self, Format};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::repo::Repository;
use crate::store::StorageBackend;

/// Replaces the record of `citekey` with the single entry in `text`.
///
/// The key written in `text` is ignored; renaming is a separate command.
pub fn run<B: StorageBackend>(
    repo: &mut Repository<B>,
    citekey: &str,
    text: &str,
    format: Format,
    origin: &str,
) -> Result<CmdResult> {
    let entry = codec::decode_entry(text, format, origin)?;
    let paper = repo.update(citekey, entry.record)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Updated {}", paper.summary())));
    if entry.key != citekey {
        result.add_message(CmdMessage::info(format!(
            "Key '{}' in {} ignored; use `papers rename` to change the citekey.",
            entry.key, origin
        )));
    }
    result.affected.push(paper);
    Ok(result)
}
