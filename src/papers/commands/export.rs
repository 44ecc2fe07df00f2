use crate::codec::{self, Format};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Entry;
use crate::repo::Repository;
use crate::store::StorageBackend;

/// Encodes the given papers, or every paper when `citekeys` is empty, into
/// `result.output`.
pub fn run<B: StorageBackend>(
    repo: &Repository<B>,
    citekeys: &[String],
    format: Format,
) -> Result<CmdResult> {
    let entries: Vec<Entry> = if citekeys.is_empty() {
        repo.listed()?.into_iter().map(|lp| lp.paper.entry()).collect()
    } else {
        citekeys
            .iter()
            .map(|k| repo.get(k).map(|p| p.entry()))
            .collect::<Result<_>>()?
    };

    let mut result = CmdResult::default();
    if entries.is_empty() {
        result.add_message(CmdMessage::info("Nothing to export."));
        return Ok(result);
    }
    result.output = Some(codec::encode_entries(&entries, format)?);
    Ok(result)
}
