use crate::codec::{self, Format};
use crate::commands::{CmdMessage, CmdResult};
use crate::docs::ImportMode;
use crate::error::Result;
use crate::repo::{NewPaper, Repository};
use crate::store::StorageBackend;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub citekey: Option<String>,
    pub document: Option<PathBuf>,
    pub mode: Option<ImportMode>,
    pub tags: Vec<String>,
}

/// Adds the single entry in `text`. The entry's own key is ignored unless
/// given as `options.citekey`; otherwise one is derived.
pub fn run<B: StorageBackend>(
    repo: &mut Repository<B>,
    text: &str,
    format: Format,
    origin: &str,
    options: AddOptions,
) -> Result<CmdResult> {
    let entry = codec::decode_entry(text, format, origin)?;

    let mut new = NewPaper::new(entry.record).with_tags(options.tags);
    new.citekey = options.citekey;
    if let Some(doc) = options.document {
        new = new.with_document(doc, options.mode);
    }

    let report = repo.add(new)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Added {}",
        report.paper.summary()
    )));
    if let Some(e) = &report.document_error {
        result.add_message(CmdMessage::warning(format!(
            "Document not attached: {}. Retry with `papers attach {} <file>`.",
            e, report.paper.citekey
        )));
    }
    result.affected.push(report.paper);
    Ok(result)
}
