use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::filter::{sort_papers, CaseMode, PaperFilter, SortKey};
use crate::index::ListedPaper;
use crate::repo::Repository;
use crate::store::StorageBackend;

/// Lists papers matching `query`, keeping each paper's canonical index.
pub fn run<B: StorageBackend, S: AsRef<str>>(
    repo: &Repository<B>,
    query: &[S],
    case: CaseMode,
    sort: SortKey,
) -> Result<CmdResult> {
    let filter = PaperFilter::parse(query, case);
    let mut listed: Vec<ListedPaper> = repo
        .listed()?
        .into_iter()
        .filter(|lp| filter.matches(&lp.paper))
        .collect();

    if sort != SortKey::Added {
        let mut papers: Vec<_> = listed.iter().map(|lp| lp.paper.clone()).collect();
        sort_papers(&mut papers, sort);
        let mut sorted = Vec::with_capacity(listed.len());
        for paper in papers {
            if let Some(pos) = listed.iter().position(|lp| lp.paper.citekey == paper.citekey) {
                sorted.push(listed.swap_remove(pos));
            }
        }
        listed = sorted;
    }

    let mut result = CmdResult::default();
    if listed.is_empty() {
        let message = if filter.is_empty() {
            "No papers yet. Add one with `papers add`."
        } else {
            "No papers match."
        };
        result.add_message(CmdMessage::info(message));
    }
    Ok(result.with_listed(listed))
}
