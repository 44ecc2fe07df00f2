use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::repo::Repository;
use crate::store::StorageBackend;
use crate::tags::{parse_tag_ops, TagOps};

/// Every tag in the repository.
pub fn list_all<B: StorageBackend>(repo: &Repository<B>) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    result.tags = repo.all_tags()?.into_iter().collect();
    if result.tags.is_empty() {
        result.add_message(CmdMessage::info("No tags yet."));
    }
    Ok(result)
}

/// The tags of one paper.
pub fn show<B: StorageBackend>(repo: &Repository<B>, citekey: &str) -> Result<CmdResult> {
    let paper = repo.get(citekey)?;
    let mut result = CmdResult::default();
    result.tags = paper.metadata.tags.iter().cloned().collect();
    result.affected.push(paper);
    Ok(result)
}

/// Papers carrying every added tag of `query` and none of the removed ones,
/// e.g. `network+search-old`.
pub fn find<B: StorageBackend>(repo: &Repository<B>, query: &str) -> Result<CmdResult> {
    let ops = parse_tag_ops(query)?;
    let listed = repo
        .listed()?
        .into_iter()
        .filter(|lp| {
            ops.add.iter().all(|t| lp.paper.has_tag(t))
                && !ops.remove.iter().any(|t| lp.paper.has_tag(t))
        })
        .collect::<Vec<_>>();

    let mut result = CmdResult::default();
    if listed.is_empty() {
        result.add_message(CmdMessage::info(format!("No papers tagged {}", query)));
    }
    Ok(result.with_listed(listed))
}

/// Applies an operation string such as `network+search-old` to a paper.
pub fn apply<B: StorageBackend>(
    repo: &mut Repository<B>,
    citekey: &str,
    ops: &str,
) -> Result<CmdResult> {
    let TagOps { add, remove } = parse_tag_ops(ops)?;
    if !add.is_empty() {
        repo.add_tags(citekey, add.as_slice())?;
    }
    let paper = if remove.is_empty() {
        repo.get(citekey)?
    } else {
        repo.remove_tags(citekey, remove.as_slice())?
    };

    let mut result = CmdResult::default();
    let tags: Vec<_> = paper.metadata.tags.iter().cloned().collect();
    result.add_message(CmdMessage::success(format!(
        "{} tags: {}",
        citekey,
        if tags.is_empty() {
            "(none)".to_string()
        } else {
            tags.join(", ")
        }
    )));
    result.tags = tags;
    result.affected.push(paper);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Format;
    use crate::commands::add::{self, AddOptions};
    use crate::commands::fixtures::{self, KNUTH, PAGE};

    fn seeded() -> (tempfile::TempDir, Repository<crate::store::mem_backend::MemBackend>) {
        let (tmp, mut repo) = fixtures::repo();
        add::run(&mut repo, PAGE, Format::Bibtex, "t", AddOptions::default()).unwrap();
        add::run(&mut repo, KNUTH, Format::Bibtex, "t", AddOptions::default()).unwrap();
        (tmp, repo)
    }

    #[test]
    fn apply_and_show() {
        let (_tmp, mut repo) = seeded();
        apply(&mut repo, "Page99", "network+search+old").unwrap();
        let result = apply(&mut repo, "Page99", "-old").unwrap();
        assert_eq!(result.tags, vec!["network", "search"]);
        assert_eq!(result.messages[0].content, "Page99 tags: network, search");

        let shown = show(&repo, "Page99").unwrap();
        assert_eq!(shown.tags, vec!["network", "search"]);
    }

    #[test]
    fn find_by_tags() {
        let (_tmp, mut repo) = seeded();
        apply(&mut repo, "Page99", "network+search").unwrap();
        apply(&mut repo, "Knuth84", "search").unwrap();

        let both = find(&repo, "search").unwrap();
        assert_eq!(both.listed.len(), 2);
        let one = find(&repo, "search-network").unwrap();
        assert_eq!(one.listed.len(), 1);
        assert_eq!(one.listed[0].paper.citekey, "Knuth84");
        assert_eq!(one.listed[0].index, 2);
    }

    #[test]
    fn all_tags() {
        let (_tmp, mut repo) = seeded();
        assert!(list_all(&repo).unwrap().tags.is_empty());
        apply(&mut repo, "Page99", "b+a").unwrap();
        assert_eq!(list_all(&repo).unwrap().tags, vec!["a", "b"]);
    }

    #[test]
    fn invalid_ops() {
        let (_tmp, mut repo) = seeded();
        assert!(apply(&mut repo, "Page99", "+").is_err());
        assert!(apply(&mut repo, "Page99", "a,b").is_err());
    }
}
