use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::repo::Repository;
use crate::store::StorageBackend;

/// Reports inconsistencies between the sub-stores; fixes them with `repair`.
pub fn run<B: StorageBackend>(repo: &mut Repository<B>, repair: bool) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    let report = if repair {
        repo.repair()?
    } else {
        repo.check()?.clone()
    };

    if report.is_clean() {
        result.add_message(CmdMessage::success("No inconsistencies found."));
        return Ok(result);
    }

    result.add_message(CmdMessage::warning(if repair {
        "Inconsistencies found and repaired:"
    } else {
        "Inconsistencies found:"
    }));
    for finding in report.findings() {
        result.add_message(CmdMessage::info(format!("  - {}", finding)));
    }
    if repair {
        if !report.missing_metadata.is_empty() {
            result.add_message(CmdMessage::success(format!(
                "Created metadata for {} record(s).",
                report.missing_metadata.len()
            )));
        }
        if !report.missing_record.is_empty() {
            result.add_message(CmdMessage::success(format!(
                "Deleted {} orphaned metadata file(s).",
                report.missing_record.len()
            )));
        }
        if !report.unreadable.is_empty() {
            result.add_message(CmdMessage::warning(format!(
                "{} paper(s) cannot be parsed; fix the files or remove them by citekey.",
                report.unreadable.len()
            )));
        }
    } else {
        result.add_message(CmdMessage::info("Run `papers doctor --repair` to fix."));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PapersConfig;
    use crate::store::mem_backend::MemBackend;
    use crate::store::{StorageBackend, StoreKind};

    fn broken() -> Repository<MemBackend> {
        let backend = MemBackend::new();
        backend
            .write(StoreKind::Bib, "Orphan", "@misc{Orphan, title = {O}}\n")
            .unwrap();
        backend
            .write(StoreKind::Meta, "Zombie", "added: 2024-01-01T00:00:00Z\n")
            .unwrap();
        Repository::with_backend(backend, PapersConfig::default()).unwrap()
    }

    #[test]
    fn clean_repository() {
        let (_tmp, mut repo) = crate::commands::fixtures::repo();
        let result = run(&mut repo, false).unwrap();
        assert_eq!(result.messages.len(), 1);
        assert!(result.messages[0].content.contains("No inconsistencies"));
    }

    #[test]
    fn reports_without_fixing() {
        let mut repo = broken();
        let result = run(&mut repo, false).unwrap();
        assert!(result.messages[0].content.contains("Inconsistencies found:"));
        assert!(result
            .messages
            .iter()
            .any(|m| m.content.contains("Orphan: record without metadata")));
        assert!(result
            .messages
            .iter()
            .any(|m| m.content.contains("Zombie: metadata without record")));
        assert!(!repo.consistency().is_clean());
    }

    #[test]
    fn unparsable_paper_is_reported_but_not_repaired() {
        let backend = MemBackend::new();
        backend
            .write(StoreKind::Bib, "Broken", "@misc{Broken, title = {x}\n")
            .unwrap();
        backend
            .write(StoreKind::Meta, "Broken", "added: 2024-01-01T00:00:00Z\n")
            .unwrap();
        let mut repo = Repository::with_backend(backend, PapersConfig::default()).unwrap();

        let result = run(&mut repo, true).unwrap();
        assert!(result
            .messages
            .iter()
            .any(|m| m.content.contains("Broken: record or metadata cannot be parsed")));
        assert!(result
            .messages
            .iter()
            .any(|m| m.content.contains("1 paper(s) cannot be parsed")));
        assert_eq!(repo.consistency().unreadable, vec!["Broken"]);
        assert_eq!(repo.keys().unwrap(), vec!["Broken"]);
    }

    #[test]
    fn repairs() {
        let mut repo = broken();
        let result = run(&mut repo, true).unwrap();
        assert!(result.messages[0].content.contains("repaired"));
        assert!(repo.consistency().is_clean());
        assert_eq!(repo.keys().unwrap(), vec!["Orphan"]);

        let again = run(&mut repo, false).unwrap();
        assert!(again.messages[0].content.contains("No inconsistencies"));
    }
}
