//! # Paper Repository
//!
//! The mapping from citekey to paper, and the only place that writes the
//! bib/meta/doc triad.
//!
//! ## Lifecycle
//!
//! A citekey is either absent or present. `add` makes it present, `remove`
//! makes it absent again; `rename` is an add under the new key followed by a
//! removal of the old one. There is no persisted intermediate state.
//!
//! ## Write Order
//!
//! - `add`: record, then metadata, then the document. A failed record or
//!   metadata write undoes what was written. A failed document step does not
//!   fail the add; it is reported in [`AddReport::document_error`] and can be
//!   retried with [`Repository::attach_document`].
//! - `remove`: record, then metadata, then the managed document. Document
//!   errors are reported in [`RemoveReport`] but never block the removal.
//!
//! ## Consistency
//!
//! Each file is replaced atomically, but the triad is not. On open the
//! repository compares the two sub-stores and logs what it finds; it does not
//! fix anything unless [`Repository::repair`] is called. Papers missing either
//! half, or with a half that does not parse, are left out of listings. They
//! can still be removed by their exact citekey.
//!
//! ## Records
//!
//! Every record is normalized and passed through [`codec::check_record`]
//! before it is written, so nothing reaches `bib/` that cannot be read back.

use crate::citekey::{derive_key, validate_citekey};
use crate::codec::{self, Format};
use crate::config::PapersConfig;
use crate::docs::{DocumentManager, ImportMode};
use crate::error::{PapersError, Result};
use crate::filter::{sort_papers, PaperFilter, SortKey};
use crate::index::{index_papers, resolve_reference, resolve_references, ListedPaper};
use crate::model::{BibRecord, Entry, Metadata, Paper};
use crate::store::fs_backend::FsBackend;
use crate::store::{ConsistencyReport, StorageBackend, StoreKind};
use crate::tags::check_tag;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Input to [`Repository::add`].
#[derive(Debug, Clone)]
pub struct NewPaper {
    pub record: BibRecord,
    /// Use this key instead of deriving one. Must be unused.
    pub citekey: Option<String>,
    pub document: Option<PathBuf>,
    pub tags: Vec<String>,
    /// Overrides the configured import mode.
    pub mode: Option<ImportMode>,
}

impl NewPaper {
    pub fn new(record: BibRecord) -> Self {
        Self {
            record,
            citekey: None,
            document: None,
            tags: Vec::new(),
            mode: None,
        }
    }

    pub fn with_citekey(mut self, key: impl Into<String>) -> Self {
        self.citekey = Some(key.into());
        self
    }

    pub fn with_document(mut self, path: impl Into<PathBuf>, mode: Option<ImportMode>) -> Self {
        self.document = Some(path.into());
        self.mode = mode;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug)]
pub struct AddReport {
    pub paper: Paper,
    /// Set when a document was supplied but could not be attached.
    pub document_error: Option<PapersError>,
}

#[derive(Debug)]
pub struct RemoveReport {
    pub citekey: String,
    /// A managed document file was deleted.
    pub removed_document: bool,
    pub document_error: Option<PapersError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttachOptions {
    /// `None` uses the configured import mode.
    pub mode: Option<ImportMode>,
    /// Replace an existing document.
    pub overwrite: bool,
}

pub struct Repository<B: StorageBackend> {
    backend: B,
    config: PapersConfig,
    docs: DocumentManager,
    report: ConsistencyReport,
}

impl Repository<FsBackend> {
    /// Creates the directory layout and `config.json` under `dir`.
    pub fn initialize(dir: &Path, config: PapersConfig) -> Result<Self> {
        let backend = FsBackend::new(dir);
        if backend.is_initialized() {
            return Err(PapersError::AlreadyInitialized(dir.to_path_buf()));
        }
        backend.init()?;
        config.save(dir)?;
        info!(path = %dir.display(), "initialized repository");
        Self::with_backend(backend, config)
    }

    pub fn open(dir: &Path) -> Result<Self> {
        let backend = FsBackend::new(dir);
        if !backend.is_initialized() {
            return Err(PapersError::NotInitialized(dir.to_path_buf()));
        }
        let config = PapersConfig::load(dir)?;
        Self::with_backend(backend, config)
    }
}

impl<B: StorageBackend> Repository<B> {
    /// Wraps an initialized backend and runs the consistency check.
    pub fn with_backend(backend: B, config: PapersConfig) -> Result<Self> {
        if !backend.is_initialized() {
            return Err(PapersError::NotInitialized(backend.root()));
        }
        let docs = DocumentManager::new(backend.doc_dir());
        let mut repo = Self {
            backend,
            config,
            docs,
            report: ConsistencyReport::default(),
        };
        repo.check()?;
        Ok(repo)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &PapersConfig {
        &self.config
    }

    pub fn docs(&self) -> &DocumentManager {
        &self.docs
    }

    pub fn root(&self) -> PathBuf {
        self.backend.root()
    }

    /// The findings of the last [`check`](Self::check).
    pub fn consistency(&self) -> &ConsistencyReport {
        &self.report
    }

    /// Compares the sub-stores and logs every finding at `warn`.
    pub fn check(&mut self) -> Result<&ConsistencyReport> {
        self.report = self.scan()?;
        for finding in self.report.findings() {
            warn!("{}", finding);
        }
        Ok(&self.report)
    }

    fn scan(&self) -> Result<ConsistencyReport> {
        let bib: BTreeSet<String> = self.backend.list_keys(StoreKind::Bib)?.into_iter().collect();
        let meta: BTreeSet<String> = self.backend.list_keys(StoreKind::Meta)?.into_iter().collect();

        let mut report = ConsistencyReport {
            missing_metadata: bib.difference(&meta).cloned().collect(),
            missing_record: meta.difference(&bib).cloned().collect(),
            ..Default::default()
        };
        for key in bib.intersection(&meta) {
            match self.read_record(key).and_then(|_| self.read_metadata(key)) {
                Ok(Some(m)) => {
                    if let Some(doc) = &m.document {
                        if !self.docs.exists(doc) {
                            report.missing_documents.push(key.clone());
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(citekey = %key, error = %e, "unreadable paper");
                    report.unreadable.push(key.clone());
                }
            }
        }
        Ok(report)
    }

    /// Rewrites the store so both halves agree: records without metadata get
    /// fresh metadata, metadata without a record is deleted. Unreadable papers
    /// are left for the user to fix or remove.
    ///
    /// Returns the report that was acted on.
    pub fn repair(&mut self) -> Result<ConsistencyReport> {
        let report = self.scan()?;
        for key in &report.missing_metadata {
            self.write_metadata(key, &Metadata::new())?;
            info!(citekey = %key, "created missing metadata");
        }
        for key in &report.missing_record {
            self.backend.delete(StoreKind::Meta, key)?;
            info!(citekey = %key, "deleted orphaned metadata");
        }
        self.check()?;
        Ok(report)
    }

    /// Citekeys with both a record and metadata, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let meta: BTreeSet<String> = self.backend.list_keys(StoreKind::Meta)?.into_iter().collect();
        Ok(self
            .backend
            .list_keys(StoreKind::Bib)?
            .into_iter()
            .filter(|k| meta.contains(k))
            .collect())
    }

    /// Every key present in either sub-store. New keys must avoid all of them.
    fn used_keys(&self) -> Result<BTreeSet<String>> {
        let mut keys: BTreeSet<String> = self.backend.list_keys(StoreKind::Bib)?.into_iter().collect();
        keys.extend(self.backend.list_keys(StoreKind::Meta)?);
        Ok(keys)
    }

    /// Whether `key` (compared case-insensitively) is taken in either sub-store.
    pub fn key_in_use(&self, key: &str) -> Result<bool> {
        Ok(self
            .used_keys()?
            .iter()
            .any(|k| k.eq_ignore_ascii_case(key)))
    }

    fn origin(&self, kind: StoreKind, key: &str) -> String {
        self.backend.entry_path(kind, key).display().to_string()
    }

    fn read_record(&self, key: &str) -> Result<Option<BibRecord>> {
        let Some(text) = self.backend.read(StoreKind::Bib, key)? else {
            return Ok(None);
        };
        let entry = codec::decode_entry(&text, Format::Bibtex, &self.origin(StoreKind::Bib, key))?;
        Ok(Some(entry.record))
    }

    fn read_metadata(&self, key: &str) -> Result<Option<Metadata>> {
        let Some(text) = self.backend.read(StoreKind::Meta, key)? else {
            return Ok(None);
        };
        codec::decode_metadata(&text, &self.origin(StoreKind::Meta, key)).map(Some)
    }

    fn write_record(&self, key: &str, record: &BibRecord) -> Result<()> {
        codec::check_record(record, &format!("record {}", key))?;
        let text = codec::encode_entry(&Entry::new(key, record.clone()), Format::Bibtex)?;
        self.backend.write(StoreKind::Bib, key, &text)
    }

    fn write_metadata(&self, key: &str, meta: &Metadata) -> Result<()> {
        let text = codec::encode_metadata(meta)?;
        self.backend.write(StoreKind::Meta, key, &text)
    }

    pub fn get(&self, citekey: &str) -> Result<Paper> {
        validate_citekey(citekey).map_err(|_| PapersError::NotFound(citekey.to_string()))?;
        let record = self.read_record(citekey)?;
        let metadata = self.read_metadata(citekey)?;
        match (record, metadata) {
            (Some(record), Some(metadata)) => Ok(Paper::new(citekey, record, metadata)),
            _ => Err(PapersError::NotFound(citekey.to_string())),
        }
    }

    pub fn contains(&self, citekey: &str) -> bool {
        self.get(citekey).is_ok()
    }

    pub fn add(&mut self, mut new: NewPaper) -> Result<AddReport> {
        new.record.normalize();
        let key = match &new.citekey {
            Some(key) => {
                validate_citekey(key)?;
                if self.key_in_use(key)? {
                    return Err(PapersError::KeyCollision(key.clone()));
                }
                key.clone()
            }
            None => derive_key(&new.record, self.used_keys()?)?,
        };
        for tag in &new.tags {
            check_tag(tag)?;
        }
        codec::check_record(&new.record, &format!("record {}", key))?;

        let mut metadata = Metadata::new();
        metadata.tags = new.tags.iter().cloned().collect();

        self.write_record(&key, &new.record)?;
        if let Err(e) = self.write_metadata(&key, &metadata) {
            self.undo_write(StoreKind::Bib, &key);
            return Err(e);
        }
        info!(citekey = %key, "added paper");

        let mut document_error = None;
        if let Some(source) = &new.document {
            let mode = new.mode.unwrap_or(self.config.import_mode);
            match self.docs.attach(&key, source, mode, None, false) {
                Ok(doc) => {
                    metadata.document = Some(doc);
                    if let Err(e) = self.write_metadata(&key, &metadata) {
                        warn!(citekey = %key, error = %e, "document stored but not recorded");
                        metadata.document = None;
                        document_error = Some(e);
                    }
                }
                Err(e) => {
                    warn!(citekey = %key, error = %e, "document not attached");
                    document_error = Some(e);
                }
            }
        }

        Ok(AddReport {
            paper: Paper::new(key, new.record, metadata),
            document_error,
        })
    }

    fn undo_write(&self, kind: StoreKind, key: &str) {
        if let Err(e) = self.backend.delete(kind, key) {
            warn!(citekey = %key, store = %kind, error = %e, "could not undo partial write");
        }
    }

    pub fn remove(&mut self, citekey: &str) -> Result<RemoveReport> {
        validate_citekey(citekey).map_err(|_| PapersError::NotFound(citekey.to_string()))?;
        let has_record = self.backend.read(StoreKind::Bib, citekey)?.is_some();
        let metadata = match self.read_metadata(citekey) {
            Ok(m) => m,
            Err(e) => {
                warn!(citekey, error = %e, "removing paper with unreadable metadata");
                None
            }
        };
        let has_meta = self.backend.read(StoreKind::Meta, citekey)?.is_some();
        if !has_record && !has_meta {
            return Err(PapersError::NotFound(citekey.to_string()));
        }

        self.backend.delete(StoreKind::Bib, citekey)?;
        self.backend.delete(StoreKind::Meta, citekey)?;

        let mut report = RemoveReport {
            citekey: citekey.to_string(),
            removed_document: false,
            document_error: None,
        };
        if let Some(doc) = metadata.and_then(|m| m.document) {
            match self.docs.detach(&doc) {
                Ok(removed) => report.removed_document = removed,
                Err(e) => {
                    warn!(citekey, error = %e, "document not removed");
                    report.document_error = Some(e);
                }
            }
        }
        info!(citekey, "removed paper");
        Ok(report)
    }

    /// Replaces the bibliographic record. The citekey does not change.
    pub fn update(&mut self, citekey: &str, mut record: BibRecord) -> Result<Paper> {
        record.normalize();
        let mut paper = self.get(citekey)?;
        self.write_record(citekey, &record)?;
        paper.record = record;
        debug!(citekey, "updated record");
        Ok(paper)
    }

    fn update_metadata<F>(&mut self, citekey: &str, f: F) -> Result<Paper>
    where
        F: FnOnce(&mut Metadata) -> Result<()>,
    {
        let mut paper = self.get(citekey)?;
        f(&mut paper.metadata)?;
        self.write_metadata(citekey, &paper.metadata)?;
        Ok(paper)
    }

    pub fn set_tags<I, S>(&mut self, citekey: &str, tags: I) -> Result<Paper>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        for tag in &tags {
            check_tag(tag)?;
        }
        self.update_metadata(citekey, |m| {
            m.tags = tags;
            Ok(())
        })
    }

    pub fn add_tags<S: AsRef<str>>(&mut self, citekey: &str, tags: &[S]) -> Result<Paper> {
        for tag in tags {
            check_tag(tag.as_ref())?;
        }
        self.update_metadata(citekey, |m| {
            m.tags.extend(tags.iter().map(|t| t.as_ref().to_string()));
            Ok(())
        })
    }

    pub fn remove_tags<S: AsRef<str>>(&mut self, citekey: &str, tags: &[S]) -> Result<Paper> {
        self.update_metadata(citekey, |m| {
            for tag in tags {
                m.tags.remove(tag.as_ref());
            }
            Ok(())
        })
    }

    pub fn attach_document(
        &mut self,
        citekey: &str,
        source: &Path,
        options: AttachOptions,
    ) -> Result<Paper> {
        let mode = options.mode.unwrap_or(self.config.import_mode);
        let docs = self.docs.clone();
        let paper = self.update_metadata(citekey, |m| {
            let doc = docs.attach(citekey, source, mode, m.document.as_ref(), options.overwrite)?;
            m.document = Some(doc);
            Ok(())
        })?;
        info!(citekey, %mode, "attached document");
        Ok(paper)
    }

    /// Absolute path of the paper's document, if it has one.
    pub fn document_path(&self, paper: &Paper) -> Option<PathBuf> {
        paper
            .metadata
            .document
            .as_ref()
            .map(|d| self.docs.resolve_path(d))
    }

    /// Papers matching `filter`, ordered by `sort`. Papers that fail to parse
    /// are skipped; [`check`](Self::check) reports them.
    pub fn list(&self, filter: &PaperFilter, sort: SortKey) -> Result<Vec<Paper>> {
        let mut papers = Vec::new();
        for key in self.keys()? {
            let paper = match self.get(&key) {
                Ok(paper) => paper,
                Err(e @ PapersError::Parse { .. }) => {
                    warn!(citekey = %key, error = %e, "skipping unreadable paper");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if filter.matches(&paper) {
                papers.push(paper);
            }
        }
        sort_papers(&mut papers, sort);
        Ok(papers)
    }

    /// All papers with their display indexes, in the canonical order.
    pub fn listed(&self) -> Result<Vec<ListedPaper>> {
        Ok(index_papers(self.list(&PaperFilter::all(), SortKey::Added)?))
    }

    /// Resolves a reference to a citekey. An exact citekey is matched before
    /// any paper is parsed, so it also finds papers left out of listings.
    pub fn resolve(&self, reference: &str) -> Result<String> {
        if self.keys()?.iter().any(|k| k == reference) {
            return Ok(reference.to_string());
        }
        resolve_reference(&self.listed()?, reference)
    }

    /// Resolves several references in order, dropping repeats.
    pub fn resolve_many<S: AsRef<str>>(&self, references: &[S]) -> Result<Vec<String>> {
        let keys = self.keys()?;
        let is_key = |reference: &str| keys.iter().any(|k| k == reference);
        let listed = if references.iter().all(|r| is_key(r.as_ref())) {
            Vec::new()
        } else {
            self.listed()?
        };

        let mut resolved: Vec<String> = Vec::new();
        for reference in references {
            let reference = reference.as_ref();
            let found = if is_key(reference) {
                vec![reference.to_string()]
            } else {
                resolve_references(&listed, &[reference])?
            };
            for key in found {
                if !resolved.contains(&key) {
                    resolved.push(key);
                }
            }
        }
        Ok(resolved)
    }

    /// Every tag in use, sorted.
    pub fn all_tags(&self) -> Result<BTreeSet<String>> {
        let mut tags = BTreeSet::new();
        for paper in self.list(&PaperFilter::all(), SortKey::Added)? {
            tags.extend(paper.metadata.tags);
        }
        Ok(tags)
    }

    /// Moves a paper to a new citekey, carrying its metadata and document.
    ///
    /// Keys that differ only in case name the same files on case-insensitive
    /// filesystems, so such renames are refused.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<Paper> {
        validate_citekey(new)?;
        let paper = self.get(old)?;
        if new == old {
            return Ok(paper);
        }
        if new.eq_ignore_ascii_case(old) {
            return Err(PapersError::Api(format!(
                "'{}' and '{}' differ only in case; rename to a different key first",
                old, new
            )));
        }
        if self.key_in_use(new)? {
            return Err(PapersError::KeyCollision(new.to_string()));
        }

        let mut metadata = paper.metadata.clone();
        if let Some(doc) = &paper.metadata.document {
            metadata.document = Some(self.docs.rename(doc, new)?);
        }

        let written = self
            .write_record(new, &paper.record)
            .and_then(|_| self.write_metadata(new, &metadata));
        if let Err(e) = written {
            self.undo_write(StoreKind::Bib, new);
            self.undo_write(StoreKind::Meta, new);
            if let (Some(moved), Some(original)) = (&metadata.document, &paper.metadata.document) {
                if moved != original {
                    if let Err(e) = self.docs.rename(moved, old) {
                        warn!(citekey = %old, error = %e, "could not restore document name");
                    }
                }
            }
            return Err(e);
        }

        self.backend.delete(StoreKind::Bib, old)?;
        self.backend.delete(StoreKind::Meta, old)?;
        info!(from = %old, to = %new, "renamed paper");
        Ok(Paper::new(new, paper.record, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem_backend::MemBackend;
    use std::fs;
    use tempfile::TempDir;

    fn repo() -> Repository<MemBackend> {
        Repository::with_backend(MemBackend::new(), PapersConfig::default()).unwrap()
    }

    fn repo_with_docs() -> (TempDir, Repository<MemBackend>) {
        let tmp = TempDir::new().unwrap();
        let backend = MemBackend::new().with_doc_dir(tmp.path().join("doc"));
        let repo = Repository::with_backend(backend, PapersConfig::default()).unwrap();
        (tmp, repo)
    }

    fn page() -> BibRecord {
        BibRecord::new("techreport")
            .with_field("author", "Page, Lawrence and Brin, Sergey")
            .with_field("title", "The PageRank Citation Ranking")
            .with_field("year", "1999")
    }

    fn knuth() -> BibRecord {
        BibRecord::new("book")
            .with_field("author", "Knuth, Donald E.")
            .with_field("title", "The TeXbook")
            .with_field("year", "1984")
    }

    #[test]
    fn test_add_derives_key() {
        let mut repo = repo();
        let report = repo.add(NewPaper::new(page())).unwrap();
        assert_eq!(report.paper.citekey, "Page99");
        assert!(report.document_error.is_none());

        let second = repo.add(NewPaper::new(page())).unwrap();
        assert_eq!(second.paper.citekey, "Page99a");
    }

    #[test]
    fn test_add_with_hint_collision_leaves_store_unchanged() {
        let mut repo = repo();
        repo.add(NewPaper::new(page()).with_citekey("K")).unwrap();
        let before = repo.keys().unwrap();

        let err = repo
            .add(NewPaper::new(knuth()).with_citekey("K"))
            .unwrap_err();
        assert!(matches!(err, PapersError::KeyCollision(_)));
        assert_eq!(repo.keys().unwrap(), before);
        assert_eq!(repo.get("K").unwrap().record, page());
    }

    #[test]
    fn test_add_rejects_invalid_hint_and_tags() {
        let mut repo = repo();
        assert!(matches!(
            repo.add(NewPaper::new(page()).with_citekey("a/b")),
            Err(PapersError::InvalidCitekey { .. })
        ));
        assert!(matches!(
            repo.add(NewPaper::new(page()).with_tags(["bad tag"])),
            Err(PapersError::InvalidTag { .. })
        ));
        assert!(repo.keys().unwrap().is_empty());
    }

    #[test]
    fn test_add_write_failure_writes_nothing() {
        let mut repo = repo();
        repo.backend().set_simulate_write_error(true);
        assert!(repo.add(NewPaper::new(page())).is_err());
        repo.backend().set_simulate_write_error(false);
        assert_eq!(repo.backend().count(StoreKind::Bib), 0);
        assert_eq!(repo.backend().count(StoreKind::Meta), 0);
    }

    #[test]
    fn test_add_with_missing_document_still_adds() {
        let (tmp, mut repo) = repo_with_docs();
        let report = repo
            .add(NewPaper::new(page()).with_document(tmp.path().join("nope.pdf"), None))
            .unwrap();
        assert!(report.document_error.is_some());
        let paper = repo.get("Page99").unwrap();
        assert!(paper.metadata.document.is_none());
    }

    #[test]
    fn test_get_and_remove() {
        let mut repo = repo();
        repo.add(NewPaper::new(page())).unwrap();
        let report = repo.remove("Page99").unwrap();
        assert!(!report.removed_document);
        assert!(matches!(repo.get("Page99"), Err(PapersError::NotFound(_))));
        assert!(matches!(repo.remove("Page99"), Err(PapersError::NotFound(_))));
    }

    #[test]
    fn test_remove_deletes_managed_document() {
        let (tmp, mut repo) = repo_with_docs();
        let src = tmp.path().join("paper.pdf");
        fs::write(&src, b"pdf").unwrap();
        let report = repo
            .add(NewPaper::new(page()).with_document(&src, None))
            .unwrap();
        let doc = repo.document_path(&report.paper).unwrap();
        assert!(doc.exists());

        let removed = repo.remove("Page99").unwrap();
        assert!(removed.removed_document);
        assert!(!doc.exists());
    }

    #[test]
    fn test_remove_keeps_linked_document() {
        let (tmp, mut repo) = repo_with_docs();
        let src = tmp.path().join("mine.pdf");
        fs::write(&src, b"pdf").unwrap();
        repo.add(NewPaper::new(page()).with_document(&src, Some(ImportMode::Link)))
            .unwrap();

        let removed = repo.remove("Page99").unwrap();
        assert!(!removed.removed_document);
        assert!(src.exists());
    }

    #[test]
    fn test_update_keeps_key_and_metadata() {
        let mut repo = repo();
        repo.add(NewPaper::new(page()).with_tags(["web"])).unwrap();
        let updated = repo.update("Page99", knuth()).unwrap();
        assert_eq!(updated.citekey, "Page99");

        let paper = repo.get("Page99").unwrap();
        assert_eq!(paper.record, knuth());
        assert!(paper.has_tag("web"));
    }

    #[test]
    fn test_tags() {
        let mut repo = repo();
        repo.add(NewPaper::new(page())).unwrap();
        repo.set_tags("Page99", ["network", "search"]).unwrap();
        repo.add_tags("Page99", &["ranking"]).unwrap();
        let paper = repo.remove_tags("Page99", &["network"]).unwrap();
        let tags: Vec<_> = paper.metadata.tags.iter().cloned().collect();
        assert_eq!(tags, vec!["ranking", "search"]);
        assert_eq!(repo.get("Page99").unwrap().metadata.tags, paper.metadata.tags);
        assert!(repo.set_tags("Page99", ["a+b"]).is_err());
    }

    #[test]
    fn test_attach_document_requires_overwrite() {
        let (tmp, mut repo) = repo_with_docs();
        let a = tmp.path().join("a.pdf");
        let b = tmp.path().join("b.pdf");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();
        repo.add(NewPaper::new(page())).unwrap();

        repo.attach_document("Page99", &a, AttachOptions::default())
            .unwrap();
        let err = repo
            .attach_document("Page99", &b, AttachOptions::default())
            .unwrap_err();
        assert!(matches!(err, PapersError::AlreadyExists { .. }));

        let paper = repo
            .attach_document(
                "Page99",
                &b,
                AttachOptions {
                    overwrite: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let path = repo.document_path(&paper).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"b");
    }

    #[test]
    fn test_configured_mode_is_the_default() {
        let tmp = TempDir::new().unwrap();
        let backend = MemBackend::new().with_doc_dir(tmp.path().join("doc"));
        let config = PapersConfig {
            import_mode: ImportMode::Link,
            ..Default::default()
        };
        let mut repo = Repository::with_backend(backend, config).unwrap();
        let src = tmp.path().join("x.pdf");
        fs::write(&src, b"x").unwrap();

        let report = repo.add(NewPaper::new(page()).with_document(&src, None)).unwrap();
        assert!(report.paper.metadata.document.unwrap().external);
    }

    #[test]
    fn test_list_order_filter_and_resolve() {
        let mut repo = repo();
        repo.add(NewPaper::new(page())).unwrap();
        repo.add(NewPaper::new(knuth()).with_tags(["tex"])).unwrap();

        let all = repo.list(&PaperFilter::all(), SortKey::Added).unwrap();
        let keys: Vec<_> = all.iter().map(|p| p.citekey.as_str()).collect();
        assert_eq!(keys, vec!["Page99", "Knuth84"]);

        let tex = repo
            .list(&PaperFilter::all().with_tag("tex"), SortKey::Added)
            .unwrap();
        assert_eq!(tex.len(), 1);

        assert_eq!(repo.resolve("2").unwrap(), "Knuth84");
        assert_eq!(repo.resolve("knuth").unwrap(), "Knuth84");
        assert_eq!(repo.all_tags().unwrap().into_iter().collect::<Vec<_>>(), vec!["tex"]);
    }

    #[test]
    fn test_consistency_and_repair() {
        let backend = MemBackend::new();
        backend
            .write(StoreKind::Bib, "Orphan", "@misc{Orphan, title = {O}}\n")
            .unwrap();
        backend.write(StoreKind::Meta, "Ghost", "added: 2024-01-01T00:00:00Z\n").unwrap();

        let mut repo = Repository::with_backend(backend, PapersConfig::default()).unwrap();
        assert_eq!(repo.consistency().missing_metadata, vec!["Orphan"]);
        assert_eq!(repo.consistency().missing_record, vec!["Ghost"]);
        assert!(repo.keys().unwrap().is_empty());
        // Both keys still block new additions.
        assert!(matches!(
            repo.add(NewPaper::new(page()).with_citekey("ghost")),
            Err(PapersError::KeyCollision(_))
        ));

        let acted = repo.repair().unwrap();
        assert_eq!(acted.missing_metadata, vec!["Orphan"]);
        assert!(repo.consistency().is_clean());
        assert_eq!(repo.keys().unwrap(), vec!["Orphan"]);
    }

    #[test]
    fn test_missing_document_is_reported() {
        let (tmp, mut repo) = repo_with_docs();
        let src = tmp.path().join("a.pdf");
        fs::write(&src, b"a").unwrap();
        let report = repo.add(NewPaper::new(page()).with_document(&src, None)).unwrap();
        fs::remove_file(repo.document_path(&report.paper).unwrap()).unwrap();

        let report = repo.check().unwrap();
        assert_eq!(report.missing_documents, vec!["Page99"]);
    }

    #[test]
    fn test_rename_moves_everything() {
        let (tmp, mut repo) = repo_with_docs();
        let src = tmp.path().join("a.pdf");
        fs::write(&src, b"a").unwrap();
        repo.add(NewPaper::new(page()).with_document(&src, None).with_tags(["web"]))
            .unwrap();

        let renamed = repo.rename("Page99", "PageBrin1999").unwrap();
        assert!(matches!(repo.get("Page99"), Err(PapersError::NotFound(_))));
        let paper = repo.get("PageBrin1999").unwrap();
        assert!(paper.has_tag("web"));
        assert_eq!(paper.metadata.document, renamed.metadata.document);
        assert!(repo.document_path(&paper).unwrap().ends_with("PageBrin1999.pdf"));
        assert!(repo.document_path(&paper).unwrap().exists());
    }

    #[test]
    fn test_rename_collision() {
        let mut repo = repo();
        repo.add(NewPaper::new(page())).unwrap();
        repo.add(NewPaper::new(knuth())).unwrap();
        assert!(matches!(
            repo.rename("Page99", "Knuth84"),
            Err(PapersError::KeyCollision(_))
        ));
        assert!(repo.get("Page99").is_ok());
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let backend = MemBackend::new();
        backend.write(StoreKind::Bib, "Bad", "@misc{Bad, title = {x}\n").unwrap();
        backend.write(StoreKind::Meta, "Bad", "added: 2024-01-01T00:00:00Z\n").unwrap();
        let repo = Repository::with_backend(backend, PapersConfig::default()).unwrap();

        match repo.get("Bad") {
            Err(PapersError::Parse { origin, .. }) => assert!(origin.ends_with("bib/Bad.bib")),
            other => panic!("expected parse error, got {:?}", other.map(|p| p.citekey)),
        }
    }

    #[test]
    fn test_add_refuses_records_that_would_not_read_back() {
        let mut repo = repo();
        let stray_brace = page().with_field("title", "a } b");
        let trailing_backslash = page().with_field("title", r"ends in \");
        let mut spaced_name = page();
        spaced_name.fields.insert("my field".into(), "x".into());

        for record in [stray_brace, trailing_backslash, spaced_name] {
            match repo.add(NewPaper::new(record)) {
                Err(PapersError::Parse { origin, .. }) => assert_eq!(origin, "record Page99"),
                other => panic!("expected parse error, got {:?}", other.map(|r| r.paper.citekey)),
            }
        }
        assert_eq!(repo.backend().count(StoreKind::Bib), 0);
        assert_eq!(repo.backend().count(StoreKind::Meta), 0);
    }

    #[test]
    fn test_update_refuses_bad_record_and_keeps_the_old_one() {
        let mut repo = repo();
        repo.add(NewPaper::new(page())).unwrap();
        let err = repo
            .update("Page99", knuth().with_field("title", "{unclosed"))
            .unwrap_err();
        assert!(matches!(err, PapersError::Parse { .. }));
        assert_eq!(repo.get("Page99").unwrap().record, page());
    }

    #[test]
    fn test_stored_record_reads_back_as_added() {
        let mut repo = repo();
        let mut record = page();
        record.fields.insert("note".into(), "two  spaces\nnewline ".into());
        let report = repo.add(NewPaper::new(record)).unwrap();
        assert_eq!(report.paper.record.get("note"), Some("two spaces newline"));
        assert_eq!(repo.get("Page99").unwrap().record, report.paper.record);

        let mut edited = knuth();
        edited.fields.insert("title".into(), " The\tTeXbook ".into());
        let updated = repo.update("Page99", edited).unwrap();
        assert_eq!(repo.get("Page99").unwrap().record, updated.record);
    }

    #[test]
    fn test_unparsable_paper_does_not_block_the_others() {
        let mut repo = repo();
        repo.add(NewPaper::new(page())).unwrap();
        repo.add(NewPaper::new(knuth())).unwrap();
        repo.backend()
            .write(StoreKind::Bib, "Page99", "@techreport{Page99, title = {x}\n")
            .unwrap();

        let report = repo.check().unwrap();
        assert_eq!(report.unreadable, vec!["Page99"]);
        assert!(!report.is_clean());

        let listed = repo.list(&PaperFilter::all(), SortKey::Added).unwrap();
        let keys: Vec<_> = listed.iter().map(|p| p.citekey.as_str()).collect();
        assert_eq!(keys, vec!["Knuth84"]);
        assert_eq!(repo.resolve("1").unwrap(), "Knuth84");
        assert_eq!(repo.resolve("Page99").unwrap(), "Page99");
        assert_eq!(
            repo.resolve_many(&["Page99", "knuth", "Page99"]).unwrap(),
            vec!["Page99", "Knuth84"]
        );

        repo.remove("Page99").unwrap();
        assert_eq!(repo.keys().unwrap(), vec!["Knuth84"]);
        assert!(repo.check().unwrap().is_clean());
    }

    #[test]
    fn test_rename_case_only_is_refused() {
        let mut repo = repo();
        repo.add(NewPaper::new(page())).unwrap();

        match repo.rename("Page99", "page99") {
            Err(PapersError::Api(message)) => assert!(message.contains("differ only in case")),
            other => panic!("expected api error, got {:?}", other.map(|p| p.citekey)),
        }
        assert!(repo.get("Page99").is_ok());

        let same = repo.rename("Page99", "Page99").unwrap();
        assert_eq!(same.citekey, "Page99");
        assert_eq!(repo.keys().unwrap(), vec!["Page99"]);
    }

    #[test]
    fn test_uninitialized_backend() {
        assert!(matches!(
            Repository::with_backend(MemBackend::uninitialized(), PapersConfig::default()),
            Err(PapersError::NotInitialized(_))
        ));
    }
}
