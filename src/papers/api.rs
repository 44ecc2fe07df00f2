//! # API Facade
//!
//! The single entry point for every `papers` operation, whatever the UI.
//!
//! The facade:
//! - turns user references (`Page99`, `2`, `page`, `1-3`) into citekeys
//! - dispatches to the matching `commands::*::run`
//! - returns `Result<CmdResult>`
//!
//! It does no business logic and never prints. Reading the text of an `add`
//! or `update` from a file or stdin is the caller's job, so the facade can be
//! driven from tests with plain strings.
//!
//! `PapersApi<B: StorageBackend>` is generic over the backend: `FsBackend` in
//! production, `MemBackend` in tests.

use crate::codec::Format;
use crate::commands::{self, add::AddOptions, CmdResult};
use crate::config::PapersConfig;
use crate::error::{PapersError, Result};
use crate::filter::{CaseMode, SortKey};
use crate::repo::{AttachOptions, Repository};
use crate::store::fs_backend::FsBackend;
use crate::store::StorageBackend;
use std::path::{Path, PathBuf};

pub struct PapersApi<B: StorageBackend> {
    repo: Repository<B>,
}

impl PapersApi<FsBackend> {
    /// Creates a repository at `dir`. There is no repository to wrap yet, so
    /// this does not return an api.
    pub fn init(dir: &Path, config: PapersConfig) -> Result<CmdResult> {
        commands::init::run(dir, config)
    }

    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self::new(Repository::open(dir)?))
    }
}

impl<B: StorageBackend> PapersApi<B> {
    pub fn new(repo: Repository<B>) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &Repository<B> {
        &self.repo
    }

    pub fn add(
        &mut self,
        text: &str,
        format: Format,
        origin: &str,
        options: AddOptions,
    ) -> Result<CmdResult> {
        commands::add::run(&mut self.repo, text, format, origin, options)
    }

    pub fn list<S: AsRef<str>>(
        &self,
        query: &[S],
        case: CaseMode,
        sort: SortKey,
    ) -> Result<CmdResult> {
        commands::list::run(&self.repo, query, case, sort)
    }

    pub fn remove<S: AsRef<str>>(&mut self, references: &[S]) -> Result<CmdResult> {
        let keys = self.repo.resolve_many(references)?;
        commands::remove::run(&mut self.repo, &keys)
    }

    pub fn attach(
        &mut self,
        reference: &str,
        document: &Path,
        options: AttachOptions,
    ) -> Result<CmdResult> {
        let key = self.repo.resolve(reference)?;
        commands::attach::run(&mut self.repo, &key, document, options)
    }

    /// `tag` with zero, one or two arguments:
    ///
    /// - `[]`: every tag in use
    /// - `[reference]`: the tags of that paper
    /// - `[query]`: when nothing matches as a reference, papers with those tags
    /// - `[reference, ops]`: apply `+tag`/`-tag` operations
    pub fn tag<S: AsRef<str>>(&mut self, args: &[S]) -> Result<CmdResult> {
        match args {
            [] => commands::tag::list_all(&self.repo),
            [arg] => {
                let arg = arg.as_ref();
                match self.repo.resolve(arg) {
                    Ok(key) => commands::tag::show(&self.repo, &key),
                    Err(PapersError::NotFound(_)) => commands::tag::find(&self.repo, arg),
                    Err(e) => Err(e),
                }
            }
            [reference, ops] => {
                let key = self.repo.resolve(reference.as_ref())?;
                commands::tag::apply(&mut self.repo, &key, ops.as_ref())
            }
            _ => Err(PapersError::Api(
                "tag takes at most a paper and a tag operation".into(),
            )),
        }
    }

    pub fn update(
        &mut self,
        reference: &str,
        text: &str,
        format: Format,
        origin: &str,
    ) -> Result<CmdResult> {
        let key = self.repo.resolve(reference)?;
        commands::update::run(&mut self.repo, &key, text, format, origin)
    }

    pub fn rename(&mut self, reference: &str, new_key: &str) -> Result<CmdResult> {
        let key = self.repo.resolve(reference)?;
        commands::rename::run(&mut self.repo, &key, new_key)
    }

    /// Exports the given papers, or all of them when `references` is empty.
    pub fn export<S: AsRef<str>>(&self, references: &[S], format: Format) -> Result<CmdResult> {
        let keys = self.repo.resolve_many(references)?;
        commands::export::run(&self.repo, &keys, format)
    }

    pub fn import(&mut self, paths: &[PathBuf]) -> Result<CmdResult> {
        commands::import::run(&mut self.repo, paths)
    }

    pub fn doctor(&mut self, repair: bool) -> Result<CmdResult> {
        commands::doctor::run(&mut self.repo, repair)
    }

    pub fn paths<S: AsRef<str>>(&self, references: &[S]) -> Result<CmdResult> {
        let keys = self.repo.resolve_many(references)?;
        commands::paths::run(&self.repo, &keys)
    }
}
