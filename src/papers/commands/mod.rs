//! # Command Layer
//!
//! One submodule per user-facing command. Each `run` function takes an
//! already-open [`Repository`](crate::repo::Repository) and citekeys that
//! were resolved by the [API facade](crate::api), does its work, and returns
//! a [`CmdResult`].
//!
//! Commands never print, prompt or exit. Failures come back as
//! [`PapersError`](crate::error::PapersError); partial problems that do not
//! abort the command (a document that could not be copied, say) come back as
//! warning messages.
//!
//! Tests here run against [`MemBackend`](crate::store::mem_backend::MemBackend).

use crate::index::ListedPaper;
use crate::model::Paper;
use serde::Serialize;
use std::path::PathBuf;

pub mod add;
pub mod attach;
pub mod doctor;
pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod paths;
pub mod remove;
pub mod rename;
pub mod tag;
pub mod update;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    /// Papers created or modified.
    pub affected: Vec<Paper>,
    /// Papers to display, with their canonical index.
    pub listed: Vec<ListedPaper>,
    /// Filesystem paths (the `path` command).
    pub paths: Vec<PathBuf>,
    /// Tag names (the `tag` command without a paper).
    pub tags: Vec<String>,
    pub messages: Vec<CmdMessage>,
    /// Raw text for stdout, e.g. exported BibTeX.
    pub output: Option<String>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_listed(mut self, papers: Vec<ListedPaper>) -> Self {
        self.listed = papers;
        self
    }

    pub fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.paths = paths;
        self
    }

    pub fn has_warnings(&self) -> bool {
        self.messages
            .iter()
            .any(|m| matches!(m.level, MessageLevel::Warning | MessageLevel::Error))
    }
}
