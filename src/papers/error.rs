use crate::tags::TagValidationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PapersError {
    #[error("Parse error in {origin}{}: {message}", .line.map(|l| format!(" (line {})", l)).unwrap_or_default())]
    Parse {
        origin: String,
        line: Option<usize>,
        message: String,
    },

    #[error("Citekey already in use: {0}")]
    KeyCollision(String),

    #[error("Paper not found: {0}")]
    NotFound(String),

    #[error("Reference '{reference}' is ambiguous, it matches: {}", .candidates.join(", "))]
    AmbiguousReference {
        reference: String,
        candidates: Vec<String>,
    },

    #[error("{citekey} already has a document at {}", .path.display())]
    AlreadyExists { citekey: String, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error on {}: {source}", .path.display())]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid citekey '{key}': {reason}")]
    InvalidCitekey { key: String, reason: String },

    #[error("Invalid tag '{tag}': {reason}")]
    InvalidTag {
        tag: String,
        reason: TagValidationError,
    },

    #[error("No repository found at {} (run `papers init`)", .0.display())]
    NotInitialized(PathBuf),

    #[error("A repository already exists at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Api Error: {0}")]
    Api(String),
}

impl PapersError {
    pub fn parse(origin: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        PapersError::Parse {
            origin: origin.into(),
            line,
            message: message.into(),
        }
    }

    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PapersError::IoPath {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PapersError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_mentions_line_when_known() {
        let err = PapersError::parse("bib/Page99.bib", Some(4), "unclosed brace");
        assert_eq!(
            err.to_string(),
            "Parse error in bib/Page99.bib (line 4): unclosed brace"
        );

        let err = PapersError::parse("<stdin>", None, "empty input");
        assert_eq!(err.to_string(), "Parse error in <stdin>: empty input");
    }

    #[test]
    fn ambiguous_reference_lists_candidates() {
        let err = PapersError::AmbiguousReference {
            reference: "page".into(),
            candidates: vec!["Page99".into(), "Page99a".into()],
        };
        assert!(err.to_string().contains("Page99, Page99a"));
    }
}
