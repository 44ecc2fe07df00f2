//! # Record Codec
//!
//! Pure, stateless conversion between text and [`Entry`]/[`Metadata`] values.
//!
//! Two bibliographic formats are supported:
//! - [`Format::Bibtex`]: the classic `@article{key, field = {value}}` syntax
//! - [`Format::Yaml`]: a mapping of citekey to a mapping of fields
//!
//! Metadata files are always YAML.
//!
//! Decoding never drops a field silently: malformed syntax, duplicate field
//! names inside one entry and duplicate entry keys inside one input all fail
//! with [`PapersError::Parse`](crate::error::PapersError::Parse). Encoding
//! assumes records that passed [`check_record`]; the repository runs it
//! before every write.

use crate::error::{PapersError, Result};
use crate::model::{BibRecord, Entry, Metadata};
use std::path::Path;

pub mod bibtex;
pub mod yaml;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Bibtex,
    Yaml,
}

impl Format {
    /// Picks a format from a file extension, `None` when unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "bib" | "bibtex" => Some(Format::Bibtex),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Bibtex => "bib",
            Format::Yaml => "yaml",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bib" | "bibtex" => Ok(Format::Bibtex),
            "yaml" | "yml" => Ok(Format::Yaml),
            other => Err(format!("Unknown format: {}", other)),
        }
    }
}

/// Decodes every entry in `text`. `origin` names the source in errors.
pub fn decode_entries(text: &str, format: Format, origin: &str) -> Result<Vec<Entry>> {
    match format {
        Format::Bibtex => bibtex::decode(text, origin),
        Format::Yaml => yaml::decode_entries(text, origin),
    }
}

/// Decodes exactly one entry.
pub fn decode_entry(text: &str, format: Format, origin: &str) -> Result<Entry> {
    let mut entries = decode_entries(text, format, origin)?;
    match entries.len() {
        1 => Ok(entries.remove(0)),
        0 => Err(PapersError::parse(origin, None, "no entry found")),
        n => Err(PapersError::parse(
            origin,
            None,
            format!("expected a single entry, found {}", n),
        )),
    }
}

pub fn encode_entry(entry: &Entry, format: Format) -> Result<String> {
    encode_entries(std::slice::from_ref(entry), format)
}

pub fn encode_entries(entries: &[Entry], format: Format) -> Result<String> {
    match format {
        Format::Bibtex => Ok(bibtex::encode(entries)),
        Format::Yaml => yaml::encode_entries(entries),
    }
}

/// Checks that `record` can be stored and read back. See
/// [`bibtex::check_record`].
pub fn check_record(record: &BibRecord, origin: &str) -> Result<()> {
    bibtex::check_record(record, origin)
}

pub fn decode_metadata(text: &str, origin: &str) -> Result<Metadata> {
    yaml::decode_metadata(text, origin)
}

pub fn encode_metadata(meta: &Metadata) -> Result<String> {
    yaml::encode_metadata(meta)
}
