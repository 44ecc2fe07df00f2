use crate::docs::DocumentRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A bibliographic record: an entry type plus its fields.
///
/// Field names are kept lowercase so lookups do not depend on how the
/// source file spelled them. Values set through [`BibRecord::set`] have their
/// whitespace runs collapsed to a single space, the same form the BibTeX
/// decoder produces, so a stored record reads back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BibRecord {
    pub entry_type: String,
    pub fields: BTreeMap<String, String>,
}

impl BibRecord {
    pub fn new(entry_type: impl Into<String>) -> Self {
        Self {
            entry_type: entry_type.into().to_lowercase(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields
            .insert(name.to_lowercase(), normalize_value(&value.into()));
    }

    /// Lowercases the type and field names and collapses whitespace in every
    /// value. Needed only for records whose `fields` were filled directly.
    pub fn normalize(&mut self) {
        self.entry_type = self.entry_type.to_lowercase();
        let fields = std::mem::take(&mut self.fields);
        for (name, value) in fields {
            self.set(&name, value);
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    pub fn year(&self) -> Option<&str> {
        self.get("year")
    }

    /// Individual names from the `author` field (split on `and`).
    pub fn authors(&self) -> Vec<String> {
        self.get("author").map(split_names).unwrap_or_default()
    }

    pub fn editors(&self) -> Vec<String> {
        self.get("editor").map(split_names).unwrap_or_default()
    }
}

/// Collapses whitespace runs, newlines included, to one space and trims the
/// ends.
pub fn normalize_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a BibTeX name list (`A and B and C`) into names.
pub fn split_names(list: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in list.split_whitespace() {
        if word.eq_ignore_ascii_case("and") {
            if !current.is_empty() {
                names.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(word);
        }
    }
    if !current.is_empty() {
        names.push(current.join(" "));
    }
    names
}

/// A record together with the key it was written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub record: BibRecord,
}

impl Entry {
    pub fn new(key: impl Into<String>, record: BibRecord) -> Self {
        Self {
            key: key.into(),
            record,
        }
    }
}

/// Everything about a paper that is not bibliographic: tags, the attached
/// document and any extra keys a user put into the metadata file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub added: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRef>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self {
            added: Utc::now(),
            tags: BTreeSet::new(),
            document: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paper {
    pub citekey: String,
    pub record: BibRecord,
    pub metadata: Metadata,
}

impl Paper {
    pub fn new(citekey: impl Into<String>, record: BibRecord, metadata: Metadata) -> Self {
        Self {
            citekey: citekey.into(),
            record,
            metadata,
        }
    }

    pub fn entry(&self) -> Entry {
        Entry::new(self.citekey.clone(), self.record.clone())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata.tags.contains(tag)
    }

    /// One-line description: `[Page99] Page, Lawrence et al. "Title." (1999)`.
    pub fn summary(&self) -> String {
        let authors = self.record.authors();
        let author = match authors.as_slice() {
            [] => String::new(),
            [one] => format!("{} ", one),
            [first, ..] => format!("{} et al. ", first),
        };
        let title = self
            .record
            .title()
            .map(|t| format!("\"{}.\" ", t.trim_end_matches('.')))
            .unwrap_or_default();
        let year = self
            .record
            .year()
            .map(|y| format!("({})", y))
            .unwrap_or_default();
        format!("[{}] {}{}{}", self.citekey, author, title, year)
            .trim_end()
            .to_string()
    }
}
