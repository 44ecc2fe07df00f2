//! Listing filters and sort orders.
//!
//! A query is a list of terms, all of which must match:
//!
//! - `author:knuth`, `title:language`: substring of the field
//! - `tag:network`, `year:1999`, `type:article`: exact match
//! - `key:page`: substring of the citekey
//! - any other `field:value`: substring of that record field
//! - a bare term matches the citekey, the title or the authors
//!
//! Case handling follows [`CaseMode`]. With the default `Smart` mode a term is
//! case-insensitive unless it contains an uppercase letter.

use crate::model::Paper;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    #[default]
    Smart,
    Ignore,
    Sensitive,
}

impl CaseMode {
    fn sensitive_for(&self, value: &str) -> bool {
        match self {
            CaseMode::Smart => value.chars().any(char::is_uppercase),
            CaseMode::Ignore => false,
            CaseMode::Sensitive => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Exact,
    Contains,
}

/// Which part of a paper a term looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryField {
    Any,
    Citekey,
    Tag,
    Author,
    Title,
    Year,
    Type,
    Field(String),
}

impl QueryField {
    fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "key" | "citekey" => QueryField::Citekey,
            "tag" | "tags" => QueryField::Tag,
            "author" | "authors" => QueryField::Author,
            "title" => QueryField::Title,
            "year" => QueryField::Year,
            "type" => QueryField::Type,
            other => QueryField::Field(other.to_string()),
        }
    }

    pub fn op(&self) -> FilterOp {
        match self {
            QueryField::Tag | QueryField::Year | QueryField::Type => FilterOp::Exact,
            _ => FilterOp::Contains,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub field: QueryField,
    pub value: String,
}

impl QueryTerm {
    /// Parses `field:value` or a bare value.
    pub fn parse(term: &str) -> Self {
        match term.split_once(':') {
            Some((field, value)) if !field.is_empty() => QueryTerm {
                field: QueryField::from_name(field),
                value: value.to_string(),
            },
            _ => QueryTerm {
                field: QueryField::Any,
                value: term.to_string(),
            },
        }
    }

    pub fn matches(&self, paper: &Paper, case: CaseMode) -> bool {
        let sensitive = case.sensitive_for(&self.value);
        let test = |candidate: &str| compare(candidate, &self.value, self.field.op(), sensitive);

        match &self.field {
            QueryField::Any => {
                test(&paper.citekey)
                    || paper.record.title().is_some_and(test)
                    || paper.record.get("author").is_some_and(test)
            }
            QueryField::Citekey => test(&paper.citekey),
            QueryField::Tag => paper.metadata.tags.iter().any(|t| test(t)),
            QueryField::Author => paper.record.authors().iter().any(|a| test(a)),
            QueryField::Title => paper.record.title().is_some_and(test),
            QueryField::Year => paper.record.year().is_some_and(|y| test(y.trim())),
            QueryField::Type => test(&paper.record.entry_type),
            QueryField::Field(name) => paper.record.get(name).is_some_and(test),
        }
    }
}

fn compare(candidate: &str, value: &str, op: FilterOp, sensitive: bool) -> bool {
    if sensitive {
        match op {
            FilterOp::Exact => candidate == value,
            FilterOp::Contains => candidate.contains(value),
        }
    } else {
        let candidate = candidate.to_lowercase();
        let value = value.to_lowercase();
        match op {
            FilterOp::Exact => candidate == value,
            FilterOp::Contains => candidate.contains(&value),
        }
    }
}

/// A conjunction of query terms.
#[derive(Debug, Clone, Default)]
pub struct PaperFilter {
    pub terms: Vec<QueryTerm>,
    pub case: CaseMode,
}

impl PaperFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn parse<S: AsRef<str>>(query: &[S], case: CaseMode) -> Self {
        Self {
            terms: query
                .iter()
                .map(|t| t.as_ref().trim())
                .filter(|t| !t.is_empty())
                .map(QueryTerm::parse)
                .collect(),
            case,
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.terms.push(QueryTerm {
            field: QueryField::Tag,
            value: tag.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, paper: &Paper) -> bool {
        self.terms.iter().all(|t| t.matches(paper, self.case))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Time of `add`, oldest first. This is the order display indexes use.
    #[default]
    Added,
    Citekey,
    Year,
    Title,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "added" => Ok(SortKey::Added),
            "key" | "citekey" => Ok(SortKey::Citekey),
            "year" => Ok(SortKey::Year),
            "title" => Ok(SortKey::Title),
            other => Err(format!("Unknown sort key: {}", other)),
        }
    }
}

/// Sorts in place; every key falls back to the citekey so the order is total.
pub fn sort_papers(papers: &mut [Paper], key: SortKey) {
    let by_key = |a: &Paper, b: &Paper| a.citekey.cmp(&b.citekey);
    papers.sort_by(|a, b| {
        let primary = match key {
            SortKey::Added => a.metadata.added.cmp(&b.metadata.added),
            SortKey::Citekey => a.citekey.to_lowercase().cmp(&b.citekey.to_lowercase()),
            SortKey::Year => a.record.year().unwrap_or("").cmp(b.record.year().unwrap_or("")),
            SortKey::Title => a
                .record
                .title()
                .unwrap_or("")
                .to_lowercase()
                .cmp(&b.record.title().unwrap_or("").to_lowercase()),
        };
        match primary {
            Ordering::Equal => by_key(a, b),
            other => other,
        }
    });
}
