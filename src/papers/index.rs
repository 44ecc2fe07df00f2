//! # Paper References: Citekey vs Display Index
//!
//! Commands take paper references as text. A reference can be:
//!
//! 1. **An exact citekey**: `Page99`. Always wins.
//! 2. **A display index**: `2`, the 1-based position in the listing order.
//! 3. **A fragment**: `page`, any case-insensitive substring of a citekey.
//!    It must match exactly one paper.
//!
//! ## Canonical Ordering
//!
//! Display indexes come from [`index_papers`], applied to papers in the
//! repository's default listing order (oldest addition first, citekey as
//! tie-break). The same paper keeps its number no matter what filter the
//! user looked at, so `papers remove 2` targets what `papers list` showed
//! as `2`.
//!
//! Multi-reference commands also accept ranges (`1-3`) through
//! [`resolve_references`].

use crate::error::{PapersError, Result};
use crate::model::Paper;

/// A paper with its display index.
#[derive(Debug, Clone)]
pub struct ListedPaper {
    pub index: usize,
    pub paper: Paper,
}

/// What a reference string can mean before it is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperSelector {
    Index(usize),
    Range(usize, usize),
    Text(String),
}

impl std::fmt::Display for PaperSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaperSelector::Index(i) => write!(f, "{}", i),
            PaperSelector::Range(a, b) => write!(f, "{}-{}", a, b),
            PaperSelector::Text(t) => write!(f, "\"{}\"", t),
        }
    }
}

/// Numbers papers 1..N in the order given.
///
/// Callers pass the default listing order. Never enumerate papers by hand
/// for display, the numbers would stop matching what `resolve` accepts.
pub fn index_papers(papers: Vec<Paper>) -> Vec<ListedPaper> {
    papers
        .into_iter()
        .enumerate()
        .map(|(i, paper)| ListedPaper {
            index: i + 1,
            paper,
        })
        .collect()
}

/// Parses `"3"` or `"1-3"`. Anything else is a text selector.
pub fn parse_index_or_range(s: &str) -> PaperSelector {
    if let Some((start, end)) = s.split_once('-') {
        if let (Ok(a), Ok(b)) = (start.parse::<usize>(), end.parse::<usize>()) {
            return PaperSelector::Range(a, b);
        }
    }
    match s.parse::<usize>() {
        Ok(n) => PaperSelector::Index(n),
        Err(_) => PaperSelector::Text(s.to_string()),
    }
}

/// Resolves one reference to a citekey.
pub fn resolve_reference(listed: &[ListedPaper], reference: &str) -> Result<String> {
    if reference.trim().is_empty() {
        return Err(PapersError::NotFound(reference.to_string()));
    }
    if let Some(lp) = listed.iter().find(|lp| lp.paper.citekey == reference) {
        return Ok(lp.paper.citekey.clone());
    }

    if let Ok(n) = reference.parse::<usize>() {
        if let Some(lp) = listed.iter().find(|lp| lp.index == n) {
            return Ok(lp.paper.citekey.clone());
        }
    }

    let needle = reference.to_lowercase();
    let mut candidates: Vec<String> = listed
        .iter()
        .filter(|lp| lp.paper.citekey.to_lowercase().contains(&needle))
        .map(|lp| lp.paper.citekey.clone())
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(PapersError::NotFound(reference.to_string())),
        1 => Ok(candidates.remove(0)),
        _ => Err(PapersError::AmbiguousReference {
            reference: reference.to_string(),
            candidates,
        }),
    }
}

/// Resolves several references, expanding `N-M` ranges.
///
/// An exact citekey such as `1-2` is never read as a range. The result keeps
/// the first occurrence of each citekey.
pub fn resolve_references<S: AsRef<str>>(listed: &[ListedPaper], refs: &[S]) -> Result<Vec<String>> {
    let mut keys: Vec<String> = Vec::new();
    let mut push = |key: String| {
        if !keys.contains(&key) {
            keys.push(key);
        }
    };

    for reference in refs {
        let reference = reference.as_ref();
        if listed.iter().any(|lp| lp.paper.citekey == reference) {
            push(reference.to_string());
            continue;
        }
        match parse_index_or_range(reference) {
            PaperSelector::Range(start, end) => {
                if start == 0 || start > end {
                    return Err(PapersError::Api(format!("Invalid range: {}", reference)));
                }
                for n in start..=end {
                    let lp = listed
                        .iter()
                        .find(|lp| lp.index == n)
                        .ok_or_else(|| PapersError::NotFound(n.to_string()))?;
                    push(lp.paper.citekey.clone());
                }
            }
            PaperSelector::Index(_) | PaperSelector::Text(_) => {
                push(resolve_reference(listed, reference)?);
            }
        }
    }
    Ok(keys)
}
