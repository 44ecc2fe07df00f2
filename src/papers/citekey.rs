//! Citekey validation and derivation.
//!
//! A derived key is the last name of the first author (or editor, or a title
//! word) followed by the last two digits of the year: `Page, Lawrence` and
//! `1999` give `Page99`. Collisions get a suffix: `Page99a`, ..., `Page99z`,
//! `Page99aa`, `Page99ab`, ...

use crate::error::{PapersError, Result};
use crate::model::BibRecord;
use std::collections::HashSet;

/// Checks that `key` can be used as a citekey and as a file name stem.
///
/// ```
/// use papers::citekey::validate_citekey;
///
/// assert!(validate_citekey("Page99").is_ok());
/// assert!(validate_citekey("knuth_1984-b.v2").is_ok());
/// assert!(validate_citekey("").is_err());
/// assert!(validate_citekey(".hidden").is_err());
/// assert!(validate_citekey("a/b").is_err());
/// ```
pub fn validate_citekey(key: &str) -> Result<()> {
    let invalid = |reason: &str| PapersError::InvalidCitekey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let Some(first) = key.chars().next() else {
        return Err(invalid("citekey cannot be empty"));
    };
    if first == '.' || first == '-' {
        return Err(invalid("citekey cannot start with '.' or '-'"));
    }
    if let Some(bad) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(invalid(&format!("invalid character '{}'", bad)));
    }
    Ok(())
}

/// Derives an unused citekey for `record`.
///
/// `existing_keys` is compared case-insensitively, so `page99` blocks `Page99`
/// (on case-insensitive filesystems both would map to the same files).
pub fn derive_key<I, S>(record: &BibRecord, existing_keys: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let base = base_key(record)?;
    let taken: HashSet<String> = existing_keys
        .into_iter()
        .map(|k| k.as_ref().to_lowercase())
        .collect();

    let mut n = 0usize;
    loop {
        let candidate = format!("{}{}", base, suffix(n));
        if !taken.contains(&candidate.to_lowercase()) {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// The key before disambiguation.
pub fn base_key(record: &BibRecord) -> Result<String> {
    let name = name_part(record).ok_or_else(|| {
        PapersError::parse(
            "record",
            None,
            "cannot derive a citekey: no author, editor or title",
        )
    })?;
    Ok(format!("{}{}", name, year_part(record)))
}

fn name_part(record: &BibRecord) -> Option<String> {
    let from_people = record
        .authors()
        .into_iter()
        .next()
        .or_else(|| record.editors().into_iter().next())
        .map(|name| clean(last_name(&name)))
        .filter(|n| !n.is_empty());
    if from_people.is_some() {
        return from_people;
    }

    record.title().and_then(|title| {
        title
            .split_whitespace()
            .map(clean)
            .find(|w| w.chars().filter(|c| c.is_ascii_alphabetic()).count() >= 3)
    })
}

/// `Page, Lawrence` and `Lawrence Page` both give `Page`.
fn last_name(name: &str) -> &str {
    match name.split_once(',') {
        Some((last, _)) => last.trim(),
        None => name.split_whitespace().last().unwrap_or(""),
    }
}

fn year_part(record: &BibRecord) -> String {
    let Some(year) = record.year() else {
        return String::new();
    };
    let bytes = year.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                return year[start + 2..i].to_string();
            }
        } else {
            i += 1;
        }
    }
    String::new()
}

/// Strips TeX markup and anything that is not an ASCII letter or digit.
fn clean(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            // Drop the command name, keep its argument.
            while chars.peek().is_some_and(|n| n.is_ascii_alphabetic()) {
                chars.next();
            }
            continue;
        }
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if let Some(folded) = fold_latin(c) {
            out.push_str(folded);
        }
    }
    out
}

fn fold_latin(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'ç' => "c",
        'Ç' => "C",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'È' | 'É' | 'Ê' | 'Ë' => "E",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' => "I",
        'ñ' => "n",
        'Ñ' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "O",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}

/// `0 -> ""`, `1 -> "a"`, `26 -> "z"`, `27 -> "aa"`.
fn suffix(mut n: usize) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect()
}
