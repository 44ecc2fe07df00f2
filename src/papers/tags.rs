//! Tag names and tag operation strings.
//!
//! Valid tags:
//! - ASCII alphanumerics, underscores (`_`) and hyphens (`-`)
//! - Must start with a letter or a digit
//!
//! `+` and `-` are reserved as operators in tag operation strings such as
//! `network+search-old` (add `network` and `search`, remove `old`). Hyphenated
//! tags can still be set through `Repository::set_tags`.

use crate::error::{PapersError, Result};

/// Validates a single tag name.
///
/// ```
/// use papers::tags::validate_tag_name;
///
/// assert!(validate_tag_name("network").is_ok());
/// assert!(validate_tag_name("deep_learning").is_ok());
/// assert!(validate_tag_name("2024").is_ok());
///
/// assert!(validate_tag_name("").is_err());
/// assert!(validate_tag_name("-foo").is_err());
/// assert!(validate_tag_name("a b").is_err());
/// ```
pub fn validate_tag_name(name: &str) -> std::result::Result<(), TagValidationError> {
    let Some(first_char) = name.chars().next() else {
        return Err(TagValidationError::Empty);
    };
    if !first_char.is_ascii_alphanumeric() {
        return Err(TagValidationError::InvalidStart(first_char));
    }
    for ch in name.chars() {
        if !is_valid_tag_char(ch) {
            return Err(TagValidationError::InvalidCharacter(ch));
        }
    }
    Ok(())
}

fn is_valid_tag_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// Validates a tag, wrapping the failure into the crate error.
pub fn check_tag(name: &str) -> Result<()> {
    validate_tag_name(name).map_err(|reason| PapersError::InvalidTag {
        tag: name.to_string(),
        reason,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValidationError {
    Empty,
    InvalidStart(char),
    InvalidCharacter(char),
}

impl std::fmt::Display for TagValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagValidationError::Empty => write!(f, "tag name cannot be empty"),
            TagValidationError::InvalidStart(ch) => {
                write!(f, "tag name must start with a letter or digit, found '{}'", ch)
            }
            TagValidationError::InvalidCharacter(ch) => write!(
                f,
                "tag name contains invalid character '{}' (only alphanumeric, underscore, and hyphen allowed)",
                ch
            ),
        }
    }
}

impl std::error::Error for TagValidationError {}

/// Tags to add and remove, parsed from an operation string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOps {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl TagOps {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Parses `a+b-c` into adds `[a, b]` and removes `[c]`.
///
/// A leading `-` makes the first tag a removal; a leading `+` is optional.
/// Several operation strings can be combined by calling this once per string
/// and merging.
pub fn parse_tag_ops(input: &str) -> Result<TagOps> {
    let mut ops = TagOps::default();
    let mut adding = true;
    let mut current = String::new();

    let flush = |current: &mut String, adding: bool, ops: &mut TagOps| -> Result<()> {
        if current.is_empty() {
            return Ok(());
        }
        check_tag(current)?;
        let tag = std::mem::take(current);
        if adding {
            ops.add.push(tag);
        } else {
            ops.remove.push(tag);
        }
        Ok(())
    };

    for ch in input.trim().chars() {
        match ch {
            '+' => {
                flush(&mut current, adding, &mut ops)?;
                adding = true;
            }
            '-' if current.is_empty() => {
                adding = false;
            }
            '-' => {
                flush(&mut current, adding, &mut ops)?;
                adding = false;
            }
            _ => current.push(ch),
        }
    }
    flush(&mut current, adding, &mut ops)?;

    if ops.is_empty() {
        return Err(PapersError::Api(format!("No tags in '{}'", input)));
    }
    Ok(ops)
}
