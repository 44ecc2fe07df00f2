//! BibTeX decoding and encoding.
//!
//! Handled syntax:
//! - entries delimited by `{...}` or `(...)`
//! - braced, quoted, numeric and macro field values, concatenated with `#`
//! - `@string` macro definitions (month abbreviations are predefined)
//! - `@comment` and `@preamble` blocks, which are skipped
//! - `%` line comments and free text between blocks
//!
//! Whitespace runs inside values are collapsed to a single space, as BibTeX
//! itself does. Values are written back inside braces, so [`check_record`]
//! refuses anything the decoder could not read back: unbalanced braces, a
//! trailing backslash, field names outside `[A-Za-z0-9_:.+-]`.

use crate::error::{PapersError, Result};
use crate::model::{normalize_value, BibRecord, Entry};
use nom::{
    bytes::complete::take_while1,
    character::complete::{char, digit1, multispace0, one_of},
    error::{ErrorKind, ParseError},
    IResult,
};
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
struct SyntaxError<'a> {
    input: &'a str,
    message: String,
}

impl<'a> SyntaxError<'a> {
    fn new(input: &'a str, message: impl Into<String>) -> Self {
        Self {
            input,
            message: message.into(),
        }
    }
}

impl<'a> ParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self::new(input, format!("unexpected input ({})", kind.description()))
    }

    fn append(_: &'a str, _: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, T> = IResult<&'a str, T, SyntaxError<'a>>;

fn fail<'a, T>(input: &'a str, message: impl Into<String>) -> PResult<'a, T> {
    Err(nom::Err::Failure(SyntaxError::new(input, message)))
}

/// Replaces a recoverable error with a hard failure carrying `message`.
fn expected<'a, T>(result: PResult<'a, T>, at: &'a str, message: &str) -> PResult<'a, T> {
    result.map_err(|_| nom::Err::Failure(SyntaxError::new(at, message)))
}

enum Block {
    Entry(Entry),
    Macro(String, String),
    Skipped,
}

pub fn decode(text: &str, origin: &str) -> Result<Vec<Entry>> {
    let mut macros = month_macros();
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    let mut rest = text;

    while let Some(start) = next_block(rest) {
        rest = &rest[start..];
        let (tail, block) = match parse_block(rest, &macros) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(PapersError::parse(
                    origin,
                    Some(line_at(text, e.input)),
                    e.message,
                ));
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(PapersError::parse(
                    origin,
                    Some(line_at(text, rest)),
                    "unexpected end of input",
                ));
            }
        };
        match block {
            Block::Entry(entry) => {
                if !seen.insert(entry.key.to_lowercase()) {
                    return Err(PapersError::parse(
                        origin,
                        Some(line_at(text, rest)),
                        format!("duplicate entry key '{}'", entry.key),
                    ));
                }
                entries.push(entry);
            }
            Block::Macro(name, value) => {
                macros.insert(name.to_lowercase(), value);
            }
            Block::Skipped => {}
        }
        rest = tail;
    }

    Ok(entries)
}

pub fn encode(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(encode_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_entry(entry: &Entry) -> String {
    let entry_type = if entry.record.entry_type.is_empty() {
        "misc"
    } else {
        entry.record.entry_type.as_str()
    };
    let mut out = format!("@{}{{{},\n", entry_type, entry.key);
    for (name, value) in &entry.record.fields {
        out.push_str(&format!("  {} = {{{}}},\n", name, value));
    }
    out.push_str("}\n");
    out
}

/// Fails with `Parse` when `record` would not survive [`encode`] followed by
/// [`decode`].
pub fn check_record(record: &BibRecord, origin: &str) -> Result<()> {
    let invalid = |message: String| Err(PapersError::parse(origin, None, message));

    let entry_type = record.entry_type.as_str();
    if !entry_type.chars().all(|c| c.is_ascii_alphanumeric()) {
        return invalid(format!("invalid entry type '{}'", entry_type));
    }
    if matches!(entry_type, "comment" | "preamble" | "string") {
        return invalid(format!("'{}' is not a bibliographic entry type", entry_type));
    }

    for (name, value) in &record.fields {
        if name.is_empty() || !name.chars().all(is_field_char) {
            return invalid(format!("invalid field name '{}'", name));
        }
        if let Err(problem) = check_value(value) {
            return invalid(format!("field '{}' {}", name, problem));
        }
    }
    Ok(())
}

/// Scans a value the way [`braced`] will when it is read back.
fn check_value(value: &str) -> std::result::Result<(), &'static str> {
    let bytes = value.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                if depth == 0 {
                    return Err("has a '}' without a matching '{'");
                }
                depth -= 1;
            }
            b'\\' => {
                if pos + 1 == bytes.len() {
                    return Err("ends with a backslash");
                }
                pos += 1;
            }
            _ => {}
        }
        pos += 1;
    }

    if depth > 0 {
        return Err("has an unclosed '{'");
    }
    Ok(())
}

/// 1-based line of the position where `rest` starts inside `text`.
fn line_at(text: &str, rest: &str) -> usize {
    let offset = text.len().saturating_sub(rest.len());
    text[..offset].matches('\n').count() + 1
}

/// Offset of the next `@` that is not inside a `%` comment.
fn next_block(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'@' => return Some(pos),
            b'%' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            _ => pos += 1,
        }
    }
    None
}

fn month_macros() -> HashMap<String, String> {
    [
        ("jan", "January"),
        ("feb", "February"),
        ("mar", "March"),
        ("apr", "April"),
        ("may", "May"),
        ("jun", "June"),
        ("jul", "July"),
        ("aug", "August"),
        ("sep", "September"),
        ("oct", "October"),
        ("nov", "November"),
        ("dec", "December"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn is_key_char(c: char) -> bool {
    !c.is_whitespace() && !"{}(),=\"#%'".contains(c)
}

fn is_field_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-:.+".contains(c)
}

fn parse_block<'a>(input: &'a str, macros: &HashMap<String, String>) -> PResult<'a, Block> {
    let (rest, _) = char('@')(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, kind) = expected(
        take_while1(|c: char| c.is_ascii_alphanumeric())(rest),
        rest,
        "expected an entry type after '@'",
    )?;
    let (rest, _) = multispace0(rest)?;
    let (rest, open) = expected(one_of("{(")(rest), rest, "expected '{' or '('")?;
    let close = if open == '{' { '}' } else { ')' };

    match kind.to_lowercase().as_str() {
        "comment" => {
            let (rest, _) = skip_balanced(rest, close)?;
            Ok((rest, Block::Skipped))
        }
        "preamble" => {
            let (rest, _) = multispace0(rest)?;
            let (rest, _) = field_value(rest, macros)?;
            let (rest, _) = multispace0(rest)?;
            let (rest, _) = expected(char(close)(rest), rest, "expected end of @preamble")?;
            Ok((rest, Block::Skipped))
        }
        "string" => {
            let (rest, _) = multispace0(rest)?;
            let (rest, name) = expected(
                take_while1(is_field_char)(rest),
                rest,
                "expected a macro name",
            )?;
            let (rest, _) = multispace0(rest)?;
            let (rest, _) = expected(char('=')(rest), rest, "expected '=' after macro name")?;
            let (rest, _) = multispace0(rest)?;
            let (rest, value) = field_value(rest, macros)?;
            let (rest, _) = multispace0(rest)?;
            let (rest, _) = expected(char(close)(rest), rest, "expected end of @string")?;
            Ok((rest, Block::Macro(name.to_string(), normalize_value(&value))))
        }
        _ => {
            let (rest, entry) = entry_body(rest, kind, close, macros)?;
            Ok((rest, Block::Entry(entry)))
        }
    }
}

fn entry_body<'a>(
    input: &'a str,
    entry_type: &str,
    close: char,
    macros: &HashMap<String, String>,
) -> PResult<'a, Entry> {
    let (rest, _) = multispace0(input)?;
    let (rest, key) = expected(take_while1(is_key_char)(rest), rest, "expected a citekey")?;
    let key = key.to_string();
    let mut record = BibRecord::new(entry_type);

    let (rest, _) = multispace0(rest)?;
    if let Some(rest) = rest.strip_prefix(close) {
        return Ok((rest, Entry::new(key, record)));
    }
    let (mut rest, _) = expected(char(',')(rest), rest, "expected ',' after the citekey")?;

    loop {
        let (r, _) = multispace0(rest)?;
        if let Some(r) = r.strip_prefix(close) {
            return Ok((r, Entry::new(key, record)));
        }
        if r.is_empty() {
            return fail(r, format!("unterminated entry '{}'", key));
        }

        let field_start = r;
        let (r, name) = expected(take_while1(is_field_char)(r), r, "expected a field name")?;
        let (r, _) = multispace0(r)?;
        let (r, _) = expected(char('=')(r), r, "expected '=' after field name")?;
        let (r, _) = multispace0(r)?;
        let (r, value) = field_value(r, macros)?;

        let name = name.to_lowercase();
        if record.fields.contains_key(&name) {
            return fail(field_start, format!("duplicate field '{}' in '{}'", name, key));
        }
        record.set(&name, value);

        let (r, _) = multispace0(r)?;
        rest = match r.strip_prefix(',') {
            Some(r) => r,
            None if r.starts_with(close) => r,
            None => return fail(r, "expected ',' or end of entry"),
        };
    }
}

fn field_value<'a>(input: &'a str, macros: &HashMap<String, String>) -> PResult<'a, String> {
    let mut value = String::new();
    let mut rest = input;

    loop {
        let (r, piece) = value_piece(rest, macros)?;
        value.push_str(&piece);
        let (r, _) = multispace0(r)?;
        match r.strip_prefix('#') {
            Some(r) => {
                let (r, _) = multispace0(r)?;
                rest = r;
            }
            None => return Ok((r, value)),
        }
    }
}

fn value_piece<'a>(input: &'a str, macros: &HashMap<String, String>) -> PResult<'a, String> {
    match input.chars().next() {
        Some('{') => braced(input).map(|(rest, inner)| (rest, inner.to_string())),
        Some('"') => quoted(input).map(|(rest, inner)| (rest, inner.to_string())),
        Some(c) if c.is_ascii_digit() => {
            digit1(input).map(|(rest, digits): (&str, &str)| (rest, digits.to_string()))
        }
        Some(c) if c.is_ascii_alphabetic() => {
            let (rest, name) = take_while1(is_field_char)(input)?;
            match macros.get(&name.to_lowercase()) {
                Some(value) => Ok((rest, value.clone())),
                None => fail(input, format!("undefined string macro '{}'", name)),
            }
        }
        _ => fail(input, "expected a field value"),
    }
}

/// `{...}` with nested braces; returns the inner text.
fn braced(input: &str) -> PResult<'_, &str> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[pos + 1..], &input[1..pos]));
                }
            }
            b'\\' => pos += 1,
            _ => {}
        }
        pos += 1;
    }

    fail(input, "unbalanced braces in field value")
}

/// `"..."`, where quotes inside braces do not terminate the value.
fn quoted(input: &str) -> PResult<'_, &str> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut pos = 1;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' if depth == 0 => return Ok((&input[pos + 1..], &input[1..pos])),
            b'{' => depth += 1,
            b'}' => {
                if depth == 0 {
                    return fail(&input[pos..], "unbalanced braces in quoted value");
                }
                depth -= 1;
            }
            b'\\' => pos += 1,
            _ => {}
        }
        pos += 1;
    }

    fail(input, "unterminated quoted value")
}

/// Skips to the `close` delimiter at brace depth zero.
fn skip_balanced(input: &str, close: char) -> PResult<'_, &str> {
    let mut depth = 0usize;
    for (pos, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            c if c == close && depth == 0 => {
                return Ok((&input[pos + c.len_utf8()..], &input[..pos]));
            }
            _ => {}
        }
    }
    fail(input, "unterminated block")
}
