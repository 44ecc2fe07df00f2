//! YAML records and metadata.
//!
//! Records look like:
//!
//! ```yaml
//! Page99:
//!   '@type': techreport
//!   author: Page, Lawrence and Brin, Sergey
//!   type: Technical Report
//!   year: 1999
//! ```
//!
//! The entry type lives under `@type`, which no BibTeX field name can clash
//! with. Hand-written files may use `type` instead; it is read as the entry
//! type only when `@type` is absent.
//!
//! Mappings are read through [`Pairs`], which keeps every key it sees so
//! duplicates can be rejected instead of overwritten.

use crate::error::{PapersError, Result};
use crate::model::{BibRecord, Entry, Metadata};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;

const ENTRY_TYPE_KEY: &str = "@type";
const SHORT_TYPE_KEY: &str = "type";

/// An ordered list of mapping pairs, duplicates included.
struct Pairs<V>(Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Pairs<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PairsVisitor<V>(std::marker::PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for PairsVisitor<V> {
            type Value = Pairs<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut pairs = Vec::new();
                while let Some((key, value)) = map.next_entry::<Value, V>()? {
                    let key = scalar_to_string(&key)
                        .ok_or_else(|| serde::de::Error::custom("mapping keys must be scalars"))?;
                    pairs.push((key, value));
                }
                Ok(Pairs(pairs))
            }

            fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(Pairs(Vec::new()))
            }
        }

        deserializer.deserialize_map(PairsVisitor(std::marker::PhantomData))
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_error(origin: &str, err: serde_yaml::Error) -> PapersError {
    let line = err.location().map(|loc| loc.line());
    PapersError::parse(origin, line, err.to_string())
}

pub fn decode_entries(text: &str, origin: &str) -> Result<Vec<Entry>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let top: Pairs<Pairs<Value>> = serde_yaml::from_str(text).map_err(|e| yaml_error(origin, e))?;

    let mut entries: Vec<Entry> = Vec::new();
    for (key, fields) in top.0 {
        if entries.iter().any(|e| e.key.eq_ignore_ascii_case(&key)) {
            return Err(PapersError::parse(
                origin,
                None,
                format!("duplicate entry key '{}'", key),
            ));
        }

        let has_entry_type = fields
            .0
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(ENTRY_TYPE_KEY));
        let type_key = if has_entry_type {
            ENTRY_TYPE_KEY
        } else {
            SHORT_TYPE_KEY
        };
        let mut record = BibRecord::new("misc");
        let mut seen = Vec::new();
        for (name, value) in fields.0 {
            let name = name.to_lowercase();
            if seen.contains(&name) {
                return Err(PapersError::parse(
                    origin,
                    None,
                    format!("duplicate field '{}' in '{}'", name, key),
                ));
            }
            let value = scalar_to_string(&value).ok_or_else(|| {
                PapersError::parse(
                    origin,
                    None,
                    format!("field '{}' in '{}' must be a plain value", name, key),
                )
            })?;
            if name == type_key {
                record.entry_type = value.to_lowercase();
            } else {
                record.set(&name, value);
            }
            seen.push(name);
        }
        entries.push(Entry::new(key, record));
    }
    Ok(entries)
}

pub fn encode_entries(entries: &[Entry]) -> Result<String> {
    let mut top: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
    for entry in entries {
        let mut fields: BTreeMap<&str, &str> = entry
            .record
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        fields.insert(ENTRY_TYPE_KEY, entry.record.entry_type.as_str());
        top.insert(entry.key.as_str(), fields);
    }
    serde_yaml::to_string(&top)
        .map_err(|e| PapersError::parse("entries", None, format!("cannot serialize: {}", e)))
}

pub fn decode_metadata(text: &str, origin: &str) -> Result<Metadata> {
    let pairs: Pairs<Value> = serde_yaml::from_str(text).map_err(|e| yaml_error(origin, e))?;
    let mut keys: Vec<&str> = Vec::new();
    for (key, _) in &pairs.0 {
        if keys.contains(&key.as_str()) {
            return Err(PapersError::parse(
                origin,
                None,
                format!("duplicate key '{}'", key),
            ));
        }
        keys.push(key);
    }
    serde_yaml::from_str(text).map_err(|e| yaml_error(origin, e))
}

pub fn encode_metadata(meta: &Metadata) -> Result<String> {
    serde_yaml::to_string(meta)
        .map_err(|e| PapersError::parse("metadata", None, format!("cannot serialize: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::DocumentRef;

    #[test]
    fn test_decode_entries() {
        let text = "Page99:\n  type: TechReport\n  author: Page, Lawrence\n  year: 1999\n";
        let entries = decode_entries(text, "t.yaml").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "Page99");
        assert_eq!(entries[0].record.entry_type, "techreport");
        assert_eq!(entries[0].record.get("year"), Some("1999"));
    }

    #[test]
    fn test_entry_type_key_leaves_type_field_alone() {
        let text = "k:\n  '@type': techreport\n  type: Technical Report\n  title: T\n";
        let entries = decode_entries(text, "t.yaml").unwrap();
        assert_eq!(entries[0].record.entry_type, "techreport");
        assert_eq!(entries[0].record.get("type"), Some("Technical Report"));

        let encoded = encode_entries(&entries).unwrap();
        assert!(encoded.contains("@type"));
        assert!(encoded.contains("type: Technical Report"));
        assert_eq!(decode_entries(&encoded, "t.yaml").unwrap(), entries);
    }

    #[test]
    fn test_values_are_normalized() {
        let text = "k:\n  title: |\n    Two lines\n    of  title\n";
        let entries = decode_entries(text, "t.yaml").unwrap();
        assert_eq!(entries[0].record.title(), Some("Two lines of title"));
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let text = "k:\n  title: A\n  Title: B\n";
        let err = decode_entries(text, "t.yaml").unwrap_err();
        assert!(err.to_string().contains("duplicate field 'title'"));

        let text = "k:\n  title: A\nK:\n  title: B\n";
        let err = decode_entries(text, "t.yaml").unwrap_err();
        assert!(err.to_string().contains("duplicate entry key"));
    }

    #[test]
    fn test_nested_values_rejected() {
        let text = "k:\n  author:\n    - A\n    - B\n";
        assert!(decode_entries(text, "t.yaml").is_err());
    }

    #[test]
    fn test_malformed_yaml_reports_line() {
        let err = decode_metadata("added: 2024-01-01T00:00:00Z\ntags: [a, b\n", "meta/k.yaml")
            .unwrap_err();
        match err {
            PapersError::Parse { origin, line, .. } => {
                assert_eq!(origin, "meta/k.yaml");
                assert!(line.is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut meta = Metadata::new();
        meta.tags.insert("network".into());
        meta.tags.insert("search".into());
        meta.document = Some(DocumentRef::managed("Page99.pdf"));
        meta.extra.insert("notes".into(), Value::from("read twice"));

        let text = encode_metadata(&meta).unwrap();
        let back = decode_metadata(&text, "t").unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_metadata_duplicate_key_rejected() {
        let text = "added: 2024-01-01T00:00:00Z\ntags: [a]\ntags: [b]\n";
        let err = decode_metadata(text, "t").unwrap_err();
        assert!(err.to_string().contains("duplicate key 'tags'"));
    }
}
