//! Core domain types for docsets content collections.

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DocsetsError, Result};

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A single documentation entry as exported by `/api/docs.json`.
///
/// Field order matters: records serialize as `{id, data, body}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Normalized, path-like identifier (e.g. `guides/adding-steps`).
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Frontmatter metadata in declaration order.
    #[serde(default)]
    pub data: Metadata,
    /// Raw body text (everything after the frontmatter).
    #[serde(default)]
    pub body: String,
}

impl Document {
    /// Build a document, normalizing the identifier.
    pub fn new(id: impl AsRef<str>, data: Metadata, body: impl Into<String>) -> Self {
        Self {
            id: normalize_id(id.as_ref()).to_string(),
            data,
            body: body.into(),
        }
    }

    /// The frontmatter `title`, if it is a string.
    pub fn title(&self) -> Option<&str> {
        self.data.get_str("title")
    }

    /// The frontmatter `description`, if it is a string.
    pub fn description(&self) -> Option<&str> {
        self.data.get_str("description")
    }

    /// Title for listings: frontmatter `title`, else humanized from the identifier.
    pub fn display_title(&self) -> String {
        self.title()
            .map(str::to_string)
            .unwrap_or_else(|| title_from_id(&self.id))
    }
}

/// Trim leading and trailing `/` from an identifier or pattern.
pub fn normalize_id(id: &str) -> &str {
    id.trim_matches('/')
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let id = String::deserialize(deserializer)?;
    Ok(normalize_id(&id).to_string())
}

/// Extract a human-readable title from an identifier's last segment.
pub fn title_from_id(id: &str) -> String {
    let segment = id.rsplit('/').next().unwrap_or(id);

    if segment == "index" || segment.is_empty() {
        return "Overview".to_string();
    }

    segment
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    format!("{upper}{}", chars.as_str())
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// MetaValue
// ---------------------------------------------------------------------------

/// A typed frontmatter value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<MetaValue>),
    Map(Metadata),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Path (relative to this value) of the first value JSON cannot represent.
    fn find_unrepresentable(&self) -> Option<String> {
        match self {
            Self::Float(f) if !f.is_finite() => Some(String::new()),
            Self::List(items) => items.iter().enumerate().find_map(|(i, item)| {
                item.find_unrepresentable()
                    .map(|rest| format!("[{i}]{}", dotted(&rest)))
            }),
            Self::Map(map) => map.find_unrepresentable(),
            _ => None,
        }
    }
}

fn dotted(rest: &str) -> String {
    if rest.is_empty() || rest.starts_with('[') {
        rest.to_string()
    } else {
        format!(".{rest}")
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for MetaValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl Serialize for MetaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(n) => serializer.serialize_i64(*n),
            Self::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Self::Float(f) => Err(ser::Error::custom(format!(
                "non-finite number {f} is not representable"
            ))),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

struct MetaValueVisitor;

impl<'de> Visitor<'de> for MetaValueVisitor {
    type Value = MetaValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a frontmatter value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<MetaValue, E> {
        Ok(MetaValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<MetaValue, E> {
        Ok(MetaValue::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<MetaValue, E> {
        Ok(i64::try_from(v)
            .map(MetaValue::Integer)
            .unwrap_or(MetaValue::Float(v as f64)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<MetaValue, E> {
        Ok(MetaValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<MetaValue, E> {
        Ok(MetaValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<MetaValue, E> {
        Ok(MetaValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<MetaValue, E> {
        Ok(MetaValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<MetaValue, E> {
        Ok(MetaValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<MetaValue, D::Error> {
        MetaValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<MetaValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(MetaValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> std::result::Result<MetaValue, A::Error> {
        MetadataVisitor.visit_map(map).map(MetaValue::Map)
    }
}

impl<'de> Deserialize<'de> for MetaValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(MetaValueVisitor)
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Ordered frontmatter mapping with unique keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entries: Vec<(String, MetaValue)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new key. Fails if the key is already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Result<()> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(DocsetsError::validation(format!(
                "duplicate metadata key '{key}'"
            )));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    /// Builder-style insert for literals in tests and fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Result<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a key and return it only if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetaValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Dotted key path of the first value that cannot be exported, if any.
    pub fn find_unrepresentable(&self) -> Option<String> {
        self.entries.iter().find_map(|(key, value)| {
            value
                .find_unrepresentable()
                .map(|rest| format!("{key}{}", dotted(&rest)))
        })
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct MetadataVisitor;

impl<'de> Visitor<'de> for MetadataVisitor {
    type Value = Metadata;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping with string keys")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Metadata, E> {
        Ok(Metadata::new())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Metadata, A::Error> {
        let mut metadata = Metadata::new();
        while let Some(key) = map.next_key::<String>()? {
            let value: MetaValue = map.next_value()?;
            if metadata.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key `{key}`")));
            }
            metadata.entries.push((key, value));
        }
        Ok(metadata)
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(MetadataVisitor)
    }
}
