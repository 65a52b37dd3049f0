//! Documents that flow through the indexing pipeline.
//!
//! The registry, the index and every shard are JSON documents authored or
//! regenerated outside this crate. Entry fields may be missing or carry an
//! unexpected JSON type; instead of type-checking at every access site an
//! [`Entry`] keeps whatever was on disk and hands out [`FieldValue`] and
//! [`TagList`] views exposing only the text that tokenization cares about.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Schema tag for registry and shard documents.
pub const REGISTRY_API_VERSION: &str = "sce.errorbook.registry/v0.1";
/// Schema tag for the index document.
pub const INDEX_API_VERSION: &str = "sce.errorbook.registry-index/v0.1";
/// Minimum token length used when the index does not declare one.
pub const DEFAULT_MIN_TOKEN_LENGTH: usize = 2;
/// Reported id for entries carrying neither `id` nor `fingerprint`.
pub const UNKNOWN_ENTRY_ID: &str = "(unknown)";

/// Read-only view of a scalar entry field: text, or any other JSON value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Other(&'a Value),
}

impl<'a> FieldValue<'a> {
    pub fn as_text(&self) -> Option<&'a str> {
        match *self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Other(_) => None,
        }
    }
}

impl<'a> From<&'a Value> for FieldValue<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Text(s),
            other => FieldValue::Other(other),
        }
    }
}

/// Read-only view of a tag-like entry field: a list, or a non-list value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagList<'a> {
    Items(&'a [Value]),
    Other(&'a Value),
}

impl<'a> TagList<'a> {
    /// String elements in order. Non-string elements and non-list values
    /// yield nothing.
    pub fn texts(self) -> impl Iterator<Item = &'a str> {
        let items: &'a [Value] = match self {
            TagList::Items(items) => items,
            TagList::Other(_) => &[],
        };
        items
            .iter()
            .filter_map(|item| FieldValue::from(item).as_text())
    }
}

impl<'a> From<&'a Value> for TagList<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => TagList::Items(items),
            other => TagList::Other(other),
        }
    }
}

/// Free-text fields, in tokenization order.
pub const TEXT_FIELDS: [&str; 4] = ["title", "symptom", "root_cause", "notes"];
/// Tag-like fields, in tokenization order after [`TEXT_FIELDS`].
pub const TAG_FIELDS: [&str; 4] = ["tags", "ontology_tags", "fix_actions", "verification_evidence"];

/// One knowledge-base record describing a past error and its fix.
///
/// The JSON object is kept exactly as read, so writing an entry back
/// reproduces every field, `null`s and key order included. Known fields
/// are read through [`FieldValue`] and [`TagList`] views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry {
    fields: Map<String, Value>,
}

impl Entry {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// A scalar field, `None` when absent.
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        self.fields.get(name).map(FieldValue::from)
    }

    /// A tag-like field, `None` when absent.
    pub fn tag_list(&self, name: &str) -> Option<TagList<'_>> {
        self.fields.get(name).map(TagList::from)
    }

    /// Identifier used in reports: trimmed `id`, else trimmed `fingerprint`,
    /// else [`UNKNOWN_ENTRY_ID`].
    pub fn display_id(&self) -> &str {
        ["id", "fingerprint"]
            .into_iter()
            .filter_map(|name| self.field(name).and_then(|f| f.as_text()))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_ENTRY_ID)
    }

    /// Raw text chunks in tokenization order: the free-text fields, then
    /// every string element of the tag-like fields.
    pub fn text_chunks(&self) -> impl Iterator<Item = &str> + '_ {
        let scalars = TEXT_FIELDS
            .into_iter()
            .filter_map(move |name| self.field(name).and_then(|f| f.as_text()));
        let lists = TAG_FIELDS
            .into_iter()
            .filter_map(move |name| self.tag_list(name))
            .flat_map(TagList::texts);
        scalars.chain(lists)
    }
}

impl From<Map<String, Value>> for Entry {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// The versioned container of all entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_entries: Option<u64>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Registry {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            api_version: REGISTRY_API_VERSION.to_string(),
            generated_at: None,
            total_entries: Some(entries.len() as u64),
            entries,
            extra: Map::new(),
        }
    }

    /// Stamp the schema tag, generation time and entry count. Entries are
    /// left untouched.
    pub fn refresh(&mut self, generated_at: &str) {
        self.api_version = REGISTRY_API_VERSION.to_string();
        self.generated_at = Some(generated_at.to_string());
        self.total_entries = Some(self.entries.len() as u64);
    }
}

/// Token and bucket lookup tables pointing at shard locations.
///
/// Reading is lenient about value types: a table that is not an object is
/// read as empty, a non-string value in a table as an empty string, and a
/// non-integer `min_token_length` as absent. The coverage gate then reports
/// the affected entries instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_length",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_token_length: Option<usize>,
    #[serde(default, deserialize_with = "lenient_string_map")]
    pub token_to_bucket: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_string_map")]
    pub buckets: BTreeMap<String, String>,
}

fn lenient_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(raw) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(raw
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => (key, s),
            _ => (key, String::new()),
        })
        .collect())
}

fn lenient_length<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_u64().and_then(|n| usize::try_from(n).ok()))
}

impl Index {
    pub fn effective_min_token_length(&self) -> usize {
        self.min_token_length.unwrap_or(DEFAULT_MIN_TOKEN_LENGTH)
    }
}

/// Entry count recorded in a shard's `source` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardCounts {
    pub total_entries: u64,
}

/// A shard document as read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    pub api_version: String,
    #[serde(default)]
    pub generated_at: Option<String>,
    pub bucket: String,
    pub source: ShardCounts,
    pub entries: Vec<Entry>,
}
