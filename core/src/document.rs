//! The answers document: categories of keyed entries, stored remotely as one JSON file.
//!
//! A [`Document`] maps category names to [`Category`] maps, which in turn map entry keys to
//! entry records. Key order is preserved as read, and new keys are appended, so that
//! rewriting the document produces a minimal, deterministic diff in the remote history.
//!
//! Entries are kept as raw JSON. Only the entry being replaced is ever looked at through
//! [`Entry`]; every other entry is written back exactly as it was read, whatever its shape.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Entries of one category, keyed by entry key.
pub type Category = IndexMap<String, Value>;

/// One answer record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    pub name: String,
    /// Filename of the image, e.g. `cat.png`.
    pub img: String,
    /// Path of the image relative to the document, e.g. `./imgs/cat.png`.
    pub img_url: String,
    pub desc: String,
    /// Any other fields, including known fields that were not strings.
    pub extra: Map<String, Value>,
}

const NAME: &str = "name";
const IMG: &str = "img";
const IMG_URL: &str = "imgUrl";
const DESC: &str = "desc";

impl Entry {
    /// Creates an entry whose image lives at `./<image_dir>/<filename>`.
    pub fn new(
        name: impl Into<String>,
        desc: impl Into<String>,
        image_dir: &str,
        filename: &str,
    ) -> Self {
        Entry {
            name: name.into(),
            img: filename.to_string(),
            img_url: image_url(image_dir, filename),
            desc: desc.into(),
            extra: Map::new(),
        }
    }

    /// Creates an entry that reuses the image reference of `previous`.
    pub fn keeping_image(name: impl Into<String>, desc: impl Into<String>, previous: &Entry) -> Self {
        Entry {
            name: name.into(),
            img: previous.img.clone(),
            img_url: previous.img_url.clone(),
            desc: desc.into(),
            extra: Map::new(),
        }
    }

    /// Reads an entry from stored JSON.
    ///
    /// Never fails: known fields that are absent or not strings read as empty, and the
    /// original values stay in [`Entry::extra`]. A non-object value reads as an empty entry.
    pub fn from_value(value: &Value) -> Self {
        let mut entry = Entry::default();
        let Some(fields) = value.as_object() else {
            return entry;
        };
        for (field, value) in fields {
            let slot = match field.as_str() {
                NAME => &mut entry.name,
                IMG => &mut entry.img,
                IMG_URL => &mut entry.img_url,
                DESC => &mut entry.desc,
                _ => {
                    entry.extra.insert(field.clone(), value.clone());
                    continue;
                }
            };
            match value {
                Value::String(s) => *slot = s.clone(),
                other => {
                    entry.extra.insert(field.clone(), other.clone());
                }
            }
        }
        entry
    }
}

impl From<Entry> for Value {
    fn from(entry: Entry) -> Self {
        let mut fields = Map::new();
        fields.insert(NAME.to_string(), Value::String(entry.name));
        fields.insert(IMG.to_string(), Value::String(entry.img));
        fields.insert(IMG_URL.to_string(), Value::String(entry.img_url));
        fields.insert(DESC.to_string(), Value::String(entry.desc));
        for (field, value) in entry.extra {
            fields.entry(field).or_insert(value);
        }
        Value::Object(fields)
    }
}

/// Repository path of an image stored under `image_dir`.
pub fn image_path(image_dir: &str, filename: &str) -> String {
    let dir = image_dir.trim_matches('/');
    if dir.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", dir, filename)
    }
}

/// Document-relative URL of an image stored under `image_dir`.
pub fn image_url(image_dir: &str, filename: &str) -> String {
    format!("./{}", image_path(image_dir, filename))
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Document is not a valid answers object: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to serialize document: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Mapping from category name to [`Category`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub(crate) categories: IndexMap<String, Category>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses stored document content.
    ///
    /// Empty or whitespace-only content is an empty document. Anything else must be a JSON
    /// object of objects, or [`DocumentError::Malformed`] is returned. Entry values inside a
    /// category may be anything.
    pub fn parse(content: &[u8]) -> Result<Self, DocumentError> {
        let text = std::str::from_utf8(content)?;
        if text.trim().is_empty() {
            return Ok(Document::default());
        }
        serde_json::from_str(text).map_err(DocumentError::Malformed)
    }

    /// Serializes the document with two-space indentation.
    pub fn to_pretty_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self).map_err(DocumentError::Serialization)
    }

    pub fn category(&self, category: &str) -> Option<&Category> {
        self.categories.get(category)
    }

    /// The stored JSON of one entry.
    pub fn entry_value(&self, category: &str, key: &str) -> Option<&Value> {
        self.categories.get(category)?.get(key)
    }

    /// One entry, read leniently through [`Entry::from_value`].
    pub fn entry(&self, category: &str, key: &str) -> Option<Entry> {
        self.entry_value(category, key).map(Entry::from_value)
    }

    pub fn contains(&self, category: &str, key: &str) -> bool {
        self.entry_value(category, key).is_some()
    }

    /// Iterates over categories in stored order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &Category)> {
        self.categories.iter().map(|(name, category)| (name.as_str(), category))
    }

    /// Total number of entries across all categories.
    pub fn entry_count(&self) -> usize {
        self.categories.values().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
