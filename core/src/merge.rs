use crate::document::{Document, Entry};

/// Sets `document[category][key]` to exactly `entry`.
///
/// A missing category is created first. An existing entry under the same key is replaced as a
/// whole and keeps its position; every other category and key is left as it was.
pub fn apply(mut document: Document, category: &str, key: &str, entry: Entry) -> Document {
    document
        .categories
        .entry(category.to_string())
        .or_default()
        .insert(key.to_string(), entry.into());
    document
}
