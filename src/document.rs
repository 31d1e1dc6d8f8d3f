//! Documents and collection snapshots.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::time::Instant;

/// A single entity record: a mapping from field name to JSON value.
pub type Document = Map<String, Value>;

/// Render a primary-key value as the string used to index snapshots.
///
/// Strings are used as-is and integers in their decimal form. Anything else
/// (floats, booleans, arrays, objects, `null`, empty strings) is not a usable
/// key and yields `None`.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Extract the primary key of `doc` from `key_field`.
pub fn key_of(doc: &Document, key_field: &str) -> Option<String> {
    doc.get(key_field).and_then(key_string)
}

/// Full in-memory copy of one collection, keyed by primary key.
///
/// A snapshot is built in one go from the store's documents and never
/// mutated afterwards; the cache replaces or drops it wholesale.
#[derive(Debug, Clone)]
pub struct Snapshot {
    collection: String,
    key_field: String,
    documents: BTreeMap<String, Document>,
    fetched_at: Instant,
}

impl Snapshot {
    /// Build a snapshot from the full contents of a collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreError` if any document lacks a usable value for
    /// `key_field`. Such a document is an integrity fault in the store and is
    /// never dropped silently.
    pub fn from_documents(
        collection: &str,
        key_field: &str,
        docs: impl IntoIterator<Item = Document>,
    ) -> Result<Self> {
        let mut documents = BTreeMap::new();

        for doc in docs {
            let key = key_of(&doc, key_field).ok_or_else(|| {
                Error::StoreError(format!(
                    "document in '{}' has no usable '{}' field",
                    collection, key_field
                ))
            })?;

            if documents.insert(key.clone(), doc).is_some() {
                warn!(
                    "⚠ Collection {} holds more than one document keyed '{}', keeping the last",
                    collection, key
                );
            }
        }

        Ok(Snapshot {
            collection: collection.to_string(),
            key_field: key_field.to_string(),
            documents,
            fetched_at: Instant::now(),
        })
    }

    /// Snapshot of a collection with no documents.
    pub fn empty(collection: &str, key_field: &str) -> Self {
        Snapshot {
            collection: collection.to_string(),
            key_field: key_field.to_string(),
            documents: BTreeMap::new(),
            fetched_at: Instant::now(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// When the store fetch behind this snapshot completed.
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn get(&self, key: &str) -> Option<&Document> {
        self.documents.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.documents.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Primary keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Documents in primary-key order.
    pub fn documents(&self) -> btree_map::Values<'_, String, Document> {
        self.documents.values()
    }
}
