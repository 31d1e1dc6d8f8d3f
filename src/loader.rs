//! Bulk import of backup files into a collection.
//!
//! A backup file is a JSON array of documents. Every record goes through
//! [`EntityRepository::create`], so schema validation and the duplicate-key
//! check apply exactly as they do for single writes. Bad records are logged
//! and skipped; losing the connection aborts the load.

use crate::document::{key_string, Document};
use crate::error::{Error, Result};
use crate::repository::EntityRepository;
use crate::store::StoreConnector;
use serde_json::Value;
use std::path::Path;

/// Outcome of a bulk load.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Records created.
    pub loaded: usize,
    /// Records rejected, with a label (key or position) and the reason.
    pub skipped: Vec<(String, Error)>,
}

impl LoadReport {
    pub fn total(&self) -> usize {
        self.loaded + self.skipped.len()
    }
}

/// Load the JSON array at `path` into `collection`.
///
/// # Errors
///
/// - `Error::StoreError`: the file cannot be read
/// - `Error::ValidationError`: the file is not a JSON array
/// - `Error::NotConnected`: the repository has no live connection
pub async fn load_json_file<C: StoreConnector>(
    repo: &EntityRepository<C>,
    collection: &str,
    path: impl AsRef<Path>,
) -> Result<LoadReport> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::StoreError(format!("cannot read {}: {}", path.display(), e)))?;

    let records = match serde_json::from_str::<Value>(&raw)? {
        Value::Array(records) => records,
        other => {
            return Err(Error::ValidationError(format!(
                "expected a JSON array in {}, got {}",
                path.display(),
                kind_of(&other)
            )))
        }
    };

    info!(
        "Loading {} records from {} into {}",
        records.len(),
        path.display(),
        collection
    );
    load_records(repo, collection, records).await
}

/// Create every document in `docs` in `collection`.
pub async fn load_documents<C: StoreConnector>(
    repo: &EntityRepository<C>,
    collection: &str,
    docs: impl IntoIterator<Item = Document>,
) -> Result<LoadReport> {
    load_records(repo, collection, docs.into_iter().map(Value::Object)).await
}

async fn load_records<C: StoreConnector>(
    repo: &EntityRepository<C>,
    collection: &str,
    records: impl IntoIterator<Item = Value>,
) -> Result<LoadReport> {
    // Fail fast instead of skipping every record one by one.
    repo.connections().acquire().await?;

    let key_field = repo.schemas().require(collection)?.key_field().to_string();
    let mut report = LoadReport::default();

    for (index, record) in records.into_iter().enumerate() {
        let doc = match record {
            Value::Object(doc) => doc,
            other => {
                let err = Error::ValidationError(format!(
                    "record is {}, not an object",
                    kind_of(&other)
                ));
                warn!("⚠ Skip {} #{}: {}", collection, index, err);
                report.skipped.push((format!("#{}", index), err));
                continue;
            }
        };

        let label = doc
            .get(&key_field)
            .and_then(key_string)
            .unwrap_or_else(|| format!("#{}", index));

        match repo.create(collection, doc).await {
            Ok(_) => report.loaded += 1,
            Err(Error::NotConnected) => return Err(Error::NotConnected),
            Err(err) => {
                warn!("⚠ Skip {} {}: {}", collection, label, err);
                report.skipped.push((label, err));
            }
        }
    }

    info!(
        "✓ {}: {} loaded, {} skipped",
        collection,
        report.loaded,
        report.skipped.len()
    );
    Ok(report)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
