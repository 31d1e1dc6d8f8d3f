//! In-process document store (tests, demos, benchmarks).
//!
//! Uses DashMap for concurrent access with per-collection sharding. Supports
//! fault injection (an "unreachable" switch), artificial latency and call
//! counters so tests can assert exactly how often the store was touched.

use super::{DocumentStore, StoreConnector};
use crate::config::{ConnectionConfig, ConnectionTarget};
use crate::document::{key_of, Document};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct CallCounters {
    find_all: AtomicUsize,
    find_one: AtomicUsize,
    insert: AtomicUsize,
    replace: AtomicUsize,
    delete: AtomicUsize,
    ping: AtomicUsize,
}

/// Number of calls each store operation has received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub find_all: usize,
    pub find_one: usize,
    pub insert: usize,
    pub replace: usize,
    pub delete: usize,
    pub ping: usize,
}

impl StoreCalls {
    /// Insert, replace and delete calls.
    pub fn writes(&self) -> usize {
        self.insert + self.replace + self.delete
    }

    /// Every call, pings included.
    pub fn total(&self) -> usize {
        self.find_all + self.find_one + self.writes() + self.ping
    }
}

/// Thread-safe in-memory document store.
///
/// Clones share the same collections, switches and counters.
///
/// # Example
///
/// ```no_run
/// use geodata_cache::store::{DocumentStore, InMemoryStore};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> geodata_cache::Result<()> {
///     let store = InMemoryStore::new();
///     let apex = json!({"name": "Apex", "population": 100});
///     store.seed("cities", vec![apex.as_object().cloned().unwrap()]);
///
///     let docs = store.find_all("cities").await?;
///     assert_eq!(docs.len(), 1);
///     assert_eq!(store.calls().find_all, 1);
///     Ok(())
/// }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<DashMap<String, Vec<Document>>>,
    unavailable: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
    counters: Arc<CallCounters>,
}

impl InMemoryStore {
    /// Create an empty, reachable store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of `collection` without counting a call.
    pub fn seed(&self, collection: &str, docs: impl IntoIterator<Item = Document>) {
        self.collections
            .insert(collection.to_string(), docs.into_iter().collect());
    }

    /// Current contents of `collection` without counting a call.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| docs.value().clone())
            .unwrap_or_default()
    }

    /// Make every subsequent call fail (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
        if available {
            debug!("✓ InMemory store reachable");
        } else {
            debug!("✗ InMemory store unreachable");
        }
    }

    pub fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Calls received so far.
    pub fn calls(&self) -> StoreCalls {
        let c = &self.counters;
        StoreCalls {
            find_all: c.find_all.load(Ordering::SeqCst),
            find_one: c.find_one.load(Ordering::SeqCst),
            insert: c.insert.load(Ordering::SeqCst),
            replace: c.replace.load(Ordering::SeqCst),
            delete: c.delete.load(Ordering::SeqCst),
            ping: c.ping.load(Ordering::SeqCst),
        }
    }

    /// Zero every call counter.
    pub fn reset_calls(&self) {
        let c = &self.counters;
        for counter in [
            &c.find_all,
            &c.find_one,
            &c.insert,
            &c.replace,
            &c.delete,
            &c.ping,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    /// Count the call, apply latency, then fail if unreachable.
    ///
    /// No DashMap guard is held across the sleep.
    async fn enter(&self, counter: &AtomicUsize, op: &str, collection: &str) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.is_available() {
            Ok(())
        } else {
            debug!("✗ InMemory {} {} -> unreachable", op, collection);
            Err(Error::StoreError(format!(
                "{} on '{}' failed: store unreachable",
                op, collection
            )))
        }
    }
}

fn matches_key(doc: &Document, key_field: &str, key: &str) -> bool {
    key_of(doc, key_field).is_some_and(|k| k == key)
}

impl DocumentStore for InMemoryStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>> {
        self.enter(&self.counters.find_all, "FIND_ALL", collection)
            .await?;

        let docs = self.documents(collection);
        debug!("✓ InMemory FIND_ALL {} -> {} docs", collection, docs.len());
        Ok(docs)
    }

    async fn find_one(
        &self,
        collection: &str,
        key_field: &str,
        key: &str,
    ) -> Result<Option<Document>> {
        self.enter(&self.counters.find_one, "FIND_ONE", collection)
            .await?;

        Ok(self.collections.get(collection).and_then(|docs| {
            docs.iter()
                .find(|doc| matches_key(doc, key_field, key))
                .cloned()
        }))
    }

    async fn insert(&self, collection: &str, key_field: &str, doc: Document) -> Result<()> {
        self.enter(&self.counters.insert, "INSERT", collection)
            .await?;

        // Check and push under one entry guard.
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if let Some(key) = key_of(&doc, key_field) {
            if docs.iter().any(|d| matches_key(d, key_field, &key)) {
                debug!("✗ InMemory INSERT {} '{}' -> duplicate", collection, key);
                return Err(Error::duplicate_key(collection, key));
            }
        }
        docs.push(doc);
        debug!("✓ InMemory INSERT {}", collection);
        Ok(())
    }

    async fn replace(
        &self,
        collection: &str,
        key_field: &str,
        key: &str,
        doc: Document,
    ) -> Result<bool> {
        self.enter(&self.counters.replace, "REPLACE", collection)
            .await?;

        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        match docs.iter_mut().find(|d| matches_key(d, key_field, key)) {
            Some(slot) => {
                *slot = doc;
                debug!("✓ InMemory REPLACE {} '{}'", collection, key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, key_field: &str, key: &str) -> Result<bool> {
        self.enter(&self.counters.delete, "DELETE", collection)
            .await?;

        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        match docs.iter().position(|d| matches_key(d, key_field, key)) {
            Some(index) => {
                docs.remove(index);
                debug!("✓ InMemory DELETE {} '{}'", collection, key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<()> {
        self.enter(&self.counters.ping, "PING", "admin").await
    }
}

/// Connector handing out clones of one shared [`InMemoryStore`].
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    store: InMemoryStore,
    attempts: Arc<AtomicUsize>,
}

impl InMemoryConnector {
    pub fn new(store: InMemoryStore) -> Self {
        InMemoryConnector {
            store,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The store every connection shares.
    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    /// How many times `connect` has been called.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl StoreConnector for InMemoryConnector {
    type Store = InMemoryStore;

    async fn connect(
        &self,
        target: &ConnectionTarget,
        database: &str,
        _config: &ConnectionConfig,
    ) -> Result<InMemoryStore> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if !self.store.is_available() {
            return Err(Error::StoreError(format!(
                "connection to {} refused",
                target
            )));
        }

        debug!("✓ InMemory CONNECT {} db={}", target, database);
        Ok(self.store.clone())
    }
}
