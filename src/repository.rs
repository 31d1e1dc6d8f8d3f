//! Generic entity repository over the connection manager and snapshot cache.
//!
//! One [`EntityRepository`] serves every collection declared in its
//! [`SchemaRegistry`]. Reads are answered from the collection snapshot;
//! writes are validated, checked against the snapshot and then applied to
//! the store through [`SnapshotCache::write_through`].
//!
//! Every operation passes the connection guard first, so a disconnected
//! repository answers `Error::NotConnected` without touching the store.
//!
//! # Example
//!
//! ```no_run
//! use geodata_cache::cache::SnapshotCache;
//! use geodata_cache::config::ConnectionConfig;
//! use geodata_cache::connection::ConnectionManager;
//! use geodata_cache::repository::EntityRepository;
//! use geodata_cache::store::InMemoryConnector;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> geodata_cache::Result<()> {
//!     let manager = Arc::new(ConnectionManager::new(
//!         ConnectionConfig::default(),
//!         InMemoryConnector::default(),
//!     ));
//!     manager.connect().await?;
//!
//!     let repo = EntityRepository::new(manager, SnapshotCache::new());
//!     let apex = json!({"name": "Apex", "population": 100});
//!     repo.create("cities", apex.as_object().cloned().unwrap()).await?;
//!
//!     let city = repo.fetch_one("cities", "Apex").await?;
//!     assert_eq!(city["population"], json!(100));
//!     Ok(())
//! }
//! ```

use crate::cache::SnapshotCache;
use crate::connection::{Connection, ConnectionManager};
use crate::document::{key_string, Document, Snapshot};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::schema::{CollectionSchema, SchemaRegistry};
use crate::store::{DocumentStore, StoreConnector};
use crate::strategy::CacheStrategy;
use std::sync::Arc;

/// CRUD surface for every registered collection.
///
/// Cheap to clone; clones share the connection manager, cache and schemas.
pub struct EntityRepository<C: StoreConnector> {
    connections: Arc<ConnectionManager<C>>,
    cache: SnapshotCache,
    schemas: Arc<SchemaRegistry>,
}

impl<C: StoreConnector> Clone for EntityRepository<C> {
    fn clone(&self) -> Self {
        EntityRepository {
            connections: Arc::clone(&self.connections),
            cache: self.cache.clone(),
            schemas: Arc::clone(&self.schemas),
        }
    }
}

impl<C: StoreConnector> EntityRepository<C> {
    /// Repository over the built-in geographic schemas.
    pub fn new(connections: Arc<ConnectionManager<C>>, cache: SnapshotCache) -> Self {
        EntityRepository {
            connections,
            cache,
            schemas: Arc::new(SchemaRegistry::geographic()),
        }
    }

    /// Replace the schema registry.
    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = Arc::new(schemas);
        self
    }

    pub fn connections(&self) -> &Arc<ConnectionManager<C>> {
        &self.connections
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Cached snapshot of `schema`'s collection, filled on a miss.
    async fn snapshot(
        &self,
        conn: &Connection<C::Store>,
        schema: &CollectionSchema,
    ) -> Result<Arc<Snapshot>> {
        self.cache
            .read(schema.collection(), || load_snapshot(conn.store(), schema))
            .await
    }

    /// Every document in `collection` matching `filter`, ordered by key.
    ///
    /// # Errors
    ///
    /// - `Error::NotConnected`: no live connection
    /// - `Error::ValidationError`: unknown collection
    /// - `Error::StoreError`: the fill failed or a stored document has no key
    pub async fn fetch_all(
        &self,
        collection: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>> {
        self.fetch_all_with(collection, filter, CacheStrategy::Refresh)
            .await
    }

    /// [`fetch_all`](Self::fetch_all) with an explicit cache strategy.
    pub async fn fetch_all_with(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        strategy: CacheStrategy,
    ) -> Result<Vec<Document>> {
        let conn = self.connections.acquire().await?;
        let schema = self.schemas.require(collection)?;

        let snapshot = match strategy {
            CacheStrategy::Refresh => self.snapshot(&conn, schema).await?,
            CacheStrategy::Invalidate => {
                self.cache.invalidate(collection);
                self.snapshot(&conn, schema).await?
            }
            CacheStrategy::Bypass => {
                debug!("Listing {} directly from the store", collection);
                Arc::new(load_snapshot(conn.store(), schema).await?)
            }
        };

        Ok(snapshot
            .documents()
            .filter(|doc| filter.map_or(true, |f| f.matches(doc)))
            .cloned()
            .collect())
    }

    /// The document keyed `key`.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the snapshot has no such key, plus the errors of
    /// [`fetch_all`](Self::fetch_all).
    pub async fn fetch_one(&self, collection: &str, key: &str) -> Result<Document> {
        let conn = self.connections.acquire().await?;
        let schema = self.schemas.require(collection)?;

        self.snapshot(&conn, schema)
            .await?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(collection, key))
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.connections.acquire().await?;
        let schema = self.schemas.require(collection)?;

        Ok(self.snapshot(&conn, schema).await?.len())
    }

    /// Whether `collection` holds a document keyed `key`.
    pub async fn exists(&self, collection: &str, key: &str) -> Result<bool> {
        let conn = self.connections.acquire().await?;
        let schema = self.schemas.require(collection)?;

        Ok(self.snapshot(&conn, schema).await?.contains_key(key))
    }

    /// Insert a new document and return it.
    ///
    /// Validation happens before any store access. The key is checked
    /// against the current snapshot, which is filled first if absent, and
    /// again by the store, which settles concurrent creates of one key.
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError`: missing or malformed field
    /// - `Error::DuplicateKey`: the key is already taken; nothing is written
    /// - `Error::StoreError`: the insert failed; the snapshot is kept
    pub async fn create(&self, collection: &str, fields: Document) -> Result<Document> {
        let conn = self.connections.acquire().await?;
        let schema = self.schemas.require(collection)?;
        schema.validate(&fields)?;
        let key = schema.key_of(&fields)?;

        if self.snapshot(&conn, schema).await?.contains_key(&key) {
            debug!("✗ Create {} '{}' rejected: key taken", collection, key);
            return Err(Error::duplicate_key(collection, key));
        }

        self.cache
            .write_through(collection, || {
                conn.store()
                    .insert(collection, schema.key_field(), fields.clone())
            })
            .await?;
        debug!("✓ Created {} '{}'", collection, key);
        Ok(fields)
    }

    /// Merge `fields` over the document keyed `key` and store the result.
    ///
    /// The merged document replaces the stored one entirely and is returned.
    /// `fields` may repeat the key but not change it.
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError`: malformed field, or an attempt to change the key
    /// - `Error::NotFound`: no document keyed `key`; nothing is written
    /// - `Error::StoreError`: the replace failed; the snapshot is kept
    pub async fn update(&self, collection: &str, key: &str, fields: Document) -> Result<Document> {
        let conn = self.connections.acquire().await?;
        let schema = self.schemas.require(collection)?;
        schema.validate_partial(&fields)?;
        if let Some(value) = fields.get(schema.key_field()) {
            if key_string(value).as_deref() != Some(key) {
                return Err(Error::ValidationError(format!(
                    "field '{}' cannot be changed from '{}' to {}",
                    schema.key_field(),
                    key,
                    value
                )));
            }
        }

        let snapshot = self.snapshot(&conn, schema).await?;
        let mut merged = snapshot
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(collection, key))?;
        merged.extend(fields);
        schema.validate(&merged)?;

        let replaced = self
            .cache
            .write_through(collection, || {
                conn.store()
                    .replace(collection, schema.key_field(), key, merged.clone())
            })
            .await?;
        if !replaced {
            debug!("✗ Update {} '{}': gone from store", collection, key);
            return Err(Error::not_found(collection, key));
        }

        debug!("✓ Updated {} '{}'", collection, key);
        Ok(merged)
    }

    /// Delete the document keyed `key`.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound`: no document keyed `key`; nothing is written
    /// - `Error::StoreError`: the delete failed; the snapshot is kept
    pub async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let conn = self.connections.acquire().await?;
        let schema = self.schemas.require(collection)?;

        if !self.snapshot(&conn, schema).await?.contains_key(key) {
            return Err(Error::not_found(collection, key));
        }

        let deleted = self
            .cache
            .write_through(collection, || {
                conn.store().delete(collection, schema.key_field(), key)
            })
            .await?;
        if !deleted {
            debug!("✗ Delete {} '{}': gone from store", collection, key);
            return Err(Error::not_found(collection, key));
        }

        debug!("✓ Deleted {} '{}'", collection, key);
        Ok(())
    }
}

/// Full fetch of one collection from the store.
async fn load_snapshot<S: DocumentStore>(store: &S, schema: &CollectionSchema) -> Result<Snapshot> {
    let docs = store.find_all(schema.collection()).await?;
    Snapshot::from_documents(schema.collection(), schema.key_field(), docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::schema::{CITIES, STATES};
    use crate::store::{InMemoryConnector, InMemoryStore, StoreCalls};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn repository(store: &InMemoryStore) -> EntityRepository<InMemoryConnector> {
        let manager = ConnectionManager::new(
            ConnectionConfig::default(),
            InMemoryConnector::new(store.clone()),
        );
        EntityRepository::new(Arc::new(manager), SnapshotCache::new())
    }

    async fn connected(store: &InMemoryStore) -> EntityRepository<InMemoryConnector> {
        let repo = repository(store);
        repo.connections().connect().await.expect("Failed to connect");
        store.reset_calls();
        repo
    }

    fn seed_cities(store: &InMemoryStore) {
        store.seed(
            CITIES,
            vec![
                doc(json!({"name": "Cary", "population": 180000, "state_code": "NC"})),
                doc(json!({"name": "Apex", "population": 100, "state_code": "NC"})),
                doc(json!({"name": "Austin", "population": 960000, "state_code": "TX"})),
            ],
        );
    }

    #[tokio::test]
    async fn test_fetch_all_is_ordered_and_cached() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;

        let cities = repo.fetch_all(CITIES, None).await.expect("Failed to fetch");
        let names: Vec<&str> = cities.iter().map(|c| c["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Apex", "Austin", "Cary"]);

        repo.fetch_all(CITIES, None).await.expect("Failed to fetch");
        assert_eq!(store.calls().find_all, 1);
    }

    #[tokio::test]
    async fn test_fetch_all_with_filter() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;

        let filter = Filter::new().equals("state_code", "NC").at_least("population", 1000.0);
        let cities = repo
            .fetch_all(CITIES, Some(&filter))
            .await
            .expect("Failed to fetch");

        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0]["name"], json!("Cary"));
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let store = InMemoryStore::new();
        let repo = connected(&store).await;

        assert!(repo.fetch_all(STATES, None).await.unwrap().is_empty());
        assert_eq!(repo.count(STATES).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_one_and_exists() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;

        let apex = repo.fetch_one(CITIES, "Apex").await.expect("Failed to fetch");
        assert_eq!(apex["population"], json!(100));
        assert!(repo.exists(CITIES, "Cary").await.unwrap());
        assert!(!repo.exists(CITIES, "Raleigh").await.unwrap());
        assert_eq!(
            repo.fetch_one(CITIES, "Raleigh").await.unwrap_err(),
            Error::not_found(CITIES, "Raleigh")
        );
    }

    #[tokio::test]
    async fn test_stored_document_without_key_is_store_error() {
        let store = InMemoryStore::new();
        store.seed(CITIES, vec![doc(json!({"population": 5}))]);
        let repo = connected(&store).await;

        assert!(matches!(
            repo.fetch_all(CITIES, None).await,
            Err(Error::StoreError(_))
        ));
        assert!(repo.cache().peek(CITIES).is_none());
    }

    #[tokio::test]
    async fn test_create_validates_before_store_access() {
        let store = InMemoryStore::new();
        let repo = connected(&store).await;

        let err = repo
            .create(CITIES, doc(json!({"name": "Apex", "population": "lots"})))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ValidationError(_)));
        assert_eq!(store.calls(), StoreCalls::default());
    }

    #[tokio::test]
    async fn test_create_duplicate_writes_nothing() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;

        let err = repo
            .create(CITIES, doc(json!({"name": "Apex", "population": 1})))
            .await
            .unwrap_err();

        assert_eq!(err, Error::duplicate_key(CITIES, "Apex"));
        assert_eq!(store.calls().writes(), 0);
        assert!(repo.cache().peek(CITIES).is_some());
    }

    #[tokio::test]
    async fn test_create_invalidates_snapshot() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;

        let created = repo
            .create(CITIES, doc(json!({"name": "Durham", "population": 290000})))
            .await
            .expect("Failed to create");
        assert_eq!(created["name"], json!("Durham"));
        assert!(repo.cache().peek(CITIES).is_none());

        assert_eq!(repo.count(CITIES).await.unwrap(), 4);
        assert_eq!(store.calls().find_all, 2);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;

        let updated = repo
            .update(CITIES, "Apex", doc(json!({"population": 150})))
            .await
            .expect("Failed to update");

        assert_eq!(updated["population"], json!(150));
        assert_eq!(updated["state_code"], json!("NC"));
        assert_eq!(
            repo.fetch_one(CITIES, "Apex").await.unwrap(),
            updated
        );
    }

    #[tokio::test]
    async fn test_update_cannot_change_key() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;

        let err = repo
            .update(CITIES, "Apex", doc(json!({"name": "Peak"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));

        repo.update(CITIES, "Apex", doc(json!({"name": "Apex", "population": 7})))
            .await
            .expect("Failed to update");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_key() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;

        assert_eq!(
            repo.update(CITIES, "Raleigh", doc(json!({"population": 1})))
                .await
                .unwrap_err(),
            Error::not_found(CITIES, "Raleigh")
        );
        assert_eq!(
            repo.delete(CITIES, "Raleigh").await.unwrap_err(),
            Error::not_found(CITIES, "Raleigh")
        );
        assert_eq!(store.calls().writes(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;

        repo.delete(CITIES, "Austin").await.expect("Failed to delete");

        assert!(!repo.exists(CITIES, "Austin").await.unwrap());
        assert_eq!(store.documents(CITIES).len(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_snapshot() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;
        repo.fetch_all(CITIES, None).await.expect("Failed to fetch");
        let before = repo.cache().peek(CITIES).expect("snapshot missing");

        store.set_available(false);
        let err = repo
            .create(CITIES, doc(json!({"name": "Durham", "population": 1})))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::StoreError(_)));
        let after = repo.cache().peek(CITIES).expect("snapshot dropped");
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = InMemoryStore::new();
        let repo = connected(&store).await;

        assert!(matches!(
            repo.fetch_all("planets", None).await,
            Err(Error::ValidationError(_))
        ));
        assert_eq!(store.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_every_operation_is_guarded() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = repository(&store);
        let apex = doc(json!({"name": "Apex", "population": 1}));

        assert_eq!(repo.fetch_all(CITIES, None).await.unwrap_err(), Error::NotConnected);
        assert_eq!(repo.fetch_one(CITIES, "Apex").await.unwrap_err(), Error::NotConnected);
        assert_eq!(repo.count(CITIES).await.unwrap_err(), Error::NotConnected);
        assert_eq!(repo.exists(CITIES, "Apex").await.unwrap_err(), Error::NotConnected);
        assert_eq!(repo.create(CITIES, apex.clone()).await.unwrap_err(), Error::NotConnected);
        assert_eq!(
            repo.update(CITIES, "Apex", apex).await.unwrap_err(),
            Error::NotConnected
        );
        assert_eq!(repo.delete(CITIES, "Apex").await.unwrap_err(), Error::NotConnected);

        assert_eq!(store.calls(), StoreCalls::default());
    }

    #[tokio::test]
    async fn test_bypass_leaves_cache_alone() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;

        let cities = repo
            .fetch_all_with(CITIES, None, CacheStrategy::Bypass)
            .await
            .expect("Failed to fetch");

        assert_eq!(cities.len(), 3);
        assert!(repo.cache().peek(CITIES).is_none());
    }

    #[tokio::test]
    async fn test_invalidate_strategy_refetches() {
        let store = InMemoryStore::new();
        seed_cities(&store);
        let repo = connected(&store).await;
        repo.fetch_all(CITIES, None).await.expect("Failed to fetch");

        store.seed(CITIES, vec![doc(json!({"name": "Apex", "population": 100}))]);
        assert_eq!(repo.fetch_all(CITIES, None).await.unwrap().len(), 3);

        let fresh = repo
            .fetch_all_with(CITIES, None, CacheStrategy::Invalidate)
            .await
            .expect("Failed to fetch");
        assert_eq!(fresh.len(), 1);
        assert_eq!(store.calls().find_all, 2);
    }
}
