//! Document store boundary.
//!
//! The cache and repository never talk to a database driver directly; they
//! go through [`DocumentStore`]. A driver binding implements this trait (and
//! [`StoreConnector`] to open it), which keeps the data-access layer
//! independent of any particular client library and makes it testable
//! against [`InMemoryStore`].

use crate::config::{ConnectionConfig, ConnectionTarget};
use crate::document::Document;
use crate::error::Result;

pub mod inmemory;

pub use inmemory::{InMemoryConnector, InMemoryStore, StoreCalls};

/// Operations the data-access layer needs from a document store.
///
/// **IMPORTANT:** All methods take `&self`; implementations share their
/// client handle internally and must be safe to call concurrently.
///
/// Key-addressed methods receive both the key field name and the key value
/// so the store can build its own filter (e.g. `{ key_field: key }`).
///
/// Every failure is reported as `Err`; implementations must not retry on
/// behalf of the caller.
#[allow(async_fn_in_trait)]
pub trait DocumentStore: Send + Sync + Clone {
    /// Every document in `collection`. A collection that does not exist
    /// yields an empty vector, not an error.
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// The document whose `key_field` equals `key`, if any.
    async fn find_one(&self, collection: &str, key_field: &str, key: &str)
        -> Result<Option<Document>>;

    /// Insert a new document whose primary key lives in `key_field`.
    ///
    /// The uniqueness check and the write must be atomic with respect to
    /// other inserts into the same collection.
    ///
    /// # Errors
    ///
    /// `Error::DuplicateKey` if a document with the same key already exists.
    async fn insert(&self, collection: &str, key_field: &str, doc: Document) -> Result<()>;

    /// Replace the document keyed `key`. Returns `false` if none matched.
    async fn replace(
        &self,
        collection: &str,
        key_field: &str,
        key: &str,
        doc: Document,
    ) -> Result<bool>;

    /// Delete the document keyed `key`. Returns `false` if none matched.
    async fn delete(&self, collection: &str, key_field: &str, key: &str) -> Result<bool>;

    /// Round-trip check used once when connecting.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Opens a [`DocumentStore`] for a resolved target and database.
#[allow(async_fn_in_trait)]
pub trait StoreConnector: Send + Sync {
    type Store: DocumentStore;

    /// Open a client for `database` at `target`.
    ///
    /// `config` carries driver settings such as the server-selection timeout.
    async fn connect(
        &self,
        target: &ConnectionTarget,
        database: &str,
        config: &ConnectionConfig,
    ) -> Result<Self::Store>;
}
