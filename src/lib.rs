//! # geodata-cache
//!
//! Data-access core for geographic entity collections (cities, states,
//! counties, countries) held in a document store.
//!
//! ## Features
//!
//! - **Read-Through Snapshots:** A collection is fetched whole on first read and served from memory afterwards
//! - **Write Invalidation:** Writes go to the store first; on success the snapshot is dropped, never patched
//! - **Coalescing:** Concurrent reads of an empty collection share one store fetch
//! - **Connection Guard:** Every store-touching operation fails fast with `NotConnected` when there is no connection
//! - **Generic Repository:** One CRUD surface driven by a declared field schema per collection
//! - **Store Agnostic:** Plug any driver in through [`DocumentStore`] and [`StoreConnector`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use geodata_cache::{ConnectionConfig, DataService, Filter};
//! use geodata_cache::store::InMemoryConnector;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> geodata_cache::Result<()> {
//!     // 1. Build the service once at startup
//!     let service = DataService::start(ConnectionConfig::from_env()?, InMemoryConnector::default()).await?;
//!     let repo = service.repository();
//!
//!     // 2. Writes are validated, then applied to the store
//!     let apex = json!({"name": "Apex", "population": 100, "state_code": "NC"});
//!     repo.create("cities", apex.as_object().cloned().unwrap()).await?;
//!
//!     // 3. Reads come from the collection snapshot
//!     let nc = Filter::new().equals("state_code", "NC");
//!     let cities = repo.fetch_all("cities", Some(&nc)).await?;
//!     assert_eq!(cities.len(), 1);
//!
//!     service.shutdown();
//!     Ok(())
//! }
//! ```

#[macro_use]
extern crate log;

pub mod cache;
pub mod config;
pub mod connection;
pub mod document;
pub mod error;
pub mod filter;
pub mod loader;
pub mod observability;
pub mod repository;
pub mod schema;
pub mod service;
pub mod store;
pub mod strategy;

// Re-exports for convenience
pub use cache::{CacheStats, SnapshotCache};
pub use config::{ConnectionConfig, ConnectionTarget};
pub use connection::{Connection, ConnectionManager};
pub use document::{Document, Snapshot};
pub use error::{Error, ErrorSignal, Result};
pub use filter::Filter;
pub use repository::EntityRepository;
pub use schema::{CollectionSchema, SchemaRegistry};
pub use service::DataService;
pub use store::{DocumentStore, StoreConnector};
pub use strategy::CacheStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
