//! Process-wide service bundle for request handlers.
//!
//! Builds the connection manager, snapshot cache and repository once at
//! startup and hands out a cheap-to-clone handle. There is no global state:
//! handlers receive the `DataService` (or its repository) explicitly.

use crate::cache::SnapshotCache;
use crate::config::ConnectionConfig;
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::observability::CacheMetrics;
use crate::repository::EntityRepository;
use crate::schema::SchemaRegistry;
use crate::store::StoreConnector;
use std::sync::Arc;

/// Connection, cache and repository for one logical database.
///
/// # Example
///
/// ```no_run
/// use geodata_cache::config::ConnectionConfig;
/// use geodata_cache::service::DataService;
/// use geodata_cache::store::InMemoryConnector;
///
/// #[tokio::main]
/// async fn main() -> geodata_cache::Result<()> {
///     let service = DataService::start(ConnectionConfig::from_env()?, InMemoryConnector::default()).await?;
///
///     let cities = service.repository().fetch_all("cities", None).await?;
///     println!("{} cities", cities.len());
///
///     service.shutdown();
///     Ok(())
/// }
/// ```
pub struct DataService<C: StoreConnector> {
    repository: EntityRepository<C>,
}

impl<C: StoreConnector> Clone for DataService<C> {
    fn clone(&self) -> Self {
        DataService {
            repository: self.repository.clone(),
        }
    }
}

impl<C: StoreConnector> DataService<C> {
    /// Build the service and connect.
    ///
    /// With `connect_on_first_use` set, the connection is left to the first
    /// guarded operation instead.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` or `Error::StoreError` from the initial connect.
    pub async fn start(config: ConnectionConfig, connector: C) -> Result<Self> {
        Self::start_with(config, connector, SnapshotCache::new()).await
    }

    /// Build the service with a custom metrics handler on the cache.
    pub async fn with_metrics(
        config: ConnectionConfig,
        connector: C,
        metrics: Box<dyn CacheMetrics>,
    ) -> Result<Self> {
        Self::start_with(config, connector, SnapshotCache::new().with_metrics(metrics)).await
    }

    async fn start_with(
        config: ConnectionConfig,
        connector: C,
        cache: SnapshotCache,
    ) -> Result<Self> {
        let lazy = config.connect_on_first_use;
        let connections = Arc::new(ConnectionManager::new(config, connector));
        if lazy {
            info!("Connection deferred until first use");
        } else {
            connections.connect().await?;
        }

        Ok(DataService {
            repository: EntityRepository::new(connections, cache),
        })
    }

    /// Replace the schema registry of the repository.
    pub fn with_schemas(self, schemas: SchemaRegistry) -> Self {
        DataService {
            repository: self.repository.with_schemas(schemas),
        }
    }

    pub fn repository(&self) -> &EntityRepository<C> {
        &self.repository
    }

    pub fn cache(&self) -> &SnapshotCache {
        self.repository.cache()
    }

    pub fn connections(&self) -> &ConnectionManager<C> {
        self.repository.connections()
    }

    /// Disconnect and drop every snapshot.
    pub fn shutdown(&self) {
        self.cache().log_stats();
        self.connections().disconnect();
        self.cache().clear_all();
        info!("✓ Data service shut down");
    }
}
