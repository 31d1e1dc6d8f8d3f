//! Connection manager for the document store.
//!
//! Owns the single live connection to one logical database and exposes the
//! guard every store-touching operation goes through. There is no
//! background reconnect loop: a failed connect is reported once, and
//! guarded operations keep failing with `Error::NotConnected` until
//! [`ConnectionManager::connect`] or [`ConnectionManager::reconnect`] is
//! called explicitly.

use crate::config::{ConnectionConfig, ConnectionTarget};
use crate::error::{Error, Result};
use crate::store::{DocumentStore, StoreConnector};
use arc_swap::ArcSwapOption;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A live handle to one database.
pub struct Connection<S> {
    target: ConnectionTarget,
    database: String,
    store: S,
}

impl<S: DocumentStore> Connection<S> {
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Store client for this connection.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("target", &self.target)
            .field("database", &self.database)
            .finish()
    }
}

/// Owner of the connection lifecycle for one logical database.
///
/// `is_connected` is a lock-free pointer load. Connecting is serialized so
/// concurrent callers never open more than one connection.
///
/// # Example
///
/// ```no_run
/// use geodata_cache::config::ConnectionConfig;
/// use geodata_cache::connection::ConnectionManager;
/// use geodata_cache::store::InMemoryConnector;
///
/// #[tokio::main]
/// async fn main() -> geodata_cache::Result<()> {
///     let manager = ConnectionManager::new(ConnectionConfig::default(), InMemoryConnector::default());
///     assert!(!manager.is_connected());
///
///     manager.connect().await?;
///     assert!(manager.is_connected());
///     Ok(())
/// }
/// ```
pub struct ConnectionManager<C: StoreConnector> {
    config: ConnectionConfig,
    connector: C,
    current: ArcSwapOption<Connection<C::Store>>,
    connect_lock: Mutex<()>,
    attempted: AtomicBool,
}

impl<C: StoreConnector> ConnectionManager<C> {
    /// Create a disconnected manager.
    pub fn new(config: ConnectionConfig, connector: C) -> Self {
        ConnectionManager {
            config,
            connector,
            current: ArcSwapOption::empty(),
            connect_lock: Mutex::new(()),
            attempted: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Open the connection, or return the existing one.
    ///
    /// # Errors
    ///
    /// - `Error::ConfigError`: the target cannot be resolved
    /// - `Error::StoreError`: the connector or the initial ping failed
    ///
    /// The manager stays disconnected on error.
    pub async fn connect(&self) -> Result<Arc<Connection<C::Store>>> {
        if let Some(conn) = self.current.load_full() {
            return Ok(conn);
        }

        let _guard = self.connect_lock.lock().await;
        if let Some(conn) = self.current.load_full() {
            return Ok(conn);
        }
        self.open().await
    }

    /// Must be called with `connect_lock` held.
    async fn open(&self) -> Result<Arc<Connection<C::Store>>> {
        self.attempted.store(true, Ordering::SeqCst);

        let target = self.config.target().map_err(|e| {
            error!("✗ Cannot resolve connection target: {}", e);
            e
        })?;
        info!(
            "Connecting to {} database '{}'...",
            target, self.config.database
        );

        let store = self
            .connector
            .connect(&target, &self.config.database, &self.config)
            .await
            .map_err(|e| {
                error!("✗ Connection to {} failed: {}", target, e);
                e
            })?;

        if let Err(e) = store.ping().await {
            error!("✗ Ping to {} failed: {}", target, e);
            return Err(match e {
                Error::StoreError(_) => e,
                other => Error::StoreError(format!("ping failed: {}", other)),
            });
        }

        let conn = Arc::new(Connection {
            target,
            database: self.config.database.clone(),
            store,
        });
        self.current.store(Some(Arc::clone(&conn)));
        info!("✓ Connected to {} database '{}'", conn.target, conn.database);
        Ok(conn)
    }

    /// Whether a connection handle currently exists. No round-trip.
    pub fn is_connected(&self) -> bool {
        self.current.load().is_some()
    }

    /// The connection guard.
    ///
    /// Returns the live connection, or `Error::NotConnected` without
    /// touching the store. With `connect_on_first_use` enabled, the very
    /// first call on a manager that never tried to connect makes one
    /// attempt; if that fails it is not repeated.
    pub async fn acquire(&self) -> Result<Arc<Connection<C::Store>>> {
        if let Some(conn) = self.current.load_full() {
            return Ok(conn);
        }

        if self.config.connect_on_first_use && !self.attempted.load(Ordering::SeqCst) {
            let _guard = self.connect_lock.lock().await;
            if let Some(conn) = self.current.load_full() {
                return Ok(conn);
            }
            if !self.attempted.load(Ordering::SeqCst) {
                match self.open().await {
                    Ok(conn) => return Ok(conn),
                    Err(e) => warn!("⚠ First-use connect failed: {}", e),
                }
            }
        }

        debug!("✗ Guard rejected operation: not connected");
        Err(Error::NotConnected)
    }

    /// Run `op` with the live connection, failing fast if there is none.
    pub async fn guarded<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Arc<Connection<C::Store>>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let conn = self.acquire().await?;
        op(conn).await
    }

    /// Drop the connection handle. Returns whether one existed.
    pub fn disconnect(&self) -> bool {
        match self.current.swap(None) {
            Some(conn) => {
                info!("Disconnected from {}", conn.target);
                true
            }
            None => false,
        }
    }

    /// Drop any existing connection and open a new one.
    pub async fn reconnect(&self) -> Result<Arc<Connection<C::Store>>> {
        let _guard = self.connect_lock.lock().await;
        self.current.store(None);
        self.open().await
    }
}

impl<C: StoreConnector> fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("database", &self.config.database)
            .field("connected", &self.is_connected())
            .finish()
    }
}
