//! Read-through snapshot cache with write invalidation.
//!
//! The cache maps a collection name to the last full [`Snapshot`] fetched
//! from the store:
//!
//! - [`SnapshotCache::read`] serves the snapshot if present, otherwise runs
//!   the supplied fetch, stores the result and returns it. Concurrent reads
//!   of an empty collection share one in-flight fetch.
//! - [`SnapshotCache::write_through`] runs a store mutation and, only if it
//!   succeeded, drops the snapshot so the next read repopulates from the
//!   store.
//! - [`SnapshotCache::invalidate`] drops a snapshot unconditionally.
//!
//! Snapshots are never patched in place. Each collection slot is a
//! `tokio::sync::OnceCell`: a fill publishes a complete snapshot or nothing,
//! and invalidation swaps the whole slot out, so a fill that was started
//! before an invalidation is never visible to reads issued after it.

use crate::document::Snapshot;
use crate::error::Result;
use crate::observability::{CacheMetrics, NoOpMetrics};
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<Snapshot>>>;

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    invalidations: AtomicU64,
    fill_errors: AtomicU64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from an existing snapshot.
    pub hits: u64,
    /// Reads that ran a fetch themselves.
    pub misses: u64,
    /// Reads that waited on another caller's fetch.
    pub coalesced: u64,
    /// Calls to `invalidate` (including those made by `write_through`).
    pub invalidations: u64,
    /// Fetches that failed.
    pub fill_errors: u64,
    /// Collections currently holding a snapshot.
    pub cached_collections: usize,
}

/// Shared snapshot cache.
///
/// Cheap to clone: clones share the same slots, counters and metrics.
/// One instance is meant to be shared by every request handler in the
/// process and passed explicitly to the repository.
///
/// # Example
///
/// ```no_run
/// use geodata_cache::cache::SnapshotCache;
/// use geodata_cache::document::Snapshot;
///
/// #[tokio::main]
/// async fn main() -> geodata_cache::Result<()> {
///     let cache = SnapshotCache::new();
///
///     let snapshot = cache
///         .read("cities", || async { Ok(Snapshot::empty("cities", "name")) })
///         .await?;
///     assert!(snapshot.is_empty());
///
///     cache.invalidate("cities");
///     assert!(cache.peek("cities").is_none());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct SnapshotCache {
    slots: Arc<DashMap<String, Slot>>,
    counters: Arc<Counters>,
    metrics: Arc<dyn CacheMetrics>,
}

impl SnapshotCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        SnapshotCache {
            slots: Arc::new(DashMap::new()),
            counters: Arc::new(Counters::default()),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = Arc::from(metrics);
        self
    }

    /// Current slot for `collection`, created empty if absent.
    fn slot(&self, collection: &str) -> Slot {
        if let Some(slot) = self.slots.get(collection) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.slots
                .entry(collection.to_string())
                .or_default()
                .value(),
        )
    }

    /// Return the snapshot for `collection`, fetching it on a miss.
    ///
    /// `fetch` runs at most once per empty slot no matter how many callers
    /// race on it; the others wait for its result. A failed fetch caches
    /// nothing and its error is returned to the caller that ran it. Callers
    /// that were waiting then make their own attempt.
    ///
    /// # Errors
    ///
    /// Whatever `fetch` returns, untouched.
    pub async fn read<F, Fut>(&self, collection: &str, fetch: F) -> Result<Arc<Snapshot>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Snapshot>>,
    {
        let timer = Instant::now();
        let slot = self.slot(collection);

        if let Some(snapshot) = slot.get() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_hit(collection, timer.elapsed());
            debug!("✓ Snapshot {} -> HIT", collection);
            return Ok(Arc::clone(snapshot));
        }

        let mut filled = false;
        let result = slot
            .get_or_try_init(|| {
                filled = true;
                debug!("Snapshot {} -> MISS, fetching from store", collection);
                async move { fetch().await.map(Arc::new) }
            })
            .await;

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::clone(snapshot);
                self.metrics.record_miss(collection, timer.elapsed());
                if filled {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    self.metrics
                        .record_fill(collection, snapshot.len(), timer.elapsed());
                    debug!(
                        "✓ Snapshot {} filled with {} docs in {:?}",
                        collection,
                        snapshot.len(),
                        timer.elapsed()
                    );
                } else {
                    self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!("✓ Snapshot {} -> joined in-flight fetch", collection);
                }
                Ok(snapshot)
            }
            Err(e) => {
                if filled {
                    self.counters.fill_errors.fetch_add(1, Ordering::Relaxed);
                }
                self.metrics.record_error(collection, &e.to_string());
                Err(e)
            }
        }
    }

    /// Snapshot for `collection` if one is cached. Never fetches.
    pub fn peek(&self, collection: &str) -> Option<Arc<Snapshot>> {
        self.slots
            .get(collection)
            .and_then(|slot| slot.get().cloned())
    }

    /// Drop the snapshot for `collection`.
    ///
    /// Idempotent. Returns whether a populated snapshot was dropped.
    pub fn invalidate(&self, collection: &str) -> bool {
        let dropped = self
            .slots
            .remove(collection)
            .is_some_and(|(_, slot)| slot.initialized());

        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_invalidate(collection);
        debug!(
            "✓ Snapshot {} invalidated{}",
            collection,
            if dropped { "" } else { " (was empty)" }
        );
        dropped
    }

    /// Apply `mutation` to the store, then invalidate `collection`.
    ///
    /// The snapshot is dropped only after the mutation succeeded and before
    /// this method returns, so any read issued after a successful return
    /// fetches state that includes the write. On failure the cache is left
    /// exactly as it was and the store's error is returned.
    ///
    /// # Errors
    ///
    /// Whatever `mutation` returns, untouched.
    pub async fn write_through<T, F, Fut>(&self, collection: &str, mutation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match mutation().await {
            Ok(value) => {
                self.invalidate(collection);
                Ok(value)
            }
            Err(e) => {
                self.metrics.record_error(collection, &e.to_string());
                debug!("✗ Write to {} failed, snapshot kept: {}", collection, e);
                Err(e)
            }
        }
    }

    /// Drop every snapshot.
    pub fn clear_all(&self) {
        let count = self.slots.len();
        self.slots.clear();
        warn!("⚠ Snapshot CLEAR_ALL executed - {} slots dropped", count);
    }

    /// Names of collections currently holding a snapshot, sorted.
    pub fn cached_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Point-in-time counters and the number of cached collections.
    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            coalesced: c.coalesced.load(Ordering::Relaxed),
            invalidations: c.invalidations.load(Ordering::Relaxed),
            fill_errors: c.fill_errors.load(Ordering::Relaxed),
            cached_collections: self.cached_collections().len(),
        }
    }

    /// Print cache statistics to debug log.
    pub fn log_stats(&self) {
        let stats = self.stats();
        debug!(
            "Snapshot Stats: {} collections, {} hits, {} misses, {} coalesced, {} invalidations, {} fill errors",
            stats.cached_collections,
            stats.hits,
            stats.misses,
            stats.coalesced,
            stats.invalidations,
            stats.fill_errors
        );
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("collections", &self.cached_collections())
            .finish()
    }
}
