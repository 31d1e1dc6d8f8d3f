//! Metrics hooks for snapshot cache operations.
//!
//! Implement [`CacheMetrics`] to forward cache events to a monitoring
//! system:
//!
//! ```ignore
//! use geodata_cache::observability::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _collection: &str, _duration: Duration) {
//!         // counter!("snapshot_hits").inc();
//!     }
//!     // ... implement other methods
//! }
//!
//! // let cache = SnapshotCache::new().with_metrics(Box::new(PrometheusMetrics));
//! ```
//!
//! Every method has a default body that logs through the `log` crate, so
//! [`LogMetrics`] gets debug-level tracing for free. [`NoOpMetrics`] is the
//! cache default and discards everything.

use std::time::Duration;

/// Trait for snapshot cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// A read was served from an existing snapshot.
    fn record_hit(&self, collection: &str, duration: Duration) {
        debug!("Snapshot HIT: {} took {:?}", collection, duration);
    }

    /// A read found no snapshot and waited for a fill.
    fn record_miss(&self, collection: &str, duration: Duration) {
        debug!("Snapshot MISS: {} took {:?}", collection, duration);
    }

    /// A full fetch from the store populated a snapshot.
    fn record_fill(&self, collection: &str, documents: usize, duration: Duration) {
        debug!(
            "Snapshot FILL: {} ({} docs) took {:?}",
            collection, documents, duration
        );
    }

    /// A snapshot was dropped.
    fn record_invalidate(&self, collection: &str) {
        debug!("Snapshot INVALIDATE: {}", collection);
    }

    /// A fill or a write-through failed.
    fn record_error(&self, collection: &str, error: &str) {
        warn!("Snapshot ERROR for {}: {}", collection, error);
    }
}

/// Metrics implementation that only logs (the trait defaults).
#[derive(Clone, Default)]
pub struct LogMetrics;

impl CacheMetrics for LogMetrics {}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _collection: &str, _duration: Duration) {}
    fn record_miss(&self, _collection: &str, _duration: Duration) {}
    fn record_fill(&self, _collection: &str, _documents: usize, _duration: Duration) {}
    fn record_invalidate(&self, _collection: &str) {}
    fn record_error(&self, _collection: &str, _error: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_noop_metrics() {
        let metrics = NoOpMetrics;
        metrics.record_hit("cities", Duration::from_secs(1));
        metrics.record_miss("cities", Duration::from_secs(2));
        metrics.record_error("cities", "boom");
    }

    #[test]
    fn test_log_metrics_uses_defaults() {
        let metrics = LogMetrics;
        metrics.record_fill("cities", 3, Duration::from_millis(5));
        metrics.record_invalidate("cities");
    }

    #[test]
    fn test_custom_metrics_override() {
        #[derive(Default)]
        struct Counting {
            hits: AtomicUsize,
        }

        impl CacheMetrics for Counting {
            fn record_hit(&self, _collection: &str, _duration: Duration) {
                self.hits.fetch_add(1, Ordering::SeqCst);
            }
        }

        let metrics = Counting::default();
        metrics.record_hit("states", Duration::ZERO);
        metrics.record_hit("states", Duration::ZERO);
        metrics.record_miss("states", Duration::ZERO);

        assert_eq!(metrics.hits.load(Ordering::SeqCst), 2);
    }
}
