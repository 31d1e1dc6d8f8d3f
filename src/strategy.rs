//! Read strategies for collection listings.
//!
//! Listing reads go through the snapshot cache by default. A caller that
//! knows better can ask for a different path:
//!
//! ```
//! use geodata_cache::strategy::CacheStrategy;
//!
//! // Cached snapshot, filled from the store on a miss (default)
//! let _s = CacheStrategy::Refresh;
//!
//! // Drop the snapshot first, then read through
//! let _s = CacheStrategy::Invalidate;
//!
//! // Read the store directly, leave the cache alone
//! let _s = CacheStrategy::Bypass;
//! ```
//!
//! | Strategy | Snapshot present | Snapshot absent | Cache afterwards |
//! |----------|------------------|-----------------|------------------|
//! | **Refresh** | Served | Store fetch | Holds snapshot |
//! | **Invalidate** | Dropped, store fetch | Store fetch | Holds fresh snapshot |
//! | **Bypass** | Ignored, store fetch | Store fetch | Unchanged |

/// Strategy enum controlling how a listing read uses the snapshot cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheStrategy {
    /// **Refresh**: Serve the cached snapshot, fetching it on a miss.
    ///
    /// Flow:
    /// 1. Check cache
    /// 2. If hit: return cached snapshot
    /// 3. If miss: fetch the whole collection, store it, return it
    #[default]
    Refresh,

    /// **Invalidate**: Drop the snapshot and read through.
    ///
    /// Use when: The store was changed behind the cache's back (bulk
    /// imports, another process).
    Invalidate,

    /// **Bypass**: Fetch from the store without touching the cache.
    ///
    /// Use when: Diagnosing cache behaviour or reading for an export that
    /// must reflect the store exactly.
    Bypass,
}

impl std::fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheStrategy::Refresh => write!(f, "Refresh"),
            CacheStrategy::Invalidate => write!(f, "Invalidate"),
            CacheStrategy::Bypass => write!(f, "Bypass"),
        }
    }
}
