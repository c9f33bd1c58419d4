//! Worker Statistics Module
//!
//! Tracks dispatch outcomes: hits, misses, offline fallbacks, revalidations and evictions.
//! Counters are atomic because fetch dispatches run concurrently.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Worker Stats ==
/// Live counters shared by all in-flight dispatches.
#[derive(Debug, Default)]
pub struct WorkerStats {
    hits: AtomicU64,
    misses: AtomicU64,
    offline_fallbacks: AtomicU64,
    revalidations: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Requests answered from a store
    pub hits: u64,
    /// Cacheable requests that had to go to the network
    pub misses: u64,
    /// Navigations answered with the shell or the offline page
    pub offline_fallbacks: u64,
    /// Background refreshes that overwrote an entry
    pub revalidations: u64,
    /// Entries removed by pruning
    pub evictions: u64,
}

impl WorkerStats {
    // == Constructor ==
    /// Creates a new WorkerStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_offline_fallback(&self) {
        self.offline_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_revalidation(&self) {
        self.revalidations.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Evictions ==
    /// Adds the number of entries removed by one prune.
    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Reads all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            offline_fallbacks: self.offline_fallbacks.load(Ordering::Relaxed),
            revalidations: self.revalidations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
