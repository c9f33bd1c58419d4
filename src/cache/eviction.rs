//! Eviction Policy
//!
//! Bounds a named store to a maximum entry count by removing the oldest
//! entries first. "Oldest" is the store's enumeration order; stores that do
//! not enumerate in write order only get an approximation.

use tracing::{debug, warn};

use crate::cache::CacheStorage;

/// Trims the store called `name` down to `max_entries`.
///
/// Returns the number of entries removed. Never fails: any store error ends
/// this round early and the next write or activation tries again.
pub async fn prune(storage: &dyn CacheStorage, name: &str, max_entries: usize) -> usize {
    let cache = match storage.open(name).await {
        Ok(cache) => cache,
        Err(e) => {
            warn!(store = name, error = %e, "prune skipped: open failed");
            return 0;
        }
    };

    let keys = match cache.keys().await {
        Ok(keys) => keys,
        Err(e) => {
            warn!(store = name, error = %e, "prune skipped: enumeration failed");
            return 0;
        }
    };

    let excess = keys.len().saturating_sub(max_entries);
    if excess == 0 {
        debug!(store = name, entries = keys.len(), "prune: within bound");
        return 0;
    }

    let mut removed = 0;
    for key in keys.iter().take(excess) {
        match cache.delete(key).await {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(store = name, key = %key, error = %e, "prune stopped: delete failed");
                break;
            }
        }
    }

    debug!(store = name, removed, max_entries, "prune complete");
    removed
}
