//! Admin endpoint DTOs
//!
//! Defines the structure of the `/_offline/*` response bodies.

use serde::Serialize;

use crate::worker::StatsSnapshot;

/// Entry count of one named store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub name: String,
    pub entries: usize,
}

/// Response body for the stats endpoint (GET /_offline/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Lifecycle state of the worker
    pub state: String,
    /// Number of requests answered from a store
    pub hits: u64,
    /// Number of cacheable requests that went to the network
    pub misses: u64,
    /// Navigations answered with the shell or the offline page
    pub offline_fallbacks: u64,
    /// Background refreshes that overwrote a stored entry
    pub revalidations: u64,
    /// Entries removed from the media store
    pub evictions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Live stores and their sizes
    pub stores: Vec<StoreSummary>,
}

impl StatsResponse {
    /// Builds the response from a counter snapshot and the live stores.
    pub fn new(state: impl Into<String>, snapshot: StatsSnapshot, stores: Vec<StoreSummary>) -> Self {
        Self {
            state: state.into(),
            hits: snapshot.hits,
            misses: snapshot.misses,
            offline_fallbacks: snapshot.offline_fallbacks,
            revalidations: snapshot.revalidations,
            evictions: snapshot.evictions,
            hit_rate: snapshot.hit_rate(),
            stores,
        }
    }
}

/// Response body for the health endpoint (GET /_offline/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
