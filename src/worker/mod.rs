//! Lifecycle Controller
//!
//! The worker owns the caching policy. The host drives it with three events:
//! `install` once, `activate` once, then `handle_fetch` for every
//! intercepted request, concurrently. A host that starts offline can
//! `restore` a generation left in persistent storage instead.
//!
//! ```text
//! installing ──install──▶ installed ──activate──▶ active ──▶ handle_fetch*
//!      │  │                                          ▲
//!      │  └──────────────restore─────────────────────┘
//!      └─(manifest failure)─▶ redundant
//! ```

pub mod classify;
mod dispatch;
pub mod headers;
mod lifecycle;
pub mod precache;
pub mod range;
mod stats;


use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::{CacheStorage, MemoryStorage};
use crate::config::Config;
use crate::error::{Result, WorkerError};
use crate::fetch::Fetcher;
use crate::models::StoreSummary;
use crate::tasks::BackgroundTasks;

pub use classify::{classify, RouteCategory};
pub use lifecycle::InstallReport;
pub use stats::{StatsSnapshot, WorkerStats};

/// Lifecycle states. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Fresh instance, manifest not yet written
    Installing,
    /// Manifest written, waiting to take over
    Installed,
    /// Serving fetches
    Active,
    /// Install failed; this instance never serves
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Installing => write!(f, "installing"),
            LifecycleState::Installed => write!(f, "installed"),
            LifecycleState::Active => write!(f, "active"),
            LifecycleState::Redundant => write!(f, "redundant"),
        }
    }
}

// == Worker ==
/// One running instance of the offline cache.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Worker {
    inner: Arc<WorkerInner>,
}

struct WorkerInner {
    config: Arc<Config>,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<LifecycleState>,
    stats: WorkerStats,
    background: BackgroundTasks,
}

impl Worker {
    // == Constructor ==
    /// Creates a worker in the `Installing` state.
    pub fn new(
        config: Arc<Config>,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            inner: Arc::new(WorkerInner {
                config,
                storage,
                fetcher,
                state: RwLock::new(LifecycleState::Installing),
                stats: WorkerStats::new(),
                background: BackgroundTasks::new(),
            }),
        }
    }

    /// Creates a worker backed by a fresh in-memory store.
    pub fn with_memory_storage(config: Arc<Config>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::new(config, Arc::new(MemoryStorage::new()), fetcher)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.inner.storage
    }

    /// The network the worker fetches through. The host uses it for
    /// requests the worker declines.
    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.inner.fetcher
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub async fn state(&self) -> LifecycleState {
        *self.inner.state.read().await
    }

    /// Waits for all detached revalidation and pruning to finish.
    pub async fn drain_background(&self) -> usize {
        self.inner.background.drain().await
    }

    // == Store Summaries ==
    /// Names and sizes of every store currently present.
    pub async fn store_summaries(&self) -> Vec<StoreSummary> {
        let names = match self.inner.storage.keys().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("listing stores failed: {}", e);
                return Vec::new();
            }
        };

        let mut summaries = Vec::with_capacity(names.len());
        for name in names {
            let entries = match self.inner.storage.open(&name).await {
                Ok(cache) => cache.keys().await.map(|k| k.len()).unwrap_or(0),
                Err(_) => 0,
            };
            summaries.push(StoreSummary { name, entries });
        }
        summaries
    }

    async fn expect_state(&self, expected: LifecycleState) -> Result<()> {
        let actual = self.state().await;
        if actual != expected {
            return Err(WorkerError::InvalidState { expected, actual });
        }
        Ok(())
    }

    async fn set_state(&self, next: LifecycleState) {
        *self.inner.state.write().await = next;
    }
}
