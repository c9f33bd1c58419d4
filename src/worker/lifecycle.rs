//! Install and activate.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use super::headers::rewrite_for_storage;
use super::precache::{discover, is_precache_candidate};
use super::{LifecycleState, Worker};
use crate::cache::Cache;
use crate::error::{Result, WorkerError};
use crate::models::{FetchRequest, FetchResponse};

/// What install wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallReport {
    /// Shell resources written in the manifest batch
    pub manifest_entries: usize,
    /// Assets discovered in the shell and stored
    pub precached: usize,
}

impl Worker {
    // == Install ==
    /// Writes the shell manifest into the live asset store, then
    /// opportunistically precaches assets referenced by the root document.
    ///
    /// The manifest is all-or-nothing: if any entry cannot be fetched
    /// successfully or written, nothing more happens, the instance becomes
    /// `Redundant` and the error is returned. Precaching never fails install.
    pub async fn install(&self) -> Result<InstallReport> {
        self.expect_state(LifecycleState::Installing).await?;
        info!("Installing generation {}", self.config().asset_store_name());

        let cache = match self.write_manifest().await {
            Ok(cache) => cache,
            Err(e) => {
                self.set_state(LifecycleState::Redundant).await;
                warn!("Install failed: {}", e);
                return Err(e);
            }
        };
        let manifest_entries = self.config().manifest_urls().len();

        let precached = self.precache(cache.as_ref()).await;

        self.set_state(LifecycleState::Installed).await;
        info!(
            "Install complete: {} manifest entries, {} precached assets",
            manifest_entries, precached
        );

        Ok(InstallReport {
            manifest_entries,
            precached,
        })
    }

    async fn write_manifest(&self) -> Result<Arc<dyn Cache>> {
        let cache = self.inner.storage.open(&self.config().asset_store_name()).await?;
        let urls = self.config().manifest_urls();

        // Fetch everything first so a failure leaves the store untouched.
        let fetches = urls.iter().map(|url| async move {
            let response = self.inner.fetcher.fetch(&FetchRequest::get(url.as_str())).await?;
            if !response.is_success() {
                return Err(WorkerError::InstallFailed(format!(
                    "{} returned {}",
                    url,
                    response.status.as_u16()
                )));
            }
            Ok((url.as_str(), response))
        });
        let fetched = join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<(&str, FetchResponse)>>>()
            .map_err(|e| match e {
                WorkerError::InstallFailed(_) => e,
                other => WorkerError::InstallFailed(other.to_string()),
            })?;

        for (url, response) in fetched {
            cache
                .put(url, response)
                .await
                .map_err(|e| WorkerError::InstallFailed(e.to_string()))?;
        }
        Ok(cache)
    }

    /// Best-effort: returns how many discovered assets were stored.
    async fn precache(&self, cache: &dyn Cache) -> usize {
        let root = self.config().scoped_url("");
        let shell = match self.inner.fetcher.fetch(&FetchRequest::get(root.as_str()).fresh()).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                debug!("Precache skipped: root document returned {}", response.status.as_u16());
                return 0;
            }
            Err(e) => {
                debug!("Precache skipped: {}", e);
                return 0;
            }
        };
        let html = String::from_utf8_lossy(&shell.body);

        let candidates: Vec<String> = discover(self.config(), &html)
            .filter(is_precache_candidate)
            .map(String::from)
            .collect();
        debug!("Precaching {} discovered assets", candidates.len());

        let stores = candidates.iter().map(|url| async move {
            let response = match self.inner.fetcher.fetch(&FetchRequest::get(url.as_str())).await {
                Ok(response) if response.is_success() => response,
                Ok(response) => {
                    debug!("Precache {} skipped: status {}", url, response.status.as_u16());
                    return false;
                }
                Err(e) => {
                    debug!("Precache {} skipped: {}", url, e);
                    return false;
                }
            };
            match cache.put(url, rewrite_for_storage(&response)).await {
                Ok(()) => true,
                Err(e) => {
                    debug!("Precache {} not stored: {}", url, e);
                    false
                }
            }
        });

        join_all(stores).await.into_iter().filter(|stored| *stored).count()
    }

    // == Activate ==
    /// Deletes every store that does not belong to the live generation,
    /// takes over serving, then prunes the media store in the background.
    ///
    /// Returns the names of the deleted stores.
    pub async fn activate(&self) -> Result<Vec<String>> {
        self.expect_state(LifecycleState::Installed).await?;

        let deleted = self.retire_stale_stores().await;
        self.take_over().await;
        Ok(deleted)
    }

    // == Restore ==
    /// Resumes serving a generation an earlier process installed into
    /// persistent storage, without touching the network.
    ///
    /// Only valid on a fresh instance. Returns `false`, leaving the instance
    /// in `Installing`, when the live asset store is absent or lacks the
    /// shell document.
    pub async fn restore(&self) -> Result<bool> {
        self.expect_state(LifecycleState::Installing).await?;

        let name = self.config().asset_store_name();
        if !self.inner.storage.has(&name).await? {
            info!("No stored generation {} to restore", name);
            return Ok(false);
        }
        let cache = self.inner.storage.open(&name).await?;
        if cache.get(&self.config().fallback_url()).await?.is_none() {
            warn!("Stored generation {} has no shell; not restoring", name);
            return Ok(false);
        }

        self.retire_stale_stores().await;
        self.take_over().await;
        Ok(true)
    }

    async fn retire_stale_stores(&self) -> Vec<String> {
        let keep = [
            self.config().asset_store_name(),
            self.config().media_store_name(),
        ];
        let mut deleted = Vec::new();

        match self.inner.storage.keys().await {
            Ok(names) => {
                for name in names.into_iter().filter(|name| !keep.contains(name)) {
                    match self.inner.storage.delete(&name).await {
                        Ok(_) => {
                            info!("Deleted stale store {}", name);
                            deleted.push(name);
                        }
                        Err(e) => warn!("Failed to delete stale store {}: {}", name, e),
                    }
                }
            }
            Err(e) => warn!("Stale store cleanup skipped: {}", e),
        }
        deleted
    }

    async fn take_over(&self) {
        self.set_state(LifecycleState::Active).await;
        info!(
            "Activated generation {}; serving all clients",
            self.config().asset_store_name()
        );

        // A previous generation may have run with a larger bound.
        self.schedule_prune();
    }
}
