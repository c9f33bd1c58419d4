//! Fetch dispatch.
//!
//! Routes each intercepted GET by category. Store failures are logged and
//! treated as misses; only network failures with no cached alternative
//! reach the caller.

use std::sync::Arc;

use axum::http::StatusCode;
use tracing::{debug, warn};
use url::Url;

use super::classify::{classify, RouteCategory};
use super::headers::rewrite_for_storage;
use super::range::partial_response;
use super::{LifecycleState, Worker};
use crate::cache::{prune, Cache};
use crate::error::Result;
use crate::models::{FetchRequest, FetchResponse};

impl Worker {
    // == Handle Fetch ==
    /// Answers an intercepted request.
    ///
    /// `Ok(None)` means "not handled": the host should send the request to
    /// the network itself. That covers non-GET methods and any request
    /// arriving before activation.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<Option<FetchResponse>> {
        if !request.is_get() {
            return Ok(None);
        }
        if self.state().await != LifecycleState::Active {
            return Ok(None);
        }
        // Every branch wants a full body it can store or slice.
        let request = &request.unconditional();

        let category = classify(self.config(), &request.url, request.mode);
        debug!("{} {} -> {}", request.method, request.url, category);

        let response = match category {
            RouteCategory::Navigation => self.handle_navigation(request).await,
            RouteCategory::StaticAsset => {
                let store = self.config().asset_store_name();
                self.handle_asset(request, &store, false).await?
            }
            RouteCategory::MediaAsset => {
                let store = self.config().media_store_name();
                self.handle_asset(request, &store, true).await?
            }
            RouteCategory::Other => self.handle_other(request).await?,
        };
        Ok(Some(response))
    }

    // == Navigation ==
    /// Network first; the cached shell when the network is unreachable or
    /// the static host has no such route.
    async fn handle_navigation(&self, request: &FetchRequest) -> FetchResponse {
        match self.inner.fetcher.fetch(request).await {
            Ok(response) if response.is_success() => response,
            Ok(response) if !self.is_same_origin(&request.url) => response,
            Ok(response) => {
                debug!(
                    "{} returned {}; serving shell",
                    request.url,
                    response.status.as_u16()
                );
                self.offline_shell().await
            }
            Err(e) => {
                debug!("navigation to {} failed ({}); serving shell", request.url, e);
                self.offline_shell().await
            }
        }
    }

    async fn offline_shell(&self) -> FetchResponse {
        self.inner.stats.record_offline_fallback();

        let fallback = self.config().fallback_url();
        if let Some(cache) = self.open_store(&self.config().asset_store_name()).await {
            if let Some(shell) = lookup(cache.as_ref(), &fallback).await {
                return shell;
            }
        }
        FetchResponse::text(StatusCode::SERVICE_UNAVAILABLE, "Offline")
    }

    // == Static and Media Assets ==
    async fn handle_asset(
        &self,
        request: &FetchRequest,
        store_name: &str,
        media: bool,
    ) -> Result<FetchResponse> {
        let cache = self.open_store(store_name).await;

        if let Some(range) = request.range() {
            return self.handle_range(request, range, cache, media).await;
        }

        let cached = match &cache {
            Some(cache) => lookup(cache.as_ref(), &request.url).await,
            None => None,
        };
        if let Some(hit) = cached {
            self.inner.stats.record_hit();
            self.schedule_revalidation(request.clone(), store_name.to_string(), media);
            return Ok(hit);
        }

        self.inner.stats.record_miss();
        let response = self.inner.fetcher.fetch(request).await?;
        if response.is_success() {
            if let Some(cache) = &cache {
                if store(cache.as_ref(), &request.url, &response).await && media {
                    self.schedule_prune();
                }
            }
        }
        Ok(response)
    }

    /// Serves a byte range from the complete stored body, fetching and
    /// storing the complete body first on a miss.
    async fn handle_range(
        &self,
        request: &FetchRequest,
        range: &str,
        cache: Option<Arc<dyn Cache>>,
        media: bool,
    ) -> Result<FetchResponse> {
        let full = match &cache {
            Some(cache) => lookup(cache.as_ref(), &request.url)
                .await
                .filter(|stored| stored.status != StatusCode::PARTIAL_CONTENT),
            None => None,
        };
        if let Some(full) = full {
            self.inner.stats.record_hit();
            return Ok(partial_response(&full, range));
        }

        self.inner.stats.record_miss();
        let response = self.inner.fetcher.fetch(&request.without_range()).await?;
        if !response.is_success() || response.status == StatusCode::PARTIAL_CONTENT {
            return Ok(response);
        }

        if let Some(cache) = &cache {
            if store(cache.as_ref(), &request.url, &response).await && media {
                self.schedule_prune();
            }
        }
        Ok(partial_response(&response, range))
    }

    // == Other ==
    /// Any stored copy first, then the network; same-origin successes are
    /// stored as received.
    async fn handle_other(&self, request: &FetchRequest) -> Result<FetchResponse> {
        match self.inner.storage.match_url(&request.url).await {
            Ok(Some(hit)) => {
                self.inner.stats.record_hit();
                return Ok(hit);
            }
            Ok(None) => {}
            Err(e) => debug!("lookup of {} failed: {}", request.url, e),
        }

        self.inner.stats.record_miss();
        let response = self.inner.fetcher.fetch(request).await?;
        if response.is_success() && self.is_same_origin(&request.url) {
            if let Some(cache) = self.open_store(&self.config().asset_store_name()).await {
                if let Err(e) = cache.put(&request.url, response.clone()).await {
                    debug!("storing {} failed: {}", request.url, e);
                }
            }
        }
        Ok(response)
    }

    // == Background Work ==
    fn schedule_revalidation(&self, request: FetchRequest, store_name: String, media: bool) {
        let worker = self.clone();
        self.inner.background.spawn("revalidate", async move {
            worker.revalidate(&request, &store_name, media).await;
        });
    }

    /// Refreshes a stored asset from the network. Failures leave the old entry.
    async fn revalidate(&self, request: &FetchRequest, store_name: &str, media: bool) {
        let response = match self.inner.fetcher.fetch(request).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                debug!(
                    "revalidation of {} skipped: status {}",
                    request.url,
                    response.status.as_u16()
                );
                return;
            }
            Err(e) => {
                debug!("revalidation of {} skipped: {}", request.url, e);
                return;
            }
        };

        let Some(cache) = self.open_store(store_name).await else {
            return;
        };
        if store(cache.as_ref(), &request.url, &response).await {
            self.inner.stats.record_revalidation();
            if media {
                self.prune_media().await;
            }
        }
    }

    pub(super) fn schedule_prune(&self) {
        let worker = self.clone();
        self.inner.background.spawn("prune", async move {
            worker.prune_media().await;
        });
    }

    async fn prune_media(&self) {
        let removed = prune(
            self.inner.storage.as_ref(),
            &self.config().media_store_name(),
            self.config().max_media_entries,
        )
        .await;
        self.inner.stats.record_evictions(removed);
    }

    // == Helpers ==
    async fn open_store(&self, name: &str) -> Option<Arc<dyn Cache>> {
        match self.inner.storage.open(name).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("opening store {} failed: {}", name, e);
                None
            }
        }
    }

    fn is_same_origin(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| u.origin() == self.config().scope.origin())
            .unwrap_or(false)
    }
}

async fn lookup(cache: &dyn Cache, url: &str) -> Option<FetchResponse> {
    match cache.get(url).await {
        Ok(found) => found,
        Err(e) => {
            debug!("lookup of {} failed: {}", url, e);
            None
        }
    }
}

/// Stores the long-lived copy of `response`. Returns whether it was written.
async fn store(cache: &dyn Cache, url: &str, response: &FetchResponse) -> bool {
    match cache.put(url, rewrite_for_storage(response)).await {
        Ok(()) => true,
        Err(e) => {
            debug!("storing {} failed: {}", url, e);
            false
        }
    }
}
