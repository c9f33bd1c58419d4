//! Memory Store Module
//!
//! In-process implementation of the cache store protocol: a set of named
//! stores, each combining HashMap storage with insertion-order tracking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use tokio::sync::RwLock;

use crate::cache::{Cache, CacheStorage, InsertionOrder};
use crate::error::{Result, WorkerError};
use crate::models::FetchResponse;

// == Memory Cache ==
/// A single named store.
#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: RwLock<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    /// URL-keyed entries
    entries: HashMap<String, FetchResponse>,
    /// Write order tracker
    order: InsertionOrder,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, url: &str) -> Result<Option<FetchResponse>> {
        let inner = self.inner.read().await;
        Ok(inner.entries.get(url).cloned())
    }

    // == Put ==
    /// Stores a response, re-appending the key as the newest entry.
    ///
    /// Only complete successful responses are accepted; a 206 slice is
    /// never a valid full body.
    async fn put(&self, url: &str, response: FetchResponse) -> Result<()> {
        check_storable(url, &response)?;

        let mut inner = self.inner.write().await;
        inner.entries.insert(url.to_string(), response);
        inner.order.record(url);
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let existed = inner.entries.remove(url).is_some();
        if existed {
            inner.order.remove(url);
        }
        Ok(existed)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner.order.iter().cloned().collect())
    }
}

/// Only complete successful responses may be stored.
pub(crate) fn check_storable(url: &str, response: &FetchResponse) -> Result<()> {
    if !response.is_success() || response.status == StatusCode::PARTIAL_CONTENT {
        return Err(WorkerError::Store(format!(
            "refusing to store {} response for {}",
            response.status.as_u16(),
            url
        )));
    }
    Ok(())
}

// == Memory Storage ==
/// All named stores of one process, in creation order.
///
/// Deleting a store only unlinks it: requests still holding a handle keep
/// reading and writing the detached store until they finish.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    caches: RwLock<Vec<(String, Arc<MemoryCache>)>>,
}

impl MemoryStorage {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Open Concrete ==
    /// Opens a store and returns its concrete type.
    pub async fn open_memory(&self, name: &str) -> Arc<MemoryCache> {
        if let Some(cache) = self.find(name).await {
            return cache;
        }

        let mut caches = self.caches.write().await;
        // Another writer may have created it between the two locks.
        if let Some((_, cache)) = caches.iter().find(|(n, _)| n == name) {
            return cache.clone();
        }
        let cache = Arc::new(MemoryCache::new());
        caches.push((name.to_string(), cache.clone()));
        cache
    }

    async fn find(&self, name: &str) -> Option<Arc<MemoryCache>> {
        self.caches
            .read()
            .await
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cache)| cache.clone())
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        let cache: Arc<dyn Cache> = self.open_memory(name).await;
        Ok(cache)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.find(name).await.is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let caches = self.caches.read().await;
        Ok(caches.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut caches = self.caches.write().await;
        let before = caches.len();
        caches.retain(|(n, _)| n != name);
        Ok(caches.len() != before)
    }

    async fn match_url(&self, url: &str) -> Result<Option<FetchResponse>> {
        let caches: Vec<Arc<MemoryCache>> = self
            .caches
            .read()
            .await
            .iter()
            .map(|(_, cache)| cache.clone())
            .collect();

        for cache in caches {
            if let Some(response) = cache.get(url).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}
