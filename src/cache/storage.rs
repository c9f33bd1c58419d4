//! Cache store traits
//!
//! The persistent key-value byte store is provided by the host. The worker
//! only speaks this protocol: named stores at the top level, URL-keyed
//! responses inside each store.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::FetchResponse;

/// One named store of URL-keyed responses.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the stored response for `url`, if any.
    async fn get(&self, url: &str) -> Result<Option<FetchResponse>>;

    /// Stores `response` under `url`, replacing any previous entry.
    async fn put(&self, url: &str, response: FetchResponse) -> Result<()>;

    /// Removes the entry for `url`. Returns whether one existed.
    async fn delete(&self, url: &str) -> Result<bool>;

    /// Lists stored URLs in the store's natural enumeration order.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// The collection of named stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Opens the store called `name`, creating it on first use.
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>>;

    /// Returns whether a store called `name` exists.
    async fn has(&self, name: &str) -> Result<bool>;

    /// Lists store names in creation order.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Deletes the store called `name`. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Looks `url` up across every store, first hit in creation order.
    ///
    /// Must not create stores as a side effect.
    async fn match_url(&self, url: &str) -> Result<Option<FetchResponse>>;
}
