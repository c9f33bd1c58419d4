//! Network capability
//!
//! The worker reaches the network only through [`Fetcher`]. Any HTTP status
//! is an `Ok` response; `Err` means the request never completed.

mod http;

use async_trait::async_trait;

pub use http::HttpFetcher;

use crate::error::Result;
use crate::models::{FetchRequest, FetchResponse};

/// Issues a request and buffers the full response.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}
