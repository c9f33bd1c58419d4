//! Offline Cache - an offline-first caching proxy for a static web app
//!
//! Serves navigations network-first with a cached shell fallback, hashed
//! assets cache-first with background revalidation, and media through a
//! bounded store that can answer byte-range requests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod tasks;
pub mod worker;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{Result, WorkerError};
pub use fetch::{Fetcher, HttpFetcher};
pub use worker::{InstallReport, LifecycleState, Worker};
