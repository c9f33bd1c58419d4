//! Data Models
//!
//! Request and response values that flow between the host, the worker,
//! the network and the cache store, plus the admin endpoint DTOs.

mod admin;
mod request;
mod response;

pub use admin::{HealthResponse, StatsResponse, StoreSummary};
pub use request::{conditional_headers, FetchRequest, RequestMode};
pub use response::FetchResponse;
