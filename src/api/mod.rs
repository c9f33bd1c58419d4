//! API Module
//!
//! HTTP host for the worker.
//!
//! # Endpoints
//! - `GET /_offline/health` - Health check endpoint
//! - `GET /_offline/stats` - Worker statistics
//! - any other method and path - Proxied through the worker

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
