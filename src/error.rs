//! Error types for the offline cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::worker::LifecycleState;

// == Worker Error Enum ==
/// Unified error type for the offline cache.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Transport-level failure talking to the network
    #[error("Network error: {0}")]
    Network(String),

    /// Cache store read, write, delete or enumeration failure
    #[error("Store error: {0}")]
    Store(String),

    /// The install manifest could not be fetched or written
    #[error("Install failed: {0}")]
    InstallFailed(String),

    /// Lifecycle operation invoked in the wrong state
    #[error("Invalid lifecycle state: expected {expected}, found {actual}")]
    InvalidState {
        expected: LifecycleState,
        actual: LifecycleState,
    },

    /// Incoming request the host cannot turn into a fetch
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// URL could not be parsed or resolved
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let status = match &self {
            WorkerError::Network(_) => StatusCode::BAD_GATEWAY,
            WorkerError::InvalidRequest(_) | WorkerError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the offline cache.
pub type Result<T> = std::result::Result<T, WorkerError>;
