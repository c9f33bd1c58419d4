//! API Routes
//!
//! Configures the Axum router: the admin endpoints under `/_offline/` and
//! the proxy fallback for everything else.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, proxy_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /_offline/health` - Health check endpoint
/// - `GET /_offline/stats` - Worker state, counters and store sizes
/// - anything else - Intercepted by the worker
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/_offline/health", get(health_handler))
        .route("/_offline/stats", get(stats_handler))
        .fallback(proxy_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    use crate::config::Config;
    use crate::error::{Result, WorkerError};
    use crate::fetch::Fetcher;
    use crate::models::{FetchRequest, FetchResponse};
    use crate::worker::Worker;

    struct Unreachable;

    #[async_trait]
    impl Fetcher for Unreachable {
        async fn fetch(&self, _request: &FetchRequest) -> Result<FetchResponse> {
            Err(WorkerError::Network("connection refused".into()))
        }
    }

    fn create_test_app() -> Router {
        let worker = Worker::with_memory_storage(Arc::new(Config::default()), Arc::new(Unreachable));
        create_router(AppState::new(worker))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/_offline/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/_offline/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unhandled_request_without_network_is_bad_gateway() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/submit")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
