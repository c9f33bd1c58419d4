//! API Handlers
//!
//! The proxy handler turns every client request into a [`FetchRequest`],
//! lets the worker answer it and falls back to the network when the worker
//! declines. The admin handlers report worker health and counters.

use axum::{
    body,
    extract::{Request, State},
    http::Uri,
    Json,
};

use crate::config::Config;
use crate::error::{Result, WorkerError};
use crate::models::{FetchRequest, FetchResponse, HealthResponse, RequestMode, StatsResponse};
use crate::worker::Worker;

/// Largest request body the proxy buffers.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The running worker; cheap to clone
    pub worker: Worker,
}

impl AppState {
    /// Creates a new AppState around an installed (or installing) worker.
    pub fn new(worker: Worker) -> Self {
        Self { worker }
    }
}

/// Fallback handler for every path outside `/_offline/`.
///
/// Requests the worker does not handle are fetched directly; a network
/// failure then surfaces as 502.
pub async fn proxy_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<FetchResponse> {
    let request = into_fetch_request(state.worker.config(), request).await?;

    if let Some(response) = state.worker.handle_fetch(&request).await? {
        return Ok(response);
    }
    state.worker.fetcher().fetch(&request).await
}

/// Buffers an incoming request into the worker's request model.
pub async fn into_fetch_request(config: &Config, request: Request) -> Result<FetchRequest> {
    let (parts, body) = request.into_parts();
    let body = body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| WorkerError::InvalidRequest(format!("failed to read body: {}", e)))?;

    let mode = RequestMode::from_headers(&parts.method, &parts.headers);
    let mut request = FetchRequest::new(parts.method, request_url(config, &parts.uri), mode)
        .with_body(body);
    request.headers = parts.headers;
    Ok(request)
}

/// Absolute URL of the request as the client addressed it.
///
/// Origin-form targets are placed on the scope origin.
fn request_url(config: &Config, uri: &Uri) -> String {
    if uri.scheme().is_some() {
        return uri.to_string();
    }
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{}{}", config.scope.origin().ascii_serialization(), path)
}

/// Handler for GET /_offline/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let worker = &state.worker;

    Json(StatsResponse::new(
        worker.state().await.to_string(),
        worker.stats(),
        worker.store_summaries().await,
    ))
}

/// Handler for GET /_offline/health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
