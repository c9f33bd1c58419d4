//! Shared fixtures for the integration tests.
//!
//! `MockNetwork` stands in for the upstream: routes are registered per URL,
//! every request is recorded, and the whole network can be taken offline.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{header, HeaderValue, StatusCode};
use url::Url;

use offline_cache::cache::Cache;
use offline_cache::models::{FetchRequest, FetchResponse};
use offline_cache::{Config, Fetcher, Result, Worker, WorkerError};

pub const ORIGIN: &str = "https://app.example.com";
pub const SHELL_HTML: &str = r#"<!doctype html>
<html>
  <head>
    <link rel="stylesheet" href="/base/assets/index-9f8e7d.css">
    <script type="module" src="/base/assets/app-abc123.js"></script>
  </head>
  <body>
    <img src="icon.png">
    <a href="https://other.example/x">elsewhere</a>
    <a href="/base/about">about</a>
  </body>
</html>"#;

/// Scriptable upstream.
#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, FetchResponse>>,
    offline: AtomicBool,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers `url` with `response` from now on.
    pub fn serve(&self, url: &str, response: FetchResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn serve_text(&self, url: &str, body: &str) {
        self.serve(url, FetchResponse::ok(body.to_string()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every request that reached the network for `url`.
    pub fn requests_for(&self, url: &str) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.requests_for(url).len()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for MockNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(WorkerError::Network(format!("{} unreachable", request.url)));
        }
        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::text(StatusCode::NOT_FOUND, "Not Found")))
    }
}

/// Absolute URL under the `/base/` scope.
pub fn url(path: &str) -> String {
    format!("{}/base/{}", ORIGIN, path.trim_start_matches('/'))
}

pub fn config() -> Config {
    Config {
        app_name: "demo".to_string(),
        version: "2".to_string(),
        scope: Url::parse(&url("")).unwrap(),
        max_media_entries: 3,
        ..Default::default()
    }
}

/// A network serving the shell manifest and the assets the shell references.
pub fn shell_network() -> Arc<MockNetwork> {
    let network = MockNetwork::new();
    let html = FetchResponse::ok(SHELL_HTML).with_header(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    network.serve(&url(""), html.clone());
    network.serve(&url("index.html"), html);
    network.serve_text(&url("404.html"), "<h1>Not found</h1>");
    network.serve_text(&url("assets/manifest.json"), "{}");
    network.serve_text(&url("assets/sw.js"), "self.addEventListener('fetch', () => {});");
    network.serve_text(&url("assets/app-abc123.js"), "console.log('app')");
    network.serve_text(&url("assets/index-9f8e7d.css"), "body{}");
    network.serve_text(&url("icon.png"), "png");
    network
}

pub fn worker(network: &Arc<MockNetwork>) -> Worker {
    Worker::with_memory_storage(Arc::new(config()), network.clone())
}

/// Installs and activates, waiting for activation's background prune.
pub async fn active_worker(network: &Arc<MockNetwork>) -> Worker {
    let worker = worker(network);
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    worker.drain_background().await;
    worker
}

/// Reads an entry straight from a named store.
pub async fn stored(worker: &Worker, store: &str, url: &str) -> Option<FetchResponse> {
    worker.storage().open(store).await.unwrap().get(url).await.unwrap()
}
