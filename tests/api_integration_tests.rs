//! Integration Tests for the HTTP host
//!
//! Tests the full request/response cycle through the router: admin
//! endpoints, proxying through an active worker and network pass-through.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use offline_cache::cache::CacheStorage;
use offline_cache::{create_router, AppState, Worker};

use common::{active_worker, shell_network, SHELL_HTML};

// == Helper Functions ==

fn app(worker: &Worker) -> Router {
    create_router(AppState::new(worker.clone()))
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

async fn body_to_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

// == Admin Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let network = shell_network();
    let worker = active_worker(&network).await;

    let response = app(&worker)
        .oneshot(
            Request::builder()
                .uri("/_offline/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_stats_endpoint_reports_state_and_stores() {
    let network = shell_network();
    let worker = active_worker(&network).await;

    let response = app(&worker)
        .oneshot(
            Request::builder()
                .uri("/_offline/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["state"], "active");
    assert_eq!(json["hits"], 0);

    let stores = json["stores"].as_array().unwrap();
    let assets = stores
        .iter()
        .find(|s| s["name"] == "demo-v2")
        .expect("asset store listed");
    // Five manifest entries plus three precached assets.
    assert_eq!(assets["entries"], 8);
}

// == Proxy Tests ==

#[tokio::test]
async fn test_asset_served_through_router_counts_as_hit() {
    let network = shell_network();
    let worker = active_worker(&network).await;
    network.set_offline(true);

    let response = app(&worker)
        .oneshot(
            Request::builder()
                .uri("/base/assets/app-abc123.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=31536000, immutable"
    );
    assert_eq!(body_bytes(response.into_body()).await, b"console.log('app')");

    worker.drain_background().await;
    assert_eq!(worker.stats().hits, 1);
}

#[tokio::test]
async fn test_browser_navigation_offline_gets_shell() {
    let network = shell_network();
    let worker = active_worker(&network).await;
    network.set_offline(true);

    let response = app(&worker)
        .oneshot(
            Request::builder()
                .uri("/base/settings/profile")
                .header("sec-fetch-mode", "navigate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, SHELL_HTML.as_bytes());
}

#[tokio::test]
async fn test_html_accepting_get_is_treated_as_navigation() {
    let network = shell_network();
    let worker = active_worker(&network).await;
    network.set_offline(true);

    let response = app(&worker)
        .oneshot(
            Request::builder()
                .uri("/base/inbox")
                .header(header::ACCEPT, "text/html,application/xhtml+xml")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(worker.stats().offline_fallbacks, 1);
}

#[tokio::test]
async fn test_range_request_through_router() {
    let network = shell_network();
    network.serve_text(&common::url("media/trailer.mp4"), "0123456789");
    let worker = active_worker(&network).await;

    let response = app(&worker)
        .oneshot(
            Request::builder()
                .uri("/base/media/trailer.mp4")
                .header(header::RANGE, "bytes=2-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 2-5/10"
    );
    assert_eq!(body_bytes(response.into_body()).await, b"2345");
}

#[tokio::test]
async fn test_post_is_passed_through_to_network() {
    let network = shell_network();
    network.serve_text(&common::url("api/submit"), "accepted");
    let worker = active_worker(&network).await;

    let response = app(&worker)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/base/api/submit")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"x"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"accepted");

    let sent = network.requests_for(&common::url("api/submit"));
    assert_eq!(sent.len(), 1);
    assert_eq!(&sent[0].body[..], br#"{"name":"x"}"#);
    assert!(worker
        .storage()
        .match_url(&common::url("api/submit"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_uncached_asset_offline_is_bad_gateway() {
    let network = shell_network();
    let worker = active_worker(&network).await;
    network.set_offline(true);

    let response = app(&worker)
        .oneshot(
            Request::builder()
                .uri("/base/assets/lazy-chunk.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
