//! Upstream HTTP client.
//!
//! Requests addressed to the scope origin are sent to the upstream origin
//! with the same path and query; anything else is fetched as addressed.

use std::time::Instant;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderName, Method};
use reqwest::{redirect, Client};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::{Result, WorkerError};
use crate::fetch::Fetcher;
use crate::models::{conditional_headers, FetchRequest, FetchResponse};

const MAX_REDIRECTS: usize = 5;

/// Headers that describe one hop and must not be forwarded.
fn hop_by_hop() -> [HeaderName; 10] {
    [
        header::CONNECTION,
        header::HOST,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
        HeaderName::from_static("keep-alive"),
        HeaderName::from_static("proxy-connection"),
    ]
}

/// reqwest-backed [`Fetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    scope: Url,
    upstream: Url,
}

impl HttpFetcher {
    /// Builds the client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("offline_cache/", env!("CARGO_PKG_VERSION")))
            .timeout(config.fetch_timeout())
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .use_rustls_tls()
            .build()
            .map_err(|e| WorkerError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            scope: config.scope.clone(),
            upstream: config.upstream.clone(),
        })
    }

    /// Maps a scope URL onto the upstream origin, leaving other origins alone.
    pub fn upstream_url(&self, url: &str) -> Result<Url> {
        let mut target = Url::parse(url).map_err(|e| WorkerError::InvalidUrl(format!("{}: {}", url, e)))?;
        if target.origin() != self.scope.origin() {
            return Ok(target);
        }

        let rewrite = |target: &mut Url| -> std::result::Result<(), ()> {
            target.set_scheme(self.upstream.scheme())?;
            target.set_host(self.upstream.host_str()).map_err(|_| ())?;
            target.set_port(self.upstream.port())
        };
        rewrite(&mut target).map_err(|_| WorkerError::InvalidUrl(format!("cannot map {} upstream", url)))?;
        Ok(target)
    }
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in hop_by_hop() {
        forwarded.remove(name);
    }
    forwarded
}

/// Request headers sent upstream. Bodies are stored and sliced, so ask for
/// an identity encoding. Reads never carry client validators: a 304 has no
/// body to store or serve.
fn upstream_headers(method: &Method, headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = forwardable(headers);
    forwarded.remove(header::ACCEPT_ENCODING);
    if method == Method::GET || method == Method::HEAD {
        for name in conditional_headers() {
            forwarded.remove(name);
        }
    }
    forwarded
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let start = Instant::now();
        let target = self.upstream_url(&request.url)?;

        let response = self
            .http
            .request(request.method.clone(), target.clone())
            .headers(upstream_headers(&request.method, &request.headers))
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| WorkerError::Network(format!("{} {}: {}", request.method, target, e)))?;

        let status = response.status();
        let mut headers = forwardable(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| WorkerError::Network(format!("failed to read {}: {}", target, e)))?;

        // The body is buffered, so any upstream length no longer applies.
        headers.insert(header::CONTENT_LENGTH, body.len().into());

        debug!(
            "fetched {} -> {} {} in {}ms ({} bytes)",
            request.url,
            target,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
