//! Intercepted request model
//!
//! Defines the request the host hands to the worker and the worker hands to the network.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use bytes::Bytes;

/// How the client declared the request, mirroring `Sec-Fetch-Mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level page load
    Navigate,
    SameOrigin,
    NoCors,
    Cors,
}

impl RequestMode {
    /// Derives the mode from request headers.
    ///
    /// `Sec-Fetch-Mode` wins when present. Clients that omit it entirely
    /// (curl, older browsers) are treated as navigating when they issue a
    /// GET that accepts HTML.
    pub fn from_headers(method: &Method, headers: &HeaderMap) -> Self {
        if let Some(mode) = headers
            .get("sec-fetch-mode")
            .and_then(|v| v.to_str().ok())
        {
            return match mode.trim().to_ascii_lowercase().as_str() {
                "navigate" => RequestMode::Navigate,
                "same-origin" => RequestMode::SameOrigin,
                "cors" => RequestMode::Cors,
                _ => RequestMode::NoCors,
            };
        }

        let accepts_html = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"));

        if method == Method::GET && accepts_html {
            RequestMode::Navigate
        } else {
            RequestMode::NoCors
        }
    }
}

// == Fetch Request ==
/// A request intercepted from a client.
///
/// The URL is kept as the raw absolute string; parsing happens where a
/// component needs it so malformed URLs degrade instead of failing.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub mode: RequestMode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    /// Creates a request with an explicit method and mode.
    pub fn new(method: Method, url: impl Into<String>, mode: RequestMode) -> Self {
        Self {
            method,
            url: url.into(),
            mode,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a plain subresource GET.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, RequestMode::NoCors)
    }

    /// Creates a top-level navigation GET.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    /// Adds a header, replacing any previous value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Returns the raw `Range` header, if any.
    pub fn range(&self) -> Option<&str> {
        self.headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok())
    }

    /// Copy of this request asking for the full representation.
    pub fn without_range(&self) -> Self {
        let mut full = self.clone();
        full.headers.remove(header::RANGE);
        full
    }

    /// Copy of this request that must bypass intermediate caches.
    pub fn fresh(&self) -> Self {
        self.clone().with_header(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        )
    }

    /// Copy of this request without the client's validators, so the
    /// network answers with a full representation instead of a 304.
    pub fn unconditional(&self) -> Self {
        let mut full = self.clone();
        for name in conditional_headers() {
            full.headers.remove(name);
        }
        full
    }
}

/// Validators a client sends to revalidate its own copy.
pub fn conditional_headers() -> [HeaderName; 5] {
    [
        header::IF_NONE_MATCH,
        header::IF_MODIFIED_SINCE,
        header::IF_MATCH,
        header::IF_UNMODIFIED_SINCE,
        header::IF_RANGE,
    ]
}
