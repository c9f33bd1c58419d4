//! Header Rewriter
//!
//! Hashed asset filenames are content addressed, so a stored copy never goes
//! stale. The upstream static host cannot be told so; stored copies carry a
//! long-lived directive instead of whatever the host sent.

use axum::http::{header, HeaderValue};

use crate::models::FetchResponse;

/// Directive attached to every long-term stored asset.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Copy of `response` with the same status and body and an immutable `Cache-Control`.
pub fn rewrite_for_storage(response: &FetchResponse) -> FetchResponse {
    response.clone().with_header(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
    )
}
