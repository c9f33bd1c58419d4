//! Range Responder
//!
//! Replays a single byte range out of a fully cached body.

use std::sync::LazyLock;

use axum::http::{header, HeaderValue, StatusCode};
use regex::Regex;

use crate::models::FetchResponse;

/// `bytes=START-END` with END optional. Nothing else is accepted.
static SINGLE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^bytes=(\d+)-(\d*)$").expect("range pattern compiles"));

/// A parsed single byte range; `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    /// Parses a `Range` header value. Returns None for anything but a
    /// well-formed single range whose end is not before its start.
    pub fn parse(value: &str) -> Option<Self> {
        let captures = SINGLE_RANGE.captures(value)?;
        let start: u64 = captures.get(1)?.as_str().parse().ok()?;
        let end = match captures.get(2).map(|m| m.as_str()) {
            Some("") | None => None,
            Some(digits) => Some(digits.parse::<u64>().ok()?),
        };

        if end.is_some_and(|end| end < start) {
            return None;
        }
        Some(Self { start, end })
    }
}

/// Builds the response for `range_header` out of the complete `full` response.
///
/// - invalid header: `full` unchanged
/// - start past the end: 416 with `Content-Range: bytes */total`, no body
/// - otherwise: 206 with the inclusive slice, `Content-Range`,
///   `Accept-Ranges` and an exact `Content-Length`
pub fn partial_response(full: &FetchResponse, range_header: &str) -> FetchResponse {
    let Some(range) = ByteRange::parse(range_header) else {
        return full.clone();
    };

    let total = full.body.len() as u64;
    if range.start >= total {
        return FetchResponse::new(StatusCode::RANGE_NOT_SATISFIABLE).with_header(
            header::CONTENT_RANGE,
            header_value(format!("bytes */{}", total)),
        );
    }

    let start = range.start;
    let end = range.end.map_or(total - 1, |end| end.min(total - 1));
    let slice = full.body.slice(start as usize..=end as usize);

    let mut partial = FetchResponse {
        status: StatusCode::PARTIAL_CONTENT,
        headers: full.headers.clone(),
        body: slice,
    };
    partial.headers.insert(
        header::CONTENT_RANGE,
        header_value(format!("bytes {}-{}/{}", start, end, total)),
    );
    partial
        .headers
        .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    partial.headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(end - start + 1),
    );
    partial
}

fn header_value(value: String) -> HeaderValue {
    // Digits, spaces, '-', '/' and '*' are always valid header bytes.
    HeaderValue::try_from(value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(len: usize) -> FetchResponse {
        let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        FetchResponse::ok(bytes).with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("video/mp4"),
        )
    }

    #[test]
    fn test_parse_open_ended() {
        assert_eq!(
            ByteRange::parse("bytes=10-"),
            Some(ByteRange { start: 10, end: None })
        );
    }

    #[test]
    fn test_parse_closed() {
        assert_eq!(
            ByteRange::parse("bytes=0-99"),
            Some(ByteRange { start: 0, end: Some(99) })
        );
    }

    #[test]
    fn test_parse_rejects_other_grammars() {
        for value in [
            "bytes=-500",
            "bytes=0-1,4-5",
            "items=0-1",
            "bytes = 0-1",
            "bytes=a-b",
            "bytes=5-4",
            "bytes=99999999999999999999999-",
            "",
        ] {
            assert_eq!(ByteRange::parse(value), None, "{}", value);
        }
    }

    #[test]
    fn test_partial_slice_and_headers() {
        let full = body(1000);
        let partial = partial_response(&full, "bytes=100-199");

        assert_eq!(partial.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(partial.body.len(), 100);
        assert_eq!(&partial.body[..], &full.body[100..200]);
        assert_eq!(partial.header(&header::CONTENT_RANGE), Some("bytes 100-199/1000"));
        assert_eq!(partial.header(&header::ACCEPT_RANGES), Some("bytes"));
        assert_eq!(partial.header(&header::CONTENT_LENGTH), Some("100"));
        assert_eq!(partial.header(&header::CONTENT_TYPE), Some("video/mp4"));
    }

    #[test]
    fn test_end_is_clamped() {
        let full = body(10);
        let partial = partial_response(&full, "bytes=5-500");

        assert_eq!(partial.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(partial.header(&header::CONTENT_RANGE), Some("bytes 5-9/10"));
        assert_eq!(partial.body.len(), 5);
    }

    #[test]
    fn test_open_and_closed_full_ranges_match() {
        let full = body(64);
        let open = partial_response(&full, "bytes=0-");
        let closed = partial_response(&full, "bytes=0-63");

        assert_eq!(open.body, closed.body);
        assert_eq!(
            open.header(&header::CONTENT_RANGE),
            closed.header(&header::CONTENT_RANGE)
        );
        assert_eq!(open.header(&header::CONTENT_RANGE), Some("bytes 0-63/64"));
    }

    #[test]
    fn test_unsatisfiable_range() {
        let full = body(64);
        let response = partial_response(&full, "bytes=64-");

        assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.header(&header::CONTENT_RANGE), Some("bytes */64"));
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_empty_body_is_unsatisfiable() {
        let full = FetchResponse::ok("");
        let response = partial_response(&full, "bytes=0-");
        assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.header(&header::CONTENT_RANGE), Some("bytes */0"));
    }

    #[test]
    fn test_invalid_header_passes_full_response_through() {
        let full = body(32);
        let response = partial_response(&full, "bytes=10-5");

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, full.body);
        assert!(response.header(&header::CONTENT_RANGE).is_none());
    }
}
