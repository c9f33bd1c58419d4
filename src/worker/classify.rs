//! Request Classifier
//!
//! Maps an intercepted request to the route category that decides its caching policy.

use std::fmt;

use url::Url;

use crate::config::Config;
use crate::models::RequestMode;

/// Extensions treated as static assets wherever they live in scope.
const STATIC_EXTENSIONS: &[&str] = &[
    ".wasm", ".js", ".css", ".mp4", ".webm", ".webp", ".avif", ".png", ".ico",
];

/// Static asset extensions routed to the bounded media store.
const MEDIA_EXTENSIONS: &[&str] = &[".mp4", ".webm"];

/// Policy bucket for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteCategory {
    /// Top-level page load
    Navigation,
    /// Same-origin, long-lived asset stored in the asset store
    StaticAsset,
    /// Same-origin video stored in the bounded media store
    MediaAsset,
    Other,
}

impl fmt::Display for RouteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteCategory::Navigation => write!(f, "navigation"),
            RouteCategory::StaticAsset => write!(f, "static-asset"),
            RouteCategory::MediaAsset => write!(f, "media-asset"),
            RouteCategory::Other => write!(f, "other"),
        }
    }
}

/// Classifies a request URL. Never fails: unparseable URLs are `Other`.
pub fn classify(config: &Config, url: &str, mode: RequestMode) -> RouteCategory {
    if mode == RequestMode::Navigate {
        return RouteCategory::Navigation;
    }

    let Ok(parsed) = Url::parse(url) else {
        return RouteCategory::Other;
    };
    if parsed.origin() != config.scope.origin() {
        return RouteCategory::Other;
    }

    let path = parsed.path().to_ascii_lowercase();
    let in_asset_dir = path.starts_with(&config.asset_dir().to_ascii_lowercase());

    if has_extension(&path, MEDIA_EXTENSIONS) {
        RouteCategory::MediaAsset
    } else if in_asset_dir || has_extension(&path, STATIC_EXTENSIONS) {
        RouteCategory::StaticAsset
    } else {
        RouteCategory::Other
    }
}

/// True when `url` points at media that belongs in the bounded store.
pub fn is_media(url: &str) -> bool {
    Url::parse(url)
        .map(|u| has_extension(&u.path().to_ascii_lowercase(), MEDIA_EXTENSIONS))
        .unwrap_or(false)
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    extensions.iter().any(|ext| path.ends_with(ext))
}
