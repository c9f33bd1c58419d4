//! Precache Discoverer
//!
//! Scans the shell document for asset references worth storing at install.
//!
//! The scan is a regular expression, not an HTML parse. It matches a
//! whitespace-preceded `href` or `src`, optional whitespace, `=`, optional
//! whitespace, then a value in double or single quotes (the value may not
//! contain its own quote character). Unquoted attributes are not seen, and
//! neither are look-alikes such as `data-src` or `x-href`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::config::Config;
use crate::worker::classify::is_media;

static QUOTED_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)(?:href|src)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern compiles")
});

/// Schemes that never reach the network.
const SKIPPED_SCHEMES: &[&str] = &["data:", "blob:", "mailto:", "tel:", "javascript:"];

/// Path fragments and extensions eligible for opportunistic precaching.
/// Media is deliberately absent.
const PRECACHE_MARKERS: &[&str] = &["/assets/"];
const PRECACHE_EXTENSIONS: &[&str] = &[".wasm", ".js", ".css", ".webp", ".avif", ".png", ".ico"];

/// Lazily yields unique, same-origin, in-scope URLs referenced by `html`.
///
/// Pure in its inputs: calling it again on the same text yields the same sequence.
pub fn discover<'a>(config: &'a Config, html: &'a str) -> impl Iterator<Item = Url> + 'a {
    let base = config.base_url();
    let mut seen = HashSet::new();

    QUOTED_ATTRIBUTE
        .captures_iter(html)
        .filter_map(|captures| captures.get(1).or_else(|| captures.get(2)))
        .filter_map(move |value| resolve(config, &base, value.as_str()))
        .filter(move |url| seen.insert(url.as_str().to_string()))
}

/// Allow-list applied by install before fetching a discovered URL.
///
/// Media never qualifies, even under the asset directory.
pub fn is_precache_candidate(url: &Url) -> bool {
    if is_media(url.as_str()) {
        return false;
    }
    let path = url.path().to_ascii_lowercase();
    PRECACHE_MARKERS.iter().any(|marker| path.contains(marker))
        || PRECACHE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn resolve(config: &Config, base: &Url, raw: &str) -> Option<Url> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let lowered = value.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    // Relative values resolve against the scope, `/x` against the origin
    // root, absolute URLs stay as they are.
    let mut url = base.join(value).ok()?;
    // The network never sees the fragment.
    url.set_fragment(None);
    if url.origin() != config.scope.origin() {
        return None;
    }
    if !in_scope(config.base_path(), url.path()) {
        return None;
    }
    Some(url)
}

fn in_scope(base_path: &str, path: &str) -> bool {
    base_path.is_empty()
        || path == base_path
        || path
            .strip_prefix(base_path)
            .is_some_and(|rest| rest.starts_with('/'))
}
