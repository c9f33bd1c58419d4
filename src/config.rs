//! Configuration Module
//!
//! Handles loading and managing the cache configuration from environment variables.
//! The resulting `Config` is immutable and shared by every component.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Result, WorkerError};

const DEFAULT_SCOPE: &str = "http://localhost:3000/";
const DEFAULT_UPSTREAM: &str = "http://localhost:8080/";
const DEFAULT_CACHE_DIR: &str = "cache";

/// Offline cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name embedded in every store name
    pub app_name: String,
    /// Generation tag; changing it retires every store of the previous generation
    pub version: String,
    /// Registration scope; all cache keys live under its origin and path
    pub scope: Url,
    /// Origin the network capability forwards scope requests to
    pub upstream: Url,
    /// Upper bound on the number of entries in the media store
    pub max_media_entries: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Upstream request timeout in milliseconds
    pub fetch_timeout_ms: u64,
    /// Scope-relative path of this component's own source entry, if it has one
    pub worker_script: Option<String>,
    /// Scope-relative not-found page written at install, if the site has one
    pub not_found_page: Option<String>,
    /// Scope-relative stylesheet paths written at install
    pub stylesheets: Vec<String>,
    /// Directory holding the stores across restarts; `None` keeps them in memory
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `APP_NAME` - Store name prefix (default: offline-cache)
    /// - `CACHE_VERSION` - Generation tag (default: crate version)
    /// - `SCOPE_URL` - Registration scope (default: http://localhost:3000/)
    /// - `UPSTREAM_URL` - Upstream origin (default: http://localhost:8080/)
    /// - `MAX_MEDIA_ENTRIES` - Media store bound (default: 30)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `FETCH_TIMEOUT_MS` - Upstream timeout (default: 20000)
    /// - `WORKER_SCRIPT` - Source entry path, empty for none (default: assets/sw.js)
    /// - `NOT_FOUND_PAGE` - Not-found page path, empty for none (default: 404.html)
    /// - `STYLESHEETS` - Comma-separated stylesheet paths (default: none)
    /// - `CACHE_DIR` - Store directory, empty for in-memory stores (default: cache)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            app_name: env::var("APP_NAME").unwrap_or(defaults.app_name),
            version: env::var("CACHE_VERSION").unwrap_or(defaults.version),
            scope: env::var("SCOPE_URL")
                .ok()
                .and_then(|v| Url::parse(&v).ok())
                .unwrap_or(defaults.scope),
            upstream: env::var("UPSTREAM_URL")
                .ok()
                .and_then(|v| Url::parse(&v).ok())
                .unwrap_or(defaults.upstream),
            max_media_entries: env::var("MAX_MEDIA_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_media_entries),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            fetch_timeout_ms: env::var("FETCH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_timeout_ms),
            worker_script: optional_var("WORKER_SCRIPT", defaults.worker_script),
            not_found_page: optional_var("NOT_FOUND_PAGE", defaults.not_found_page),
            stylesheets: env::var("STYLESHEETS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.stylesheets),
            cache_dir: optional_var("CACHE_DIR", defaults.cache_dir),
        }
    }

    /// Rejects configurations the worker cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(WorkerError::InvalidConfig("app_name must not be empty".into()));
        }
        if self.version.trim().is_empty() {
            return Err(WorkerError::InvalidConfig("version must not be empty".into()));
        }
        for (field, url) in [("scope", &self.scope), ("upstream", &self.upstream)] {
            if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                return Err(WorkerError::InvalidConfig(format!(
                    "{} must be an absolute http(s) URL, got {}",
                    field, url
                )));
            }
        }
        Ok(())
    }

    /// Upstream timeout as a Duration.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    // == Derived Values ==

    /// Scope path without its trailing slash (`""` for a root scope).
    pub fn base_path(&self) -> &str {
        self.scope.path().trim_end_matches('/')
    }

    /// Scope origin plus base path, always ending in `/`.
    ///
    /// Relative references are resolved against this URL.
    pub fn base_url(&self) -> Url {
        let mut base = self.scope.clone();
        base.set_path(&format!("{}/", self.base_path()));
        base.set_query(None);
        base.set_fragment(None);
        base
    }

    /// Name of the unbounded asset store for the live generation.
    pub fn asset_store_name(&self) -> String {
        format!("{}-v{}", self.app_name, self.version)
    }

    /// Name of the bounded media store for the live generation.
    pub fn media_store_name(&self) -> String {
        format!("{}-media-v{}", self.app_name, self.version)
    }

    /// Path prefix of the hashed asset directory.
    pub fn asset_dir(&self) -> String {
        format!("{}/assets/", self.base_path())
    }

    /// Absolute URL of a scope-relative path.
    pub fn scoped_url(&self, path: &str) -> String {
        let origin = self.scope.origin().ascii_serialization();
        format!("{}{}/{}", origin, self.base_path(), path.trim_start_matches('/'))
    }

    /// Shell document served when a navigation cannot reach the network.
    pub fn fallback_url(&self) -> String {
        self.scoped_url("index.html")
    }

    /// Shell resources written as one batch at install.
    pub fn manifest_urls(&self) -> Vec<String> {
        let mut urls = vec![self.scoped_url(""), self.scoped_url("index.html")];
        urls.extend(self.not_found_page.iter().map(|path| self.scoped_url(path)));
        urls.push(self.scoped_url("assets/manifest.json"));
        urls.extend(self.worker_script.iter().map(|path| self.scoped_url(path)));
        urls.extend(self.stylesheets.iter().map(|path| self.scoped_url(path)));
        urls.dedup();
        urls
    }
}

/// Unset keeps the default; set but blank disables the entry.
fn optional_var<T: From<String>>(name: &str, default: Option<T>) -> Option<T> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => None,
        Ok(value) => Some(T::from(value.trim().to_string())),
        Err(_) => default,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "offline-cache".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            scope: Url::parse(DEFAULT_SCOPE).expect("default scope is a valid URL"),
            upstream: Url::parse(DEFAULT_UPSTREAM).expect("default upstream is a valid URL"),
            max_media_entries: 30,
            server_port: 3000,
            fetch_timeout_ms: 20_000,
            worker_script: Some("assets/sw.js".to_string()),
            not_found_page: Some("404.html".to_string()),
            stylesheets: Vec::new(),
            cache_dir: Some(PathBuf::from(DEFAULT_CACHE_DIR)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoped(scope: &str) -> Config {
        Config {
            scope: Url::parse(scope).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.app_name, "offline-cache");
        assert_eq!(config.max_media_entries, 30);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.fetch_timeout(), Duration::from_millis(20_000));
        assert!(config.stylesheets.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("MAX_MEDIA_ENTRIES");
        env::remove_var("SERVER_PORT");
        env::remove_var("STYLESHEETS");

        let config = Config::from_env();
        assert_eq!(config.max_media_entries, 30);
        assert_eq!(config.server_port, 3000);
        assert!(config.stylesheets.is_empty());
    }

    #[test]
    fn test_store_names_share_version() {
        let config = Config {
            app_name: "remind".into(),
            version: "1.2.3".into(),
            ..Default::default()
        };
        assert_eq!(config.asset_store_name(), "remind-v1.2.3");
        assert_eq!(config.media_store_name(), "remind-media-v1.2.3");
    }

    #[test]
    fn test_base_path_for_nested_scope() {
        let config = scoped("https://example.github.io/base/");
        assert_eq!(config.base_path(), "/base");
        assert_eq!(config.base_url().as_str(), "https://example.github.io/base/");
        assert_eq!(config.asset_dir(), "/base/assets/");
        assert_eq!(
            config.fallback_url(),
            "https://example.github.io/base/index.html"
        );
    }

    #[test]
    fn test_base_path_for_root_scope() {
        let config = scoped("http://localhost:3000/");
        assert_eq!(config.base_path(), "");
        assert_eq!(config.base_url().as_str(), "http://localhost:3000/");
        assert_eq!(config.scoped_url(""), "http://localhost:3000/");
    }

    #[test]
    fn test_manifest_urls_include_stylesheets() {
        let config = Config {
            stylesheets: vec!["assets/base.css".into(), "/assets/app.css".into()],
            ..scoped("https://example.com/base/")
        };
        let urls = config.manifest_urls();
        assert_eq!(urls[0], "https://example.com/base/");
        assert!(urls.contains(&"https://example.com/base/404.html".to_string()));
        assert!(urls.contains(&"https://example.com/base/assets/sw.js".to_string()));
        assert!(urls.contains(&"https://example.com/base/assets/base.css".to_string()));
        assert!(urls.contains(&"https://example.com/base/assets/app.css".to_string()));
    }

    #[test]
    fn test_manifest_urls_omit_absent_entries() {
        let config = Config {
            worker_script: None,
            not_found_page: None,
            ..scoped("https://example.com/base/")
        };
        assert_eq!(
            config.manifest_urls(),
            vec![
                "https://example.com/base/",
                "https://example.com/base/index.html",
                "https://example.com/base/assets/manifest.json",
            ]
        );
    }

    #[test]
    fn test_optional_var_blank_disables() {
        env::set_var("OFFLINE_CACHE_TEST_BLANK", "  ");
        env::set_var("OFFLINE_CACHE_TEST_SET", " page.html ");
        env::remove_var("OFFLINE_CACHE_TEST_UNSET");

        let fallback = Some("x".to_string());
        assert_eq!(optional_var("OFFLINE_CACHE_TEST_BLANK", fallback.clone()), None);
        assert_eq!(
            optional_var("OFFLINE_CACHE_TEST_SET", fallback.clone()),
            Some("page.html".to_string())
        );
        assert_eq!(optional_var("OFFLINE_CACHE_TEST_UNSET", fallback.clone()), fallback);
    }

    #[test]
    fn test_parse_list_skips_blanks() {
        assert_eq!(parse_list("a.css, ,b.css,"), vec!["a.css", "b.css"]);
    }

    #[test]
    fn test_validate_rejects_non_http_scope() {
        let config = scoped("file:///tmp/site/");
        assert!(matches!(
            config.validate(),
            Err(WorkerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_version() {
        let config = Config {
            version: " ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
