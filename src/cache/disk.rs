//! Disk Store Module
//!
//! File-backed implementation of the cache store protocol, so a generation
//! written by one process can serve the next one while the network is down.
//!
//! ```text
//! <root>/stores.json          store names in creation order
//! <root>/store-<n>/index.json entries oldest-first (url, status, headers)
//! <root>/store-<n>/<id>.body  one response body per entry
//! ```
//!
//! Every file is replaced by writing a sibling `.tmp` file and renaming it
//! over the old one. A body without an index entry is garbage; an index
//! entry whose body is missing reads as a miss.

use std::collections::HashMap;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::store::check_storable;
use crate::cache::{Cache, CacheStorage};
use crate::error::{Result, WorkerError};
use crate::models::FetchResponse;

const REGISTRY_FILE: &str = "stores.json";
const INDEX_FILE: &str = "index.json";

fn store_error(context: impl Display, e: impl Display) -> WorkerError {
    WorkerError::Store(format!("{}: {}", context, e))
}

/// Reads and parses a JSON file; `None` when it does not exist yet.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path).await {
        Ok(raw) => serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| store_error(path.display(), e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(store_error(path.display(), e)),
    }
}

/// Replaces `path` in one rename.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temp = path.with_extension("tmp");
    fs::write(&temp, data)
        .await
        .map_err(|e| store_error(temp.display(), e))?;
    fs::rename(&temp, path)
        .await
        .map_err(|e| store_error(path.display(), e))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_vec(value).map_err(|e| store_error(path.display(), e))?;
    write_atomic(path, &raw).await
}

async fn remove_file_if_present(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("removing {} failed: {}", path.display(), e);
        }
    }
}

// == Disk Cache ==
#[derive(Debug, Default, Serialize, Deserialize)]
struct Index {
    next_id: u64,
    /// Oldest write first
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    url: String,
    id: u64,
    status: u16,
    headers: Vec<(String, String)>,
}

impl IndexEntry {
    fn header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => debug!("dropping unreadable stored header {}", name),
            }
        }
        headers
    }
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

/// A single named store living in its own directory.
///
/// The index lock is held across file writes, so writers to one store are
/// serialized.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
    index: Mutex<Index>,
}

impl DiskCache {
    /// Loads the store in `dir`, treating a missing index as empty.
    async fn load(dir: PathBuf) -> Result<Self> {
        let index = read_json(&dir.join(INDEX_FILE)).await?.unwrap_or_default();
        Ok(Self {
            dir,
            index: Mutex::new(index),
        })
    }

    fn body_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{}.body", id))
    }

    async fn save_index(&self, index: &Index) -> Result<()> {
        write_json(&self.dir.join(INDEX_FILE), index).await
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn get(&self, url: &str) -> Result<Option<FetchResponse>> {
        let index = self.index.lock().await;
        let Some(entry) = index.entries.iter().find(|e| e.url == url) else {
            return Ok(None);
        };

        let path = self.body_path(entry.id);
        let body = match fs::read(&path).await {
            Ok(body) => Bytes::from(body),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("body of {} missing at {}", url, path.display());
                return Ok(None);
            }
            Err(e) => return Err(store_error(path.display(), e)),
        };
        let status = StatusCode::from_u16(entry.status)
            .map_err(|e| store_error(format!("stored status of {}", url), e))?;

        Ok(Some(FetchResponse {
            status,
            headers: entry.header_map(),
            body,
        }))
    }

    // == Put ==
    /// Writes the body, then swaps the index entry so the key becomes the
    /// newest. The replaced body is removed last.
    async fn put(&self, url: &str, response: FetchResponse) -> Result<()> {
        check_storable(url, &response)?;

        let mut index = self.index.lock().await;
        let id = index.next_id;
        index.next_id += 1;
        write_atomic(&self.body_path(id), &response.body).await?;

        let previous = index.entries.iter().position(|e| e.url == url);
        let replaced = previous.map(|pos| index.entries.remove(pos));
        index.entries.push(IndexEntry {
            url: url.to_string(),
            id,
            status: response.status.as_u16(),
            headers: header_pairs(&response.headers),
        });
        self.save_index(&index).await?;

        if let Some(old) = replaced {
            remove_file_if_present(&self.body_path(old.id)).await;
        }
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        let mut index = self.index.lock().await;
        let Some(pos) = index.entries.iter().position(|e| e.url == url) else {
            return Ok(false);
        };
        let removed = index.entries.remove(pos);
        self.save_index(&index).await?;
        remove_file_if_present(&self.body_path(removed.id)).await;
        Ok(true)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let index = self.index.lock().await;
        Ok(index.entries.iter().map(|e| e.url.clone()).collect())
    }
}

// == Disk Storage ==
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    next_id: u64,
    /// Creation order
    stores: Vec<StoreRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreRecord {
    name: String,
    dir: String,
}

#[derive(Debug)]
struct Registry {
    file: RegistryFile,
    /// Stores already loaded by this process
    loaded: HashMap<String, Arc<DiskCache>>,
}

/// All named stores under one root directory.
///
/// Deleting a store removes its directory: handles still held by in-flight
/// requests see misses and failed writes from then on.
#[derive(Debug)]
pub struct DiskStorage {
    root: PathBuf,
    registry: Mutex<Registry>,
}

impl DiskStorage {
    // == Constructor ==
    /// Opens (creating if needed) the store root at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| store_error(root.display(), e))?;
        let file = read_json(&root.join(REGISTRY_FILE)).await?.unwrap_or_default();

        Ok(Self {
            root,
            registry: Mutex::new(Registry {
                file,
                loaded: HashMap::new(),
            }),
        })
    }

    async fn save_registry(&self, file: &RegistryFile) -> Result<()> {
        write_json(&self.root.join(REGISTRY_FILE), file).await
    }

    /// Returns the handle for an existing store, loading it on first use.
    async fn load(&self, registry: &mut Registry, record: &StoreRecord) -> Result<Arc<DiskCache>> {
        if let Some(cache) = registry.loaded.get(&record.name) {
            return Ok(cache.clone());
        }
        let cache = Arc::new(DiskCache::load(self.root.join(&record.dir)).await?);
        registry.loaded.insert(record.name.clone(), cache.clone());
        Ok(cache)
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        let mut registry = self.registry.lock().await;

        if let Some(record) = registry.file.stores.iter().find(|s| s.name == name).cloned() {
            let cache: Arc<dyn Cache> = self.load(&mut registry, &record).await?;
            return Ok(cache);
        }

        let record = StoreRecord {
            name: name.to_string(),
            dir: format!("store-{}", registry.file.next_id),
        };
        let dir = self.root.join(&record.dir);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| store_error(dir.display(), e))?;

        registry.file.next_id += 1;
        registry.file.stores.push(record.clone());
        self.save_registry(&registry.file).await?;
        debug!("created store {} in {}", name, dir.display());

        let cache: Arc<dyn Cache> = self.load(&mut registry, &record).await?;
        Ok(cache)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        let registry = self.registry.lock().await;
        Ok(registry.file.stores.iter().any(|s| s.name == name))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let registry = self.registry.lock().await;
        Ok(registry.file.stores.iter().map(|s| s.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut registry = self.registry.lock().await;
        let Some(pos) = registry.file.stores.iter().position(|s| s.name == name) else {
            return Ok(false);
        };

        let record = registry.file.stores.remove(pos);
        registry.loaded.remove(name);
        self.save_registry(&registry.file).await?;

        let dir = self.root.join(&record.dir);
        if let Err(e) = fs::remove_dir_all(&dir).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("removing {} failed: {}", dir.display(), e);
            }
        }
        Ok(true)
    }

    async fn match_url(&self, url: &str) -> Result<Option<FetchResponse>> {
        let caches = {
            let mut registry = self.registry.lock().await;
            let records = registry.file.stores.clone();
            let mut caches = Vec::with_capacity(records.len());
            for record in &records {
                caches.push(self.load(&mut registry, record).await?);
            }
            caches
        };

        for cache in caches {
            if let Some(response) = cache.get(url).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}
