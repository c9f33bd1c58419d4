//! Cache Module
//!
//! The cache store protocol, in-memory and on-disk implementations of it,
//! and the oldest-first eviction policy that bounds a named store.

mod disk;
mod eviction;
mod order;
mod storage;
mod store;


// Re-export public types
pub use disk::{DiskCache, DiskStorage};
pub use eviction::prune;
pub use order::InsertionOrder;
pub use storage::{Cache, CacheStorage};
pub use store::{MemoryCache, MemoryStorage};
