//! Policy Cache - A pluggable in-process key-value cache
//!
//! Provides an in-memory backend with per-key expiration and self-updating
//! entries, plus LRU and LFU wrappers that bound any backend's size.

pub mod cache;
pub mod config;
pub mod error;
pub mod eviction;
pub mod tasks;

pub use cache::{Cache, CacheStats, ExpiringCache, MemoryCache, UpdateFn, UpdatingExpiringCache};
pub use config::{CacheConfig, EvictionPolicy};
pub use error::{CacheError, ErrorKind, Result};
pub use eviction::{build_cache, BoundedCache, LfuCache, LruCache};
