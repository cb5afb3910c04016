//! Cache Module
//!
//! Defines the storage backend contract and its in-memory implementation,
//! along with the ordering structures used by the eviction wrappers.
//!
//! A backend is anything implementing [`Cache`]. Backends that can expire
//! entries implement [`ExpiringCache`]; those that can also refresh entries
//! on a schedule implement [`UpdatingExpiringCache`]. Any backend can be
//! placed under [`LruCache`](crate::eviction::LruCache) or
//! [`LfuCache`](crate::eviction::LfuCache).

mod entry;
mod heap;
mod lru;
mod memory;
mod stats;


use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

// Re-export public types
pub use entry::{Entry, Lifetime};
pub use heap::{FrequencyHeap, HeapHandle};
pub use lru::{NodeId, RecencyList};
pub use memory::MemoryCache;
pub use stats::CacheStats;

// == Update Function ==
/// Computes the next value of a self-updating entry from its current value.
///
/// Runs while the owning backend is locked, so it must not call back into
/// the same cache.
pub type UpdateFn<V> = Arc<dyn Fn(&V) -> V + Send + Sync>;

// == Cache ==
/// Basic key-value storage.
///
/// Every operation is atomic with respect to the others on the same instance.
pub trait Cache<K, V>: Send + Sync {
    /// Stores a permanent value. Fails with `AlreadyExists` if `key` is present.
    fn store(&self, key: K, value: V) -> Result<()>;

    /// Returns the current value. Fails with `DoesNotExist` if `key` is absent.
    fn get(&self, key: &K) -> Result<V>;

    /// Removes a value. Fails with `DoesNotExist` if `key` is absent.
    fn remove(&self, key: &K) -> Result<()>;

    /// Replaces the value of an existing key with a permanent value.
    fn replace(&self, key: K, value: V) -> Result<()>;

    /// Removes every value.
    fn clear(&self) -> Result<()>;

    /// Returns the keys currently stored.
    fn keys(&self) -> Result<Vec<K>>;
}

// == Expiring Cache ==
/// A backend that can remove entries automatically after a ttl.
pub trait ExpiringCache<K, V>: Cache<K, V> {
    /// Stores a value that is removed once `ttl` elapses.
    ///
    /// Fails with `NonPositivePeriod` for a zero ttl and `AlreadyExists` if
    /// `key` is present.
    fn store_with_expiration(&self, key: K, value: V, ttl: Duration) -> Result<()>;

    /// Replaces an existing value with one that is removed after `ttl`.
    fn replace_with_expiration(&self, key: K, value: V, ttl: Duration) -> Result<()>;

    /// Resets the lifetime of an existing value without changing it.
    ///
    /// A non-zero `ttl` installs a fresh expiration timer in place of any
    /// previous one. A zero `ttl` removes the value immediately.
    fn expire(&self, key: &K, ttl: Duration) -> Result<()>;
}

// == Updating Expiring Cache ==
/// A backend that can also refresh entries periodically.
pub trait UpdatingExpiringCache<K, V>: ExpiringCache<K, V> {
    /// Stores a value that is replaced by `update(current)` every `period`.
    ///
    /// Fails with `NilUpdateFunc` when `update` is `None`, `NonPositivePeriod`
    /// for a zero period and `AlreadyExists` if `key` is present.
    fn store_with_update(
        &self,
        key: K,
        initial: V,
        update: Option<UpdateFn<V>>,
        period: Duration,
    ) -> Result<()>;

    /// Replaces an existing value with a self-updating one.
    fn replace_with_update(
        &self,
        key: K,
        initial: V,
        update: Option<UpdateFn<V>>,
        period: Duration,
    ) -> Result<()>;
}
