//! Eviction Module
//!
//! Capacity-bounded wrappers that compose an eviction policy over any
//! storage backend.

mod lfu;
mod lru;

use std::fmt::Debug;
use std::hash::Hash;

use tracing::info;

use crate::cache::{Cache, CacheStats};
use crate::config::{CacheConfig, EvictionPolicy};
use crate::error::Result;

pub use lfu::{LfuCache, LfuEntry};
pub use lru::{LruCache, LruEntry};

/// Upper bound on the ordering slots reserved up front. Larger caches grow
/// on demand, so `usize::MAX` works as an unbounded capacity.
pub(crate) const PREALLOCATED_SLOTS: usize = 1024;

// == Bounded Cache ==
/// A cache holding at most `capacity` entries.
pub trait BoundedCache<K, V>: Cache<K, V> {
    /// Maximum number of entries.
    fn capacity(&self) -> usize;

    /// Number of entries currently held.
    fn count(&self) -> usize;

    fn is_full(&self) -> bool {
        self.count() >= self.capacity()
    }

    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Key the policy would evict next, if any.
    fn eviction_candidate(&self) -> Option<K>;

    fn stats(&self) -> CacheStats;
}

// == Builder ==
/// Creates a bounded in-memory cache as described by `config`.
pub fn build_cache<K, V>(config: &CacheConfig) -> Result<Box<dyn BoundedCache<K, V>>>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    config.validate()?;
    info!(
        "Building {:?} cache with capacity {}",
        config.policy, config.capacity
    );

    Ok(match config.policy {
        EvictionPolicy::Lru => Box::new(LruCache::<K, V>::new(config.capacity)),
        EvictionPolicy::Lfu => Box::new(LfuCache::<K, V>::new(config.capacity)),
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_lru_from_config() {
        let config = CacheConfig {
            capacity: 2,
            policy: EvictionPolicy::Lru,
        };
        let cache = build_cache::<String, u32>(&config).unwrap();

        cache.store("a".to_string(), 1).unwrap();
        cache.store("b".to_string(), 2).unwrap();
        cache.get(&"a".to_string()).unwrap();
        assert_eq!(cache.eviction_candidate(), Some("b".to_string()));

        cache.store("c".to_string(), 3).unwrap();
        assert!(cache.get(&"b".to_string()).unwrap_err().is_does_not_exist());
        assert!(cache.is_full());
    }

    #[test]
    fn test_build_lfu_from_config() {
        let config = CacheConfig {
            capacity: 2,
            policy: EvictionPolicy::Lfu,
        };
        let cache = build_cache::<u32, u32>(&config).unwrap();

        cache.store(1, 1).unwrap();
        cache.store(2, 2).unwrap();
        cache.get(&1).unwrap();
        assert_eq!(cache.eviction_candidate(), Some(2));
        assert_eq!(cache.capacity(), 2);
    }

    #[test]
    fn test_build_rejects_zero_capacity() {
        let config = CacheConfig {
            capacity: 0,
            policy: EvictionPolicy::Lru,
        };
        let err = build_cache::<u32, u32>(&config).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_build_with_huge_capacity() {
        for policy in [EvictionPolicy::Lru, EvictionPolicy::Lfu] {
            let config = CacheConfig {
                capacity: 1 << 40,
                policy,
            };
            let cache = build_cache::<u32, u32>(&config).unwrap();
            cache.store(1, 1).unwrap();
            assert_eq!(cache.get(&1).unwrap(), 1);
            assert_eq!(cache.capacity(), 1 << 40);
        }
    }
}
