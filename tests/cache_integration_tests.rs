//! Integration Tests for the Cache Crate
//!
//! Exercises the public API end to end: the memory backend with its timers,
//! both eviction wrappers, and configuration-driven construction.

use std::sync::Arc;
use std::time::Duration;

use policy_cache::eviction::{LfuEntry, LruEntry};
use policy_cache::{
    build_cache, BoundedCache, Cache, CacheConfig, EvictionPolicy, ExpiringCache, LfuCache,
    LruCache, MemoryCache, UpdateFn, UpdatingExpiringCache,
};
use tokio::time::sleep;

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "policy_cache=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn increment() -> Option<UpdateFn<u64>> {
    Some(Arc::new(|value: &u64| value + 1))
}

// == Basic Storage ==

#[test]
fn test_missing_key_errors() {
    init_tracing();
    let cache: MemoryCache<String, String> = MemoryCache::new();
    let key = "absent".to_string();

    assert!(cache.get(&key).unwrap_err().is_does_not_exist());
    assert!(cache.remove(&key).unwrap_err().is_does_not_exist());
    assert!(cache.replace(key.clone(), "v".into()).unwrap_err().is_does_not_exist());
}

#[test]
fn test_store_remove_store_again() {
    let cache: MemoryCache<&str, i32> = MemoryCache::new();

    cache.store("k", 1).unwrap();
    assert!(cache.store("k", 2).unwrap_err().is_already_exists());
    cache.remove(&"k").unwrap();
    cache.store("k", 3).unwrap();

    assert_eq!(cache.get(&"k").unwrap(), 3);
    assert_eq!(cache.keys().unwrap(), vec!["k"]);
}

// == Expiration ==

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() {
    init_tracing();
    let cache: MemoryCache<&str, &str> = MemoryCache::new();
    cache
        .store_with_expiration("session", "token", Duration::from_secs(3))
        .unwrap();

    sleep(Duration::from_millis(2900)).await;
    assert_eq!(cache.get(&"session").unwrap(), "token");

    sleep(Duration::from_millis(200)).await;
    assert!(cache.get(&"session").unwrap_err().is_does_not_exist());
    assert_eq!(cache.active_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_expire_pushes_deadline_back() {
    let cache: MemoryCache<&str, u32> = MemoryCache::new();
    cache
        .store_with_expiration("k", 7, Duration::from_secs(5))
        .unwrap();

    sleep(Duration::from_secs(4)).await;
    cache.expire(&"k", Duration::from_secs(20)).unwrap();

    // The first 5s deadline has passed.
    sleep(Duration::from_secs(2)).await;
    assert_eq!(cache.get(&"k").unwrap(), 7);

    sleep(Duration::from_secs(17)).await;
    assert_eq!(cache.get(&"k").unwrap(), 7);

    sleep(Duration::from_secs(2)).await;
    assert!(cache.get(&"k").unwrap_err().is_does_not_exist());
}

#[tokio::test(start_paused = true)]
async fn test_zero_ttl_rejected() {
    let cache: MemoryCache<&str, u32> = MemoryCache::new();

    let err = cache
        .store_with_expiration("k", 1, Duration::ZERO)
        .unwrap_err();
    assert!(err.is_non_positive_period());
    assert!(cache.is_empty());
}

// == Self-Updating Entries ==

#[tokio::test(start_paused = true)]
async fn test_updating_entry_counts_periods() {
    let cache: MemoryCache<&str, u64> = MemoryCache::new();
    cache
        .store_with_update("ticks", 0, increment(), Duration::from_secs(1))
        .unwrap();

    sleep(Duration::from_millis(3500)).await;
    assert_eq!(cache.get(&"ticks").unwrap(), 3);

    cache.remove(&"ticks").unwrap();
    sleep(Duration::from_secs(5)).await;
    assert!(cache.get(&"ticks").unwrap_err().is_does_not_exist());
    assert_eq!(cache.active_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_update_requires_function() {
    let cache: MemoryCache<&str, u64> = MemoryCache::new();

    let err = cache
        .store_with_update("k", 0, None, Duration::from_secs(1))
        .unwrap_err();
    assert!(err.is_nil_update_func());
    assert!(!cache.contains_key(&"k"));
}

#[tokio::test(start_paused = true)]
async fn test_replace_stops_updates() {
    let cache: MemoryCache<&str, u64> = MemoryCache::new();
    cache
        .store_with_update("k", 10, increment(), Duration::from_secs(1))
        .unwrap();

    sleep(Duration::from_millis(1500)).await;
    cache.replace("k", 100).unwrap();

    sleep(Duration::from_secs(3)).await;
    assert_eq!(cache.get(&"k").unwrap(), 100);
}

// == LRU Wrapper ==

#[test]
fn test_lru_evicts_least_recently_used() {
    init_tracing();
    let cache: LruCache<String, u32> = LruCache::new(3);
    for (i, key) in ["a", "b", "c"].iter().enumerate() {
        cache.store(key.to_string(), i as u32).unwrap();
    }

    cache.get(&"a".to_string()).unwrap();
    cache.store("d".to_string(), 3).unwrap();

    assert!(cache.get(&"b".to_string()).unwrap_err().is_does_not_exist());
    assert_eq!(cache.count(), 3);
    assert_eq!(
        cache.keys().unwrap(),
        vec!["d".to_string(), "a".to_string(), "c".to_string()]
    );
}

#[test]
fn test_lru_rejects_populated_backend() {
    let backend: MemoryCache<&str, LruEntry<u32>> = MemoryCache::new();
    let donor: LruCache<&str, u32> = LruCache::new(1);
    donor.store("x", 1).unwrap();
    let entry = donor.backend().get(&"x").unwrap();
    backend.store("x", entry).unwrap();

    let err = LruCache::<&str, u32, _>::with_backend(4, backend).unwrap_err();
    assert!(err.is_cache_not_empty());
}

#[test]
fn test_lru_with_supplied_backend() {
    let backend: MemoryCache<&str, LruEntry<u32>> = MemoryCache::new();
    let cache: LruCache<&str, u32, _> = LruCache::with_backend(2, backend).unwrap();

    cache.store("a", 1).unwrap();
    cache.store("b", 2).unwrap();
    cache.store("c", 3).unwrap();

    assert!(!cache.backend().contains_key(&"a"));
    assert_eq!(cache.backend().len(), 2);
    assert_eq!(cache.stats().evictions, 1);
}

// == LFU Wrapper ==

#[test]
fn test_lfu_evicts_least_frequently_used() {
    let cache: LfuCache<&str, u32> = LfuCache::new(3);
    cache.store("a", 1).unwrap();
    cache.store("b", 2).unwrap();
    cache.store("c", 3).unwrap();

    for _ in 0..3 {
        cache.get(&"a").unwrap();
    }
    cache.get(&"c").unwrap();

    cache.store("d", 4).unwrap();
    assert!(cache.get(&"b").unwrap_err().is_does_not_exist());
    assert_eq!(cache.frequency(&"a").unwrap(), 3);
    assert_eq!(cache.least_frequently_used_key(), Some("d"));
}

#[test]
fn test_lfu_rejects_populated_backend() {
    let donor: LfuCache<&str, u32> = LfuCache::new(1);
    donor.store("x", 1).unwrap();

    let backend: MemoryCache<&str, LfuEntry<u32>> = MemoryCache::new();
    backend.store("x", donor.backend().get(&"x").unwrap()).unwrap();

    let err = LfuCache::<&str, u32, _>::with_backend(4, backend).unwrap_err();
    assert!(err.is_cache_not_empty());
}

// == Configuration ==

#[test]
fn test_build_cache_from_json() {
    let config = CacheConfig::from_json(r#"{"capacity": 2, "policy": "lfu"}"#).unwrap();
    assert_eq!(config.policy, EvictionPolicy::Lfu);

    let cache = build_cache::<u32, &str>(&config).unwrap();
    cache.store(1, "one").unwrap();
    cache.store(2, "two").unwrap();
    cache.get(&2).unwrap();
    cache.store(3, "three").unwrap();

    assert!(cache.get(&1).unwrap_err().is_does_not_exist());
    assert_eq!(cache.count(), 2);
    assert_eq!(cache.stats().capacity, 2);
}

// == Concurrency ==

#[test]
fn test_concurrent_access_on_distinct_keys() {
    let cache: Arc<MemoryCache<String, usize>> = Arc::new(MemoryCache::new());

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let cache = Arc::clone(&cache);
            scope.spawn(move || {
                for i in 0..100 {
                    let key = format!("w{}-{}", worker, i);
                    cache.store(key.clone(), i).unwrap();
                    assert_eq!(cache.get(&key).unwrap(), i);
                    if i % 2 == 0 {
                        cache.remove(&key).unwrap();
                    }
                }
            });
        }
    });

    assert_eq!(cache.len(), 8 * 50);
}

#[test]
fn test_concurrent_lru_respects_capacity() {
    let cache: Arc<LruCache<u32, u32>> = Arc::new(LruCache::new(16));

    std::thread::scope(|scope| {
        for worker in 0..4u32 {
            let cache = Arc::clone(&cache);
            scope.spawn(move || {
                for i in 0..200 {
                    let key = worker * 1000 + i;
                    cache.store(key, i).unwrap();
                    let _ = cache.get(&key);
                }
            });
        }
    });

    assert_eq!(cache.count(), 16);
    assert_eq!(cache.backend().len(), 16);
    assert_eq!(cache.stats().evictions, 4 * 200 - 16);
}
