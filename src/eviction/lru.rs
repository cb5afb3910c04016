//! LRU Wrapper
//!
//! Bounds any storage backend by evicting the least recently used entry.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheStats, MemoryCache, NodeId, RecencyList};
use crate::error::{CacheError, Result};
use crate::eviction::{BoundedCache, PREALLOCATED_SLOTS};

// == LRU Entry ==
/// What the LRU wrapper stores in its backend: the caller's value plus the
/// position of its key in the recency list.
#[derive(Debug, Clone)]
pub struct LruEntry<V> {
    value: V,
    node: NodeId,
}

impl<V> LruEntry<V> {
    pub fn value(&self) -> &V {
        &self.value
    }
}

#[derive(Debug)]
struct LruState<K> {
    order: RecencyList<K>,
    stats: CacheStats,
}

// == LRU Cache ==
/// Capacity-bounded cache that evicts the least recently used key.
///
/// `store` inserts at the most recently used end, `get` moves the key there,
/// and `replace` counts as a fresh store. When a store pushes the count past
/// capacity, the key at the least recently used end is removed from the
/// backend in the same critical section.
///
/// The wrapper lock is held around every backend call, so the recency list
/// and the backend always hold the same key set.
#[derive(Debug)]
pub struct LruCache<K, V, B = MemoryCache<K, LruEntry<V>>> {
    capacity: usize,
    backend: B,
    state: Mutex<LruState<K>>,
    _value: PhantomData<fn() -> V>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    // == Constructor ==
    /// Creates an LRU cache over a fresh [`MemoryCache`].
    pub fn new(capacity: usize) -> Self {
        Self::assemble(capacity, MemoryCache::new())
    }
}

impl<K, V, B> LruCache<K, V, B>
where
    K: Clone + Debug + Send,
    B: Cache<K, LruEntry<V>>,
{
    /// Creates an LRU cache over a caller-supplied backend.
    ///
    /// The backend must be empty: the wrapper cannot tell how recently
    /// pre-existing keys were used.
    pub fn with_backend(capacity: usize, backend: B) -> Result<Self> {
        let existing = backend.keys()?.len();
        if existing > 0 {
            return Err(CacheError::CacheNotEmpty(existing));
        }
        Ok(Self::assemble(capacity, backend))
    }

    fn assemble(capacity: usize, backend: B) -> Self {
        info!(capacity, "Creating LRU cache");
        Self {
            capacity,
            backend,
            state: Mutex::new(LruState {
                order: RecencyList::with_capacity(capacity.min(PREALLOCATED_SLOTS)),
                stats: CacheStats::new(capacity),
            }),
            _value: PhantomData,
        }
    }

    // == Recency ==
    /// Returns the key most recently stored or fetched.
    pub fn most_recently_used_key(&self) -> Option<K> {
        self.state.lock().order.peek_newest().cloned()
    }

    /// Returns the key that the next overflowing store would evict.
    pub fn least_recently_used_key(&self) -> Option<K> {
        self.state.lock().order.peek_oldest().cloned()
    }

    /// Returns the wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // == Locked Operations ==
    fn store_locked(&self, state: &mut LruState<K>, key: K, value: V) -> Result<()> {
        let node = state.order.push_front(key.clone());
        if let Err(err) = self.backend.store(key, LruEntry { value, node }) {
            state.order.remove(node);
            return Err(err);
        }
        state.stats.record_store();

        if state.order.len() > self.capacity {
            self.evict_locked(state)?;
        }
        Ok(())
    }

    /// Unlinks the tail only once the backend has dropped it, so a refused
    /// removal leaves the list and the backend with the same keys.
    fn evict_locked(&self, state: &mut LruState<K>) -> Result<()> {
        let Some(node) = state.order.oldest_id() else {
            return Ok(());
        };
        let Some(victim) = state.order.get(node).cloned() else {
            return Ok(());
        };
        if let Err(err) = self.backend.remove(&victim) {
            warn!(key = ?victim, error = %err, "Backend refused to evict entry");
            return Err(err);
        }
        state.order.remove(node);
        state.stats.record_eviction();
        debug!(key = ?victim, "Evicted least recently used entry");
        Ok(())
    }

    fn remove_locked(&self, state: &mut LruState<K>, key: &K) -> Result<()> {
        let entry = self.backend.get(key)?;
        self.backend.remove(key)?;
        if state.order.remove(entry.node).is_none() {
            warn!(key = ?key, "Removed key had no recency node");
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, LruState<K>> {
        self.state.lock()
    }
}

// == Cache ==
impl<K, V, B> Cache<K, V> for LruCache<K, V, B>
where
    K: Clone + Debug + Send,
    V: Send,
    B: Cache<K, LruEntry<V>>,
{
    fn store(&self, key: K, value: V) -> Result<()> {
        let mut state = self.lock();
        self.store_locked(&mut state, key, value)
    }

    fn get(&self, key: &K) -> Result<V> {
        let mut state = self.lock();
        match self.backend.get(key) {
            Ok(entry) => {
                if !state.order.move_to_front(entry.node) {
                    warn!(key = ?key, "Fetched key had no recency node");
                }
                state.stats.record_hit();
                Ok(entry.value)
            }
            Err(err) => {
                if err.is_does_not_exist() {
                    state.stats.record_miss();
                }
                Err(err)
            }
        }
    }

    fn remove(&self, key: &K) -> Result<()> {
        let mut state = self.lock();
        self.remove_locked(&mut state, key)
    }

    fn replace(&self, key: K, value: V) -> Result<()> {
        let mut state = self.lock();
        self.remove_locked(&mut state, &key)?;
        self.store_locked(&mut state, key, value)
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        self.backend.clear()?;
        state.order.clear();
        state.stats.reset();
        Ok(())
    }

    /// Keys from most to least recently used.
    fn keys(&self) -> Result<Vec<K>> {
        Ok(self.lock().order.iter().cloned().collect())
    }
}

// == Bounded Cache ==
impl<K, V, B> BoundedCache<K, V> for LruCache<K, V, B>
where
    K: Clone + Debug + Send,
    V: Send,
    B: Cache<K, LruEntry<V>>,
{
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn count(&self) -> usize {
        self.lock().order.len()
    }

    fn eviction_candidate(&self) -> Option<K> {
        self.least_recently_used_key()
    }

    fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.entries = state.order.len();
        stats
    }
}
