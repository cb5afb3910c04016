//! LFU Wrapper
//!
//! Bounds any storage backend by evicting the least frequently used entry.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheStats, FrequencyHeap, HeapHandle, MemoryCache};
use crate::error::{CacheError, Result};
use crate::eviction::{BoundedCache, PREALLOCATED_SLOTS};

// == LFU Entry ==
/// What the LFU wrapper stores in its backend: the caller's value plus the
/// handle of its key in the frequency heap.
#[derive(Debug, Clone)]
pub struct LfuEntry<V> {
    value: V,
    handle: HeapHandle,
}

impl<V> LfuEntry<V> {
    pub fn value(&self) -> &V {
        &self.value
    }
}

#[derive(Debug)]
struct LfuState<K> {
    heap: FrequencyHeap<K>,
    stats: CacheStats,
}

// == LFU Cache ==
/// Capacity-bounded cache that evicts the least frequently used key.
///
/// Every key starts at frequency 0 and gains exactly 1 per successful `get`.
/// When a store pushes the count past capacity, the heap minimum is evicted.
/// Keys with equal frequency are evicted oldest insertion first, which
/// includes the key just stored.
///
/// # Complexity
/// - `store`, `remove`, `get`: O(log n)
/// - `least_frequently_used_key`: O(1)
#[derive(Debug)]
pub struct LfuCache<K, V, B = MemoryCache<K, LfuEntry<V>>> {
    capacity: usize,
    backend: B,
    state: Mutex<LfuState<K>>,
    _value: PhantomData<fn() -> V>,
}

impl<K, V> LfuCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Creates an LFU cache over a fresh [`MemoryCache`].
    pub fn new(capacity: usize) -> Self {
        Self::assemble(capacity, MemoryCache::new())
    }
}

impl<K, V, B> LfuCache<K, V, B>
where
    K: Clone + Debug + Send,
    B: Cache<K, LfuEntry<V>>,
{
    /// Creates an LFU cache over a caller-supplied, empty backend.
    pub fn with_backend(capacity: usize, backend: B) -> Result<Self> {
        let existing = backend.keys()?.len();
        if existing > 0 {
            return Err(CacheError::CacheNotEmpty(existing));
        }
        Ok(Self::assemble(capacity, backend))
    }

    fn assemble(capacity: usize, backend: B) -> Self {
        info!(capacity, "Creating LFU cache");
        Self {
            capacity,
            backend,
            state: Mutex::new(LfuState {
                heap: FrequencyHeap::with_capacity(capacity.min(PREALLOCATED_SLOTS)),
                stats: CacheStats::new(capacity),
            }),
            _value: PhantomData,
        }
    }

    // == Frequency ==
    /// Returns the key at the root of the frequency heap.
    pub fn least_frequently_used_key(&self) -> Option<K> {
        self.lock().heap.peek_min().cloned()
    }

    /// Returns how many times `key` has been fetched since it was stored.
    pub fn frequency(&self, key: &K) -> Result<u64> {
        let state = self.lock();
        let entry = self.backend.get(key)?;
        state
            .heap
            .frequency(entry.handle)
            .ok_or_else(|| CacheError::does_not_exist(key))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // == Locked Operations ==
    fn store_locked(&self, state: &mut LfuState<K>, key: K, value: V) -> Result<()> {
        let handle = state.heap.push(key.clone());
        if let Err(err) = self.backend.store(key, LfuEntry { value, handle }) {
            state.heap.remove(handle);
            return Err(err);
        }
        state.stats.record_store();

        if state.heap.len() > self.capacity {
            self.evict_locked(state)?;
        }
        Ok(())
    }

    /// Pops the heap root only once the backend has dropped it.
    fn evict_locked(&self, state: &mut LfuState<K>) -> Result<()> {
        let Some(handle) = state.heap.peek_min_handle() else {
            return Ok(());
        };
        let Some(victim) = state.heap.get(handle).cloned() else {
            return Ok(());
        };
        if let Err(err) = self.backend.remove(&victim) {
            warn!(key = ?victim, error = %err, "Backend refused to evict entry");
            return Err(err);
        }
        let frequency = state.heap.remove(handle).map_or(0, |(_, frequency)| frequency);
        state.stats.record_eviction();
        debug!(key = ?victim, frequency, "Evicted least frequently used entry");
        Ok(())
    }

    fn remove_locked(&self, state: &mut LfuState<K>, key: &K) -> Result<()> {
        let entry = self.backend.get(key)?;
        self.backend.remove(key)?;
        if state.heap.remove(entry.handle).is_none() {
            warn!(key = ?key, "Removed key had no heap slot");
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, LfuState<K>> {
        self.state.lock()
    }
}

// == Cache ==
impl<K, V, B> Cache<K, V> for LfuCache<K, V, B>
where
    K: Clone + Debug + Send,
    V: Send,
    B: Cache<K, LfuEntry<V>>,
{
    fn store(&self, key: K, value: V) -> Result<()> {
        let mut state = self.lock();
        self.store_locked(&mut state, key, value)
    }

    fn get(&self, key: &K) -> Result<V> {
        let mut state = self.lock();
        match self.backend.get(key) {
            Ok(entry) => {
                if state.heap.increment(entry.handle).is_none() {
                    warn!(key = ?key, "Fetched key had no heap slot");
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

    /// Resets the key's frequency to zero.
    fn replace(&self, key: K, value: V) -> Result<()> {
        let mut state = self.lock();
        self.remove_locked(&mut state, &key)?;
        self.store_locked(&mut state, key, value)
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        self.backend.clear()?;
        state.heap.clear();
        state.stats.reset();
        Ok(())
    }

    /// Keys in heap order, which is not sorted by frequency.
    fn keys(&self) -> Result<Vec<K>> {
        Ok(self.lock().heap.keys().cloned().collect())
    }
}

// == Bounded Cache ==
impl<K, V, B> BoundedCache<K, V> for LfuCache<K, V, B>
where
    K: Clone + Debug + Send,
    V: Send,
    B: Cache<K, LfuEntry<V>>,
{
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn count(&self) -> usize {
        self.lock().heap.len()
    }

    fn eviction_candidate(&self) -> Option<K> {
        self.least_frequently_used_key()
    }

    fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.entries = state.heap.len();
        stats
    }
}
