//! Memory Cache Module
//!
//! In-memory storage backend with per-key expiration and update timers.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::{Cache, Entry, ExpiringCache, Lifetime, UpdateFn, UpdatingExpiringCache};
use crate::error::{CacheError, Result};
use crate::tasks::{Schedule, TimerRegistry};

// == Shared State ==
/// Entries and their timers, guarded by one lock.
#[derive(Debug)]
struct State<K, V> {
    entries: HashMap<K, Entry<V>>,
    timers: TimerRegistry<K>,
}

impl<K, V> State<K, V>
where
    K: Hash + Eq + Clone + Debug,
{
    fn insert(&mut self, key: K, entry: Entry<V>) -> Result<()> {
        if self.entries.contains_key(&key) {
            return Err(CacheError::already_exists(&key));
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Removes an entry, cancelling its timer first.
    fn take(&mut self, key: &K) -> Result<Entry<V>> {
        if !self.entries.contains_key(key) {
            return Err(CacheError::does_not_exist(key));
        }
        self.timers.cancel(key);
        self.entries
            .remove(key)
            .ok_or_else(|| CacheError::does_not_exist(key))
    }
}

// == Memory Cache ==
/// Thread-safe in-memory backend.
///
/// Time-limited and self-updating entries are driven by tokio tasks spawned
/// on the runtime captured at construction. Permanent entries never touch the
/// runtime, so a `MemoryCache` used only through [`Cache`] works outside of
/// tokio as well.
#[derive(Debug)]
pub struct MemoryCache<K, V> {
    state: Arc<Mutex<State<K, V>>>,
    runtime: Option<Handle>,
}

impl<K, V> Default for MemoryCache<K, V> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
                timers: TimerRegistry::default(),
            })),
            runtime: Handle::try_current().ok(),
        }
    }
}

impl<K, V> MemoryCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    // == Constructors ==
    /// Creates an empty cache, capturing the current tokio runtime if any.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache whose timers run on `runtime`.
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
            ..Self::default()
        }
    }

    // == Introspection ==
    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Returns the lifetime of a stored entry.
    pub fn lifetime(&self, key: &K) -> Result<Lifetime> {
        self.state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.lifetime)
            .ok_or_else(|| CacheError::does_not_exist(key))
    }

    /// Returns the remaining ttl of an expiring entry, `None` for entries
    /// that do not expire.
    pub fn time_to_live(&self, key: &K) -> Result<Option<Duration>> {
        self.state
            .lock()
            .entries
            .get(key)
            .map(Entry::time_to_live)
            .ok_or_else(|| CacheError::does_not_exist(key))
    }

    /// Returns true if `key` has an armed expiration or update timer.
    pub fn has_timer(&self, key: &K) -> bool {
        self.state.lock().timers.contains(key)
    }

    /// Number of timers currently armed.
    pub fn active_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    // == Runtime ==
    fn runtime(&self) -> Result<Handle> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current().map_err(|err| {
                CacheError::unexpected("background timers need a tokio runtime", err)
            }),
        }
    }

    // == Expiration Timer ==
    /// Arms a one-shot timer that deletes `key` once `ttl` elapses.
    fn arm_expiration(
        &self,
        state: &mut State<K, V>,
        runtime: &Handle,
        key: K,
        ttl: Duration,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.state);
        let owned_key = key.clone();

        state
            .timers
            .install(runtime, key, Schedule::Once(ttl), move |generation| {
                let Some(shared) = weak.upgrade() else {
                    return ControlFlow::Break(());
                };
                let mut state = shared.lock();
                if !state.timers.is_current(&owned_key, generation) {
                    return ControlFlow::Break(());
                }

                state.timers.retire(&owned_key, generation);
                let removed = state.entries.remove(&owned_key).is_some();
                drop(state);

                if !removed {
                    timer_invariant_violated(&owned_key, generation);
                }
                debug!(key = ?owned_key, "Entry expired");
                ControlFlow::Break(())
            })
    }

    // == Update Timer ==
    /// Arms a repeating timer that rewrites `key` through `update` every
    /// `period`.
    fn arm_update(
        &self,
        state: &mut State<K, V>,
        runtime: &Handle,
        key: K,
        update: UpdateFn<V>,
        period: Duration,
    ) -> JoinHandle<()> {
        let weak: Weak<Mutex<State<K, V>>> = Arc::downgrade(&self.state);
        let owned_key = key.clone();

        state
            .timers
            .install(runtime, key, Schedule::Every(period), move |generation| {
                let Some(shared) = weak.upgrade() else {
                    return ControlFlow::Break(());
                };
                let mut state = shared.lock();
                if !state.timers.is_current(&owned_key, generation) {
                    return ControlFlow::Break(());
                }

                let updated = match state.entries.get_mut(&owned_key) {
                    Some(entry) => {
                        entry.value = update(&entry.value);
                        true
                    }
                    None => false,
                };
                drop(state);

                if !updated {
                    timer_invariant_violated(&owned_key, generation);
                }
                ControlFlow::Continue(())
            })
    }
}

/// A live timer found its entry missing: some path removed the entry without
/// cancelling the timer.
fn timer_invariant_violated<K: Debug>(key: &K, generation: u64) -> ! {
    error!(
        key = ?key,
        generation,
        "Timer fired for an entry that no longer exists"
    );
    panic!(
        "cache timer {} fired for missing key {:?}: entry removed without cancelling its timer",
        generation, key
    );
}

// == Cache ==
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    fn store(&self, key: K, value: V) -> Result<()> {
        self.state.lock().insert(key, Entry::permanent(value))
    }

    fn get(&self, key: &K) -> Result<V> {
        self.state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| CacheError::does_not_exist(key))
    }

    fn remove(&self, key: &K) -> Result<()> {
        self.state.lock().take(key).map(|_| ())
    }

    fn replace(&self, key: K, value: V) -> Result<()> {
        let mut state = self.state.lock();
        state.take(&key)?;
        state.insert(key, Entry::permanent(value))
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.timers.cancel_all();
        let removed = state.entries.len();
        state.entries.clear();

        info!(removed, "Memory cache cleared");
        Ok(())
    }

    fn keys(&self) -> Result<Vec<K>> {
        Ok(self.state.lock().entries.keys().cloned().collect())
    }
}

// == Expiring Cache ==
impl<K, V> ExpiringCache<K, V> for MemoryCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    fn store_with_expiration(&self, key: K, value: V, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Err(CacheError::NonPositivePeriod("ttl"));
        }
        let runtime = self.runtime()?;

        let mut state = self.state.lock();
        state.insert(key.clone(), Entry::expiring(value, ttl))?;
        self.arm_expiration(&mut state, &runtime, key.clone(), ttl);

        debug!(key = ?key, ?ttl, "Stored expiring entry");
        Ok(())
    }

    fn replace_with_expiration(&self, key: K, value: V, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Err(CacheError::NonPositivePeriod("ttl"));
        }
        let runtime = self.runtime()?;

        let mut state = self.state.lock();
        state.take(&key)?;
        state.insert(key.clone(), Entry::expiring(value, ttl))?;
        self.arm_expiration(&mut state, &runtime, key, ttl);
        Ok(())
    }

    fn expire(&self, key: &K, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return self.state.lock().take(key).map(|_| ());
        }
        let runtime = self.runtime()?;

        let mut state = self.state.lock();
        match state.entries.get_mut(key) {
            Some(entry) => entry.lifetime = Lifetime::expiring(ttl),
            None => return Err(CacheError::does_not_exist(key)),
        }
        // install() cancels whatever timer the key had before.
        self.arm_expiration(&mut state, &runtime, key.clone(), ttl);

        debug!(key = ?key, ?ttl, "Expiration reset");
        Ok(())
    }
}

// == Updating Expiring Cache ==
impl<K, V> UpdatingExpiringCache<K, V> for MemoryCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    fn store_with_update(
        &self,
        key: K,
        initial: V,
        update: Option<UpdateFn<V>>,
        period: Duration,
    ) -> Result<()> {
        let update = update.ok_or(CacheError::NilUpdateFunc)?;
        if period.is_zero() {
            return Err(CacheError::NonPositivePeriod("period"));
        }
        let runtime = self.runtime()?;

        let mut state = self.state.lock();
        state.insert(key.clone(), Entry::updating(initial, period))?;
        self.arm_update(&mut state, &runtime, key.clone(), update, period);

        debug!(key = ?key, ?period, "Stored updating entry");
        Ok(())
    }

    fn replace_with_update(
        &self,
        key: K,
        initial: V,
        update: Option<UpdateFn<V>>,
        period: Duration,
    ) -> Result<()> {
        let update = update.ok_or(CacheError::NilUpdateFunc)?;
        if period.is_zero() {
            return Err(CacheError::NonPositivePeriod("period"));
        }
        let runtime = self.runtime()?;

        let mut state = self.state.lock();
        state.take(&key)?;
        state.insert(key.clone(), Entry::updating(initial, period))?;
        self.arm_update(&mut state, &runtime, key, update, period);
        Ok(())
    }
}
