//! Cache Statistics Module
//!
//! Counters kept by the eviction wrappers.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of a bounded cache's activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Successful `get` calls
    pub hits: u64,
    /// `get` calls for absent keys
    pub misses: u64,
    /// Successful `store` calls, including those made by `replace`
    pub stores: u64,
    /// Entries dropped to make room for a new one
    pub evictions: u64,
    /// Entries currently held
    pub entries: usize,
    /// Maximum number of entries
    pub capacity: usize,
}

impl CacheStats {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    // == Ratios ==
    /// Returns hits / (hits + misses), or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }

    /// Returns entries / capacity, or 0.0 for a zero-capacity cache.
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.entries as f64 / self.capacity as f64
        }
    }

    // == Recording ==
    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_store(&mut self) {
        self.stores += 1;
    }

    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Resets the counters, keeping the capacity.
    pub(crate) fn reset(&mut self) {
        *self = Self::new(self.capacity);
    }
}
