//! Cache Entry Module
//!
//! Defines the structure for individual entries of the in-memory backend.

use std::time::Duration;

use tokio::time::Instant;

// == Lifetime ==
/// How long an entry lives and whether it changes on its own.
///
/// Exactly one lifetime applies to an entry. Switching lifetimes means
/// removing the entry and storing it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Stays until removed
    Permanent,
    /// Removed automatically once `deadline` passes. `deadline` is None when
    /// `ttl` reaches past the clock's range, so the entry never expires.
    Expiring {
        ttl: Duration,
        deadline: Option<Instant>,
    },
    /// Value replaced by its update function every `period`
    Updating { period: Duration },
}

impl Lifetime {
    /// Creates an expiring lifetime starting now.
    pub fn expiring(ttl: Duration) -> Self {
        Lifetime::Expiring {
            ttl,
            deadline: Instant::now().checked_add(ttl),
        }
    }

    /// Returns true for lifetimes backed by a timer.
    pub fn has_timer(&self) -> bool {
        !matches!(self, Lifetime::Permanent)
    }
}

// == Entry ==
/// A stored value with its lifetime.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    /// The stored value
    pub value: V,
    /// Lifetime chosen at store time
    pub lifetime: Lifetime,
}

impl<V> Entry<V> {
    // == Constructors ==
    pub fn permanent(value: V) -> Self {
        Self {
            value,
            lifetime: Lifetime::Permanent,
        }
    }

    pub fn expiring(value: V, ttl: Duration) -> Self {
        Self {
            value,
            lifetime: Lifetime::expiring(ttl),
        }
    }

    pub fn updating(value: V, period: Duration) -> Self {
        Self {
            value,
            lifetime: Lifetime::Updating { period },
        }
    }

    // == Time To Live ==
    /// Returns the time left before expiration, or None if the entry does
    /// not expire.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the deadline has passed but the timer has
    ///   not removed the entry yet
    /// - `Some(remaining)` for an expiring entry
    /// - `Some(Duration::MAX)` if the deadline is out of the clock's range
    /// - `None` for permanent and updating entries
    pub fn time_to_live(&self) -> Option<Duration> {
        match self.lifetime {
            Lifetime::Expiring {
                deadline: Some(deadline),
                ..
            } => Some(deadline.saturating_duration_since(Instant::now())),
            Lifetime::Expiring { deadline: None, .. } => Some(Duration::MAX),
            _ => None,
        }
    }
}
