//! Configuration Module
//!
//! Describes a bounded cache: how many entries it holds and which policy
//! evicts them. Values come from environment variables or JSON.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Eviction Policy ==
/// Which entry a full cache drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used
    #[default]
    Lru,
    /// Least frequently used
    Lfu,
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "lfu" => Ok(EvictionPolicy::Lfu),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown eviction policy {:?}, expected \"lru\" or \"lfu\"",
                other
            ))),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => f.write_str("lru"),
            EvictionPolicy::Lfu => f.write_str("lfu"),
        }
    }
}

/// Bounded cache parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Eviction policy applied once the cache is full
    pub policy: EvictionPolicy,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_POLICY` - `lru` or `lfu` (default: lru)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity),
            policy: env::var("CACHE_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.policy),
        }
    }

    /// Parses a JSON document such as `{"capacity": 64, "policy": "lfu"}`.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| CacheError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    // == Validate ==
    /// Rejects configurations that cannot hold any entry.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            policy: EvictionPolicy::Lru,
        }
    }
}
