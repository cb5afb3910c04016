//! Error types for the cache library
//!
//! Provides unified error handling using thiserror. Callers distinguish
//! failures through [`CacheError::kind`] or the `is_*` predicates rather than
//! by matching on messages.

use thiserror::Error;

// == Error Kind ==
/// Discriminant of a [`CacheError`], independent of its message or cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyExists,
    DoesNotExist,
    NonPositivePeriod,
    NilUpdateFunc,
    InvalidKeyType,
    InvalidValueType,
    UnrecoverableValue,
    ClearedCache,
    CacheNotEmpty,
    InvalidConfig,
    Unexpected,
}

// == Cache Error Enum ==
/// Unified error type for every cache backend and wrapper.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is already present
    #[error("key {0} is already in use")]
    AlreadyExists(String),

    /// Key is not present
    #[error("key {0} does not exist")]
    DoesNotExist(String),

    /// A ttl or update period of zero was supplied
    #[error("{0} must be greater than zero")]
    NonPositivePeriod(&'static str),

    /// An updating entry was stored without an update function
    #[error("update function cannot be empty")]
    NilUpdateFunc,

    /// Backend cannot accept this key type
    #[error("invalid key type: {0}")]
    InvalidKeyType(String),

    /// Backend cannot accept this value type
    #[error("invalid value type: {0}")]
    InvalidValueType(String),

    /// Value does not survive a serialization round trip
    #[error("value cannot be recovered after serialization: {0}")]
    UnrecoverableValue(String),

    /// Backend was cleared and can no longer be used
    #[error("cannot reuse a cleared cache")]
    ClearedCache,

    /// Wrapper was handed a backend that already holds keys
    #[error("supplied cache must be empty, found {0} keys")]
    CacheNotEmpty(usize),

    /// Configuration value rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend-specific failure
    #[error("{message}")]
    Unexpected {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl CacheError {
    // == Constructors ==
    pub(crate) fn already_exists(key: &impl std::fmt::Debug) -> Self {
        CacheError::AlreadyExists(format!("{:?}", key))
    }

    pub(crate) fn does_not_exist(key: &impl std::fmt::Debug) -> Self {
        CacheError::DoesNotExist(format!("{:?}", key))
    }

    /// Wraps a backend-specific failure.
    pub fn unexpected(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        CacheError::Unexpected {
            message: message.into(),
            source: source.into(),
        }
    }

    // == Kind ==
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            CacheError::DoesNotExist(_) => ErrorKind::DoesNotExist,
            CacheError::NonPositivePeriod(_) => ErrorKind::NonPositivePeriod,
            CacheError::NilUpdateFunc => ErrorKind::NilUpdateFunc,
            CacheError::InvalidKeyType(_) => ErrorKind::InvalidKeyType,
            CacheError::InvalidValueType(_) => ErrorKind::InvalidValueType,
            CacheError::UnrecoverableValue(_) => ErrorKind::UnrecoverableValue,
            CacheError::ClearedCache => ErrorKind::ClearedCache,
            CacheError::CacheNotEmpty(_) => ErrorKind::CacheNotEmpty,
            CacheError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            CacheError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    // == Predicates ==
    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    pub fn is_does_not_exist(&self) -> bool {
        self.kind() == ErrorKind::DoesNotExist
    }

    pub fn is_non_positive_period(&self) -> bool {
        self.kind() == ErrorKind::NonPositivePeriod
    }

    pub fn is_nil_update_func(&self) -> bool {
        self.kind() == ErrorKind::NilUpdateFunc
    }

    pub fn is_invalid_key_type(&self) -> bool {
        self.kind() == ErrorKind::InvalidKeyType
    }

    pub fn is_invalid_value_type(&self) -> bool {
        self.kind() == ErrorKind::InvalidValueType
    }

    pub fn is_unrecoverable_value(&self) -> bool {
        self.kind() == ErrorKind::UnrecoverableValue
    }

    /// A cleared backend must be discarded.
    pub fn is_cleared_cache(&self) -> bool {
        self.kind() == ErrorKind::ClearedCache
    }

    pub fn is_cache_not_empty(&self) -> bool {
        self.kind() == ErrorKind::CacheNotEmpty
    }

    pub fn is_unexpected(&self) -> bool {
        self.kind() == ErrorKind::Unexpected
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
