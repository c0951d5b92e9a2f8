//! Error types for cache chains
//!
//! A miss is not an error: lookups return `Ok(None)`. Errors come from three
//! places only: resolving a chain from configuration, waiting on a blocking
//! layer's per-key latch, and copying values through a read-write layer.

use std::time::Duration;

/// Result type used throughout the cache layers
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache error type
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("Cache instances require an identifier")]
    MissingId,
    #[error("Unknown cache implementation: {0}")]
    UnknownImplementation(String),
    #[error("Unknown eviction policy: {0}")]
    UnknownEviction(String),
    #[error("Unknown property '{property}' for cache {cache}")]
    UnknownProperty { cache: String, property: String },
    #[error("Invalid value '{value}' for property '{property}' of cache {cache}")]
    InvalidProperty { cache: String, property: String, value: String },
    #[error("Invalid decorator chain for cache {cache}: {reason}")]
    InvalidChain { cache: String, reason: String },
    #[error("Timed out after {waited:?} waiting for lock on key {key} in cache {cache}")]
    LockTimeout { cache: String, key: String, waited: Duration },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// True for errors raised while resolving a chain from configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CacheError::MissingId
                | CacheError::UnknownImplementation(_)
                | CacheError::UnknownEviction(_)
                | CacheError::UnknownProperty { .. }
                | CacheError::InvalidProperty { .. }
                | CacheError::InvalidChain { .. }
        )
    }
}

impl From<bincode::error::EncodeError> for CacheError {
    fn from(err: bincode::error::EncodeError) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for CacheError {
    fn from(err: bincode::error::DecodeError) -> Self {
        CacheError::Serialization(err.to_string())
    }
}
