//! Cache error types.

use thiserror::Error;

/// Errors that can occur when talking to a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The Redis backend returned an error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A backend-specific failure.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A cached value could not be (de)serialized.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
