use std::time::Duration;

use async_trait::async_trait;

use crate::{CacheKey, Result};

/// A byte-oriented key-value cache with per-entry TTL.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the cached bytes, or `None` on a miss or expired entry.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;

    /// Stores bytes under `key` for `ttl`.
    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Removes `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &CacheKey) -> Result<()>;
}
