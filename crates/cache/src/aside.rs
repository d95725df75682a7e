//! Best-effort cache-aside over any [`Cache`].
//!
//! Cache failures never surface to callers: a failing `get` is a miss, a
//! failing `set` or `delete` is logged at `warn` and counted in
//! `cache_errors_total`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Cache, CacheKey};

/// Cache-aside reads and write invalidation.
#[derive(Clone)]
pub struct CacheAside {
    cache: Arc<dyn Cache>,
}

impl CacheAside {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Returns the underlying cache.
    pub fn inner(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Reads a cached JSON value.
    ///
    /// A corrupt entry is deleted and reported as a miss.
    pub async fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                counter!("cache_misses_total", "purpose" => key.purpose().as_str()).increment(1);
                return None;
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "cache read failed, falling back to store");
                counter!("cache_errors_total", "op" => "get").increment(1);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                counter!("cache_hits_total", "purpose" => key.purpose().as_str()).increment(1);
                Some(value)
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "corrupt cache entry, discarding");
                counter!("cache_errors_total", "op" => "decode").increment(1);
                self.delete_one(key).await;
                None
            }
        }
    }

    /// Stores a JSON value, best effort.
    pub async fn write<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%key, error = %e, "failed to encode cache entry");
                counter!("cache_errors_total", "op" => "encode").increment(1);
                return;
            }
        };
        if let Err(e) = self.cache.set(key, bytes, ttl).await {
            tracing::warn!(%key, error = %e, "cache write failed");
            counter!("cache_errors_total", "op" => "set").increment(1);
        }
    }

    /// Returns the cached value or loads, caches and returns it.
    ///
    /// Concurrent misses may each load and repopulate; the last write wins.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        load: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.read(key).await {
            return Ok(hit);
        }
        let value = load().await?;
        self.write(key, &value, ttl).await;
        Ok(value)
    }

    /// Deletes every key concurrently and waits for all of them.
    ///
    /// Returns the number of deletes that failed.
    pub async fn invalidate(&self, keys: &[CacheKey]) -> usize {
        let results = join_all(keys.iter().map(|key| async move {
            let res = self.cache.delete(key).await;
            (key, res)
        }))
        .await;

        let mut failures = 0;
        for (key, res) in results {
            if let Err(e) = res {
                failures += 1;
                tracing::warn!(%key, error = %e, "cache invalidation failed");
                counter!("cache_errors_total", "op" => "delete").increment(1);
            }
        }
        failures
    }

    async fn delete_one(&self, key: &CacheKey) {
        if let Err(e) = self.cache.delete(key).await {
            tracing::warn!(%key, error = %e, "cache delete failed");
            counter!("cache_errors_total", "op" => "delete").increment(1);
        }
    }
}
