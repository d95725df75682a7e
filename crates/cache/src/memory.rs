use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{Cache, CacheError, CacheKey, Result};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-memory cache with per-entry expiry.
///
/// Expired entries are dropped lazily on read.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail, to exercise best-effort paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns true if a live entry exists for `key`.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(&key.to_string())
            .is_some_and(|e| e.expires_at > Instant::now())
    }

    /// Returns the number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("cache unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        self.check()?;
        let rendered = key.to_string();
        {
            let entries = self.entries.read().await;
            match entries.get(&rendered) {
                Some(e) if e.expires_at > Instant::now() => return Ok(Some(e.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        self.entries.write().await.remove(&rendered);
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.check()?;
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        self.check()?;
        self.entries.write().await.remove(&key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::StoreId;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = InMemoryCache::new();
        let key = CacheKey::sales_report(&StoreId::new("s1"));
        cache
            .set(&key, b"{}".to_vec(), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(cache.contains(&key).await);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn failing_cache_returns_errors() {
        let cache = InMemoryCache::new();
        cache.set_failing(true);
        let key = CacheKey::sales_report(&StoreId::new("s1"));
        assert!(cache.get(&key).await.is_err());
        assert!(cache.delete(&key).await.is_err());
    }
}
