//! In-process cache backend
//!
//! Used by tests and single-node development. Expiry follows the tokio clock,
//! so paused-time tests can advance past a TTL.

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// `HashMap`-backed [`CacheBackend`] with TTLs
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    unavailable: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with [`CacheError::Connection`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Whether a live entry exists, without going through the availability check
    pub async fn contains(&self, key: &str) -> bool {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .is_some_and(|entry| entry.is_live(Instant::now()))
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Connection(
                "in-memory cache marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check()?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.check()?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| entry.is_live(now))
            .count();
        Ok(removed as u64)
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<i64, CacheError> {
        self.check()?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let current = entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| std::str::from_utf8(&entry.value).ok())
            .and_then(|raw| raw.parse::<i64>().ok());

        let (count, expires_at) = match (current, entries.get(key)) {
            (Some(count), Some(entry)) => (count + 1, entry.expires_at),
            _ => (1, now + window),
        };

        entries.insert(
            key.to_string(),
            Entry {
                value: count.to_string().into_bytes(),
                expires_at,
            },
        );
        Ok(count)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = MemoryCache::new();
        cache
            .set("project:1", b"{}".to_vec(), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(cache.get("project:1").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.get("project:1").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_resets_after_window() {
        let cache = MemoryCache::new();
        let window = Duration::from_secs(60);

        assert_eq!(cache.increment("rate_limit:a", window).await.unwrap(), 1);
        assert_eq!(cache.increment("rate_limit:a", window).await.unwrap(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.increment("rate_limit:a", window).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_counts_existing() {
        let cache = MemoryCache::new();
        cache
            .set("a", b"1".to_vec(), Duration::from_secs(10))
            .await
            .unwrap();

        let removed = cache
            .delete(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!cache.contains("a").await);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let cache = MemoryCache::new();
        cache.set_unavailable(true);
        assert!(matches!(
            cache.get("a").await,
            Err(CacheError::Connection(_))
        ));
        assert!(cache.ping().await.is_err());
    }
}
