//! Read-through cache layer over a [`CacheBackend`]

use super::CacheBackend;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Serializes values as JSON and never lets a cache failure reach the caller
///
/// Reads that cannot be served from the cache (miss, backend error, or an
/// entry that no longer deserializes) fall through to the loader. Writes and
/// invalidations are best-effort and only logged on failure.
#[derive(Clone)]
pub struct CacheLayer {
    backend: Arc<dyn CacheBackend>,
}

impl CacheLayer {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Returns the cached value at `key`, or runs `loader` and caches its result
    ///
    /// Loader errors are returned untouched and nothing is cached for them.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_slice::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!(key, "cache hit");
                    return Ok(value);
                }
                Err(e) => tracing::warn!(key, error = %e, "discarding undecodable cache entry"),
            },
            Ok(None) => tracing::debug!(key, "cache miss"),
            Err(e) => tracing::warn!(key, error = %e, "cache read failed, loading from store"),
        }

        let value = loader().await?;
        self.put(key, &value, ttl).await;
        Ok(value)
    }

    /// Best-effort write
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_vec(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.backend.set(key, raw, ttl).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }

    /// Best-effort delete; a failure leaves entries to expire by TTL
    pub async fn invalidate(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }

        match self.backend.delete(keys).await {
            Ok(removed) => tracing::debug!(?keys, removed, "cache invalidated"),
            Err(e) => tracing::warn!(?keys, error = %e, "cache invalidation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn layer() -> (Arc<MemoryCache>, CacheLayer) {
        let backend = Arc::new(MemoryCache::new());
        let layer = CacheLayer::new(backend.clone());
        (backend, layer)
    }

    async fn load_counted(calls: &AtomicUsize, value: u32) -> Result<u32, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let (_, layer) = layer();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);

        let first = layer.get_or_load("k", ttl, || load_counted(&calls, 7)).await;
        let second = layer.get_or_load("k", ttl, || load_counted(&calls, 8)).await;

        assert_eq!(first, Ok(7));
        assert_eq!(second, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loader_errors_are_not_cached() {
        let (backend, layer) = layer();
        let result: Result<u32, String> = layer
            .get_or_load("k", Duration::from_secs(60), || async {
                Err("missing".to_string())
            })
            .await;

        assert_eq!(result, Err("missing".to_string()));
        assert!(!backend.contains("k").await);
    }

    #[tokio::test]
    async fn test_unavailable_backend_falls_through() {
        let (backend, layer) = layer();
        backend.set_unavailable(true);
        let calls = AtomicUsize::new(0);

        let value = layer
            .get_or_load("k", Duration::from_secs(60), || load_counted(&calls, 3))
            .await;
        layer.invalidate(&["k".to_string()]).await;

        assert_eq!(value, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_reloaded() {
        let (backend, layer) = layer();
        backend
            .set("k", b"not json".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        let calls = AtomicUsize::new(0);

        let value = layer
            .get_or_load("k", Duration::from_secs(60), || load_counted(&calls, 5))
            .await;

        assert_eq!(value, Ok(5));
        assert_eq!(backend.get("k").await.unwrap(), Some(b"5".to_vec()));
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let (backend, layer) = layer();
        layer.put("k", &1u32, Duration::from_secs(60)).await;
        assert!(backend.contains("k").await);

        layer.invalidate(&["k".to_string()]).await;
        assert!(!backend.contains("k").await);
    }
}
