//! Redis cache backend
//!
//! Wraps `redis::aio::ConnectionManager`, which reconnects on its own after a
//! dropped connection. Every command runs under the configured timeout so a
//! hung Redis degrades to a cache miss instead of stalling a request.
//!
//! # Example
//!
//! ```no_run
//! use taskboard_shared::cache::{CacheBackend, RedisCache, RedisConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = RedisCache::new(RedisConfig {
//!     url: "redis://localhost:6379".to_string(),
//!     command_timeout_secs: 5,
//! })
//! .await?;
//!
//! cache.ping().await?;
//! # Ok(())
//! # }
//! ```

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use std::future::Future;
use std::time::Duration;

impl From<RedisError> for CacheError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Command(err.to_string())
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    ///
    /// Format: redis://[username:password@]host:port[/db]
    pub url: String,

    /// Per-command timeout in seconds
    pub command_timeout_secs: u64,
}

/// Redis-backed [`CacheBackend`]
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    timeout: Duration,
}

impl RedisCache {
    /// Connects to Redis
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn new(config: RedisConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::Config(format!("Invalid Redis URL: {}", e)))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!(url = %sanitize_url(&config.url), "Redis cache connected");

        Ok(Self {
            manager,
            timeout: Duration::from_secs(config.command_timeout_secs),
        })
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout)?
            .map_err(CacheError::from)
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.manager.clone();
        self.bounded(redis::cmd("GET").arg(key).query_async(&mut conn))
            .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        self.bounded(
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .query_async::<_, ()>(&mut conn),
        )
        .await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        self.bounded(redis::cmd("DEL").arg(keys).query_async(&mut conn))
            .await
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<i64, CacheError> {
        // INCR and the window's EXPIRE must land together, or a counter
        // could outlive its window and lock the client out for good
        let script = redis::Script::new(
            r#"
            local count = redis.call('INCR', KEYS[1])
            if count == 1 then
                redis.call('EXPIRE', KEYS[1], ARGV[1])
            end
            return count
            "#,
        );

        let mut conn = self.manager.clone();
        self.bounded(
            script
                .key(key)
                .arg(window.as_secs().max(1))
                .invoke_async(&mut conn),
        )
        .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let pong: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;

        if pong == "PONG" {
            tracing::debug!("Redis health check: PONG received");
            Ok(())
        } else {
            tracing::warn!(response = %pong, "Redis health check: unexpected response");
            Err(CacheError::Command(format!("unexpected PING reply: {pong}")))
        }
    }
}

/// Replaces credentials in a Redis URL with `***:***` for logging
fn sanitize_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..scheme_end + 3];
            let host = &url[at_pos + 1..];
            return format!("{}***:***@{}", scheme, host);
        }
    }
    url.to_string()
}
