//! Read-through cache
//!
//! The cache is an optimization, never a source of truth. Entries are JSON
//! blobs under the keys in [`keys`], written on read misses and deleted after
//! successful writes. Any cache failure degrades to a direct store read.
//!
//! ```text
//! project:<project_id>        → Project           (TTL 10 min)
//! tasks:project:<project_id>  → Vec<Task>, all    (TTL 5 min)
//! rate_limit:<client_ip>      → request counter   (TTL 60 s)
//! ```

pub mod layer;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use layer::CacheLayer;
pub use memory::MemoryCache;
pub use redis::{RedisCache, RedisConfig};

/// Cache backend errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cannot reach the backend
    #[error("cache connection error: {0}")]
    Connection(String),

    /// Backend rejected a command
    #[error("cache command error: {0}")]
    Command(String),

    /// Command did not finish in time
    #[error("cache command timed out")]
    Timeout,

    /// Invalid backend configuration
    #[error("cache configuration error: {0}")]
    Config(String),
}

/// Key/value operations the services and rate limiter need
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Removes keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Increments a counter, starting its expiry window on first use
    async fn increment(&self, key: &str, window: Duration) -> Result<i64, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// Cache key builders
pub mod keys {
    use uuid::Uuid;

    pub fn project(id: Uuid) -> String {
        format!("project:{id}")
    }

    /// Unfiltered task list of a project
    pub fn project_tasks(project_id: Uuid) -> String {
        format!("tasks:project:{project_id}")
    }

    pub fn rate_limit(client: &str) -> String {
        format!("rate_limit:{client}")
    }
}
