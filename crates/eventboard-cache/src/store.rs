//! Storage backends for the response cache.
//!
//! A [`CacheStore`] is a plain key-value store with per-entry expiry. It
//! reports failures honestly; turning failures into cache misses is the job
//! of [`ResponseCache`](crate::ResponseCache).

use async_trait::async_trait;
use std::time::Duration;

/// Error type for cache store operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache is closed")]
    Closed,
}

#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Returns the value if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores or overwrites `key`, restarting its time-to-live.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`. Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Removes every key matching a Redis-style glob pattern and returns the
    /// number of removed keys.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), CacheError>;

    fn backend_name(&self) -> &'static str;
}

/// Store that never holds anything. Used when caching is disabled or the
/// configured backend could not be reached at startup.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait]
impl CacheStore for NoopStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Ok(0)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "noop"
    }
}
