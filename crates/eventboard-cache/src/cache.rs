//! Best-effort response cache.
//!
//! [`ResponseCache`] wraps a [`CacheStore`] and never lets the store fail a
//! request: unreachable, slow or closed stores turn every lookup into a miss
//! and every write into a logged no-op. Each store call is bounded by the
//! configured operation timeout.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{CacheBackend, CacheConfig};
use crate::glob;
use crate::memory::MemoryStore;
use crate::redis_store::RedisStore;
use crate::store::{CacheError, CacheStore, NoopStore};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(String),
    Miss,
    /// The store failed or timed out; treated as a miss by callers.
    Unavailable,
}

impl CacheLookup {
    pub fn into_value(self) -> Option<String> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss | Self::Unavailable => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Notifications published to [`ResponseCache::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Hit { key: String },
    Miss { key: String },
    Stored { key: String, ttl_secs: u64 },
    Invalidated { pattern: String, deleted: u64 },
    StoreError { operation: &'static str, error: String },
    Closed,
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub stores: u64,
    pub invalidations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    stores: AtomicU64,
    invalidations: AtomicU64,
}

struct Inner {
    store: Arc<dyn CacheStore>,
    key_prefix: String,
    default_ttl: Duration,
    op_timeout: Duration,
    closed: AtomicBool,
    counters: Counters,
    events: broadcast::Sender<CacheEvent>,
}

/// Shared handle to the response cache. Cloning is cheap.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("backend", &self.inner.store.backend_name())
            .field("key_prefix", &self.inner.key_prefix)
            .field("default_ttl", &self.inner.default_ttl)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Opens the backend selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the Redis backend cannot be
    /// reached. Callers that want to keep serving can fall back to
    /// [`ResponseCache::disabled`].
    pub async fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        if !config.enabled {
            info!("Response cache disabled by configuration");
            return Ok(Self::disabled(config));
        }

        let store: Arc<dyn CacheStore> = match config.backend {
            CacheBackend::Redis => Arc::new(RedisStore::connect(&config.redis_url).await?),
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
        };

        info!(cache.backend = store.backend_name(), "Response cache opened");
        Ok(Self::with_store(store, config))
    }

    /// Builds a cache over an explicit store.
    pub fn with_store(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store,
                key_prefix: config.key_prefix.clone(),
                default_ttl: config.default_ttl(),
                op_timeout: config.op_timeout(),
                closed: AtomicBool::new(false),
                counters: Counters::default(),
                events,
            }),
        }
    }

    /// A cache that stores nothing; every lookup misses.
    pub fn disabled(config: &CacheConfig) -> Self {
        Self::with_store(Arc::new(NoopStore), config)
    }

    /// Stops using the store. Later calls behave like an unreachable store.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            info!("Response cache closed");
            self.publish(CacheEvent::Closed);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn key_prefix(&self) -> &str {
        &self.inner.key_prefix
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.store.backend_name()
    }

    /// Registers an observer for cache activity.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.inner.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            stores: c.stores.load(Ordering::Relaxed),
            invalidations: c.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Looks up `key`, reporting whether it was a hit, a miss or a store failure.
    pub async fn lookup(&self, key: &str) -> CacheLookup {
        let result = self.run("GET", self.inner.store.get(key)).await;
        let counters = &self.inner.counters;

        match result {
            Ok(Some(value)) => {
                counters.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("response_cache_lookups_total", "outcome" => "hit").increment(1);
                debug!(cache.key = %key, "Cache hit");
                self.publish(CacheEvent::Hit {
                    key: key.to_string(),
                });
                CacheLookup::Hit(value)
            }
            Ok(None) => {
                counters.misses.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("response_cache_lookups_total", "outcome" => "miss").increment(1);
                debug!(cache.key = %key, "Cache miss");
                self.publish(CacheEvent::Miss {
                    key: key.to_string(),
                });
                CacheLookup::Miss
            }
            Err(_) => {
                counters.misses.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("response_cache_lookups_total", "outcome" => "unavailable")
                    .increment(1);
                CacheLookup::Unavailable
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).await.into_value()
    }

    /// Stores `value` for `ttl`. A zero TTL stores nothing. Returns whether
    /// the write reached the store.
    pub async fn set(&self, key: &str, value: String, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }

        match self.run("SET", self.inner.store.set(key, value, ttl)).await {
            Ok(()) => {
                self.inner.counters.stores.fetch_add(1, Ordering::Relaxed);
                self.publish(CacheEvent::Stored {
                    key: key.to_string(),
                    ttl_secs: ttl.as_secs(),
                });
                true
            }
            Err(_) => false,
        }
    }

    pub async fn get_json<T>(&self, key: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(cache.key = %key, error = %e, "Failed to deserialize cached value");
                None
            }
        }
    }

    pub async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> bool
    where
        T: Serialize,
    {
        match serde_json::to_string(value) {
            Ok(json) => self.set(key, json, ttl).await,
            Err(e) => {
                warn!(cache.key = %key, error = %e, "Failed to serialize value for cache");
                false
            }
        }
    }

    /// Removes `key`. Returns whether a live entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let removed = self
            .run("DEL", self.inner.store.delete(key))
            .await
            .unwrap_or(false);

        if removed {
            self.inner.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        self.publish(CacheEvent::Invalidated {
            pattern: glob::escape(key),
            deleted: u64::from(removed),
        });
        removed
    }

    /// Removes every key matching the glob `pattern`.
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        let deleted = self
            .run("SCAN_DEL", self.inner.store.delete_pattern(pattern))
            .await
            .unwrap_or(0);

        self.inner
            .counters
            .invalidations
            .fetch_add(deleted, Ordering::Relaxed);
        metrics::counter!("response_cache_invalidations_total").increment(deleted);
        debug!(cache.pattern = %pattern, cache.deleted = %deleted, "Invalidated by pattern");
        self.publish(CacheEvent::Invalidated {
            pattern: pattern.to_string(),
            deleted,
        });
        deleted
    }

    /// Removes every key that starts with the literal `prefix`.
    pub async fn delete_prefix(&self, prefix: &str) -> u64 {
        self.delete_pattern(&glob::prefix_pattern(prefix)).await
    }

    /// Whether the store currently answers.
    pub async fn is_reachable(&self) -> bool {
        self.run("PING", self.inner.store.ping()).await.is_ok()
    }

    async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        let result = if self.is_closed() {
            Err(CacheError::Closed)
        } else {
            match tokio::time::timeout(self.inner.op_timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(CacheError::Timeout(self.inner.op_timeout)),
            }
        };

        if let Err(e) = &result {
            if !matches!(e, CacheError::Closed) {
                self.inner.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(cache.operation = operation, error = %e, "Cache store unavailable, passing through");
                self.publish(CacheEvent::StoreError {
                    operation,
                    error: e.to_string(),
                });
            }
        }
        result
    }

    fn publish(&self, event: CacheEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }
}
