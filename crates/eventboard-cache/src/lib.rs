//! # Event Board Cache
//!
//! Server-side read-through response cache with per-entry TTL.
//!
//! This crate provides:
//! - A [`CacheStore`] abstraction with Redis ([`RedisStore`]) and in-memory
//!   ([`MemoryStore`]) backends
//! - [`ResponseCache`], a best-effort façade that turns store failures into
//!   misses, bounds every store call with a timeout, counts hits and misses
//!   and publishes [`CacheEvent`]s to subscribers
//! - Deterministic request keys and invalidation patterns ([`keys`])
//! - The [`middleware::read_through`] axum middleware with ETag and
//!   Cache-Control handling
//!
//! # Example
//!
//! ```ignore
//! use eventboard_cache::{CacheConfig, ResponseCache};
//!
//! let config = CacheConfig::from_env();
//! let cache = ResponseCache::open(&config).await?;
//!
//! cache.set("key", body, config.default_ttl()).await;
//! let value: Option<String> = cache.get("key").await;
//!
//! cache.close();
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod glob;
pub mod keys;
pub mod memory;
pub mod middleware;
pub mod redis_store;
pub mod store;

pub use cache::{CacheEvent, CacheLookup, CacheStats, ResponseCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheBackend, CacheConfig};
pub use memory::MemoryStore;
pub use middleware::{CacheRule, CachedResponse, ReadThrough, X_CACHE, read_through};
pub use redis_store::RedisStore;
pub use store::{CacheError, CacheStore, NoopStore};
