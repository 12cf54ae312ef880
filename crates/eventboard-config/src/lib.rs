//! # Event Board Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`server`]: Listener address for the HTTP server
//! - [`cache_ttl`]: Response cache lifetimes for the events routes
//!
//! Cache and offline-controller settings live next to the components that
//! use them (`eventboard_cache::CacheConfig`, `eventboard_offline::OfflineConfig`).
//!
//! # Example
//!
//! ```ignore
//! use eventboard_config::{CorsConfig, ServerConfig};
//!
//! let cors_config = CorsConfig::from_env();
//! let server_config = ServerConfig::from_env();
//! ```

pub mod cache_ttl;
pub mod cors;
pub mod server;

pub use cache_ttl::EventCacheTtls;
pub use cors::CorsConfig;
pub use server::ServerConfig;
