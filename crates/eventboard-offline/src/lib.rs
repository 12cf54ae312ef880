//! # Event Board Offline
//!
//! Client-side offline support for the Event Board.
//!
//! - [`OfflineController`] intercepts fetches and applies the per-route
//!   policy: network first for the API, cache first for static assets,
//!   pass-through for other origins
//! - Versioned response buckets in [`storage`], persisted in SQLite
//! - A durable queue of writes made while offline ([`queue`]) and
//!   [`BackgroundSync`], which replays it in order once connectivity returns
//! - Push notification payloads and click targets ([`push`])
//!
//! # Example
//!
//! ```ignore
//! use eventboard_offline::{OfflineConfig, OfflineController};
//!
//! let controller = OfflineController::open(OfflineConfig::from_env()?).await?;
//! controller.install().await?;
//! controller.activate().await?;
//!
//! let outcome = controller.handle_fetch(request).await?;
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod network;
pub mod push;
pub mod queue;
pub mod request;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::OfflineConfig;
pub use controller::{
    ClientMessage, ControllerEvent, FetchOutcome, FetchState, LifecycleState, OfflineController,
    ResponseSource, RouteClass,
};
pub use error::{InstallError, NetworkError, OfflineError, QueueError, StorageError};
pub use network::{Network, ReqwestNetwork};
pub use push::{Notification, PushPayload};
pub use queue::{ActionStore, NewAction, PendingAction, SqliteActionStore};
pub use request::{FetchRequest, FetchResponse, RequestMode};
pub use storage::{CacheStorage, MemoryCacheStorage, SqliteCacheStorage};
pub use store::open_store;
pub use sync::{BackgroundSync, ReplayReport, spawn_connectivity_watcher};
