//! # Event Board API
//!
//! REST API for a community event board, built with Axum and PostgreSQL.
//! Public read routes sit behind a read-through response cache (Redis or
//! in-memory) that is invalidated whenever events or registrations change.
//!
//! ## Layout
//!
//! ```text
//! src/
//! ├── modules/
//! │   ├── events/          # Event CRUD, listing and search
//! │   ├── registrations/   # Idempotent attendee registration
//! │   ├── cache/           # Cache statistics and manual invalidation
//! │   └── health.rs        # Database and cache reachability
//! ├── router.rs            # Routes and middleware stack
//! ├── state.rs             # Shared application state
//! └── validator.rs         # Validated JSON extractor
//! ```
//!
//! Each feature module has a `controller.rs` (handlers), `service.rs`
//! (queries and business rules) and `router.rs`.
//!
//! ## Routes
//!
//! | Method | Path | Cached |
//! |--------|------|--------|
//! | GET | `/api/events` | list TTL |
//! | GET | `/api/events/search` | search TTL |
//! | GET | `/api/events/{id}` | detail TTL |
//! | POST | `/api/events` | |
//! | PUT, DELETE | `/api/events/{id}` | |
//! | GET, POST | `/api/events/{id}/registrations` | detail TTL (GET) |
//! | GET | `/api/cache/stats` | |
//! | DELETE | `/api/cache?prefix=` | |
//! | GET | `/health` | |
//!
//! The offline client controller lives in [`eventboard_offline`] and is
//! re-exported here for hosts that embed both.

pub mod modules;
pub mod router;
pub mod state;
pub mod validator;

// Re-export workspace crates for convenience
pub use eventboard_cache;
pub use eventboard_config;
pub use eventboard_core;
pub use eventboard_db;
pub use eventboard_models;
pub use eventboard_offline;
