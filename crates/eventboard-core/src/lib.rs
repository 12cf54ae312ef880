//! # Event Board Core
//!
//! Core types, errors, and utilities shared across the Event Board workspace.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`pagination`]: Offset/page pagination parameters and response metadata
//! - [`serde`]: Lenient query-string deserializers
//!
//! # Example
//!
//! ```ignore
//! use eventboard_core::{AppError, PaginationParams};
//!
//! let error = AppError::not_found(anyhow::anyhow!("Event not found"));
//! let params = PaginationParams::default();
//! let limit = params.limit();
//! ```

pub mod errors;
pub mod pagination;
pub mod serde;

pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
