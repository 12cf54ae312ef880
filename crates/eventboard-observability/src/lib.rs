//! # Event Board Observability
//!
//! Logging and metrics for the Event Board server:
//! - Console, rolling text and JSON log output via `tracing-subscriber`
//! - Prometheus metrics via the `metrics` facade
//! - Request logging and request metrics middleware
//!
//! Compiled in with the `observability` feature (default). At runtime the
//! `OBSERVABILITY_ENABLED` environment variable switches it off, leaving
//! console logging only.
//!
//! # Examples
//!
//! ```no_run
//! use eventboard_observability::{init_metrics, init_tracing};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_tracing()?;
//!     let _metrics = init_metrics()?;
//!     Ok(())
//! }
//! ```

pub mod basic_logging;
#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;

#[cfg(feature = "observability")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "observability")]
pub use logging::{REQUEST_ID_HEADER, init_tracing, is_observability_enabled, logging_middleware};
#[cfg(feature = "observability")]
pub use metrics::{
    init_metrics, metrics_app, metrics_middleware, track_event_mutation, track_registration,
};

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    use axum::{Router, extract::Request, middleware::Next, response::Response};

    /// Stand-in for the Prometheus handle; renders nothing.
    #[derive(Clone, Debug)]
    pub struct PrometheusHandle;

    impl PrometheusHandle {
        pub fn render(&self) -> String {
            String::new()
        }
    }

    pub fn is_observability_enabled() -> bool {
        false
    }

    pub async fn logging_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    pub async fn metrics_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    /// Console logging only.
    pub fn init_tracing() -> anyhow::Result<()> {
        crate::basic_logging::init_basic_console_logging()
    }

    pub fn init_metrics() -> anyhow::Result<Option<PrometheusHandle>> {
        Ok(None)
    }

    pub fn metrics_app(_handle: PrometheusHandle) -> Router {
        Router::new()
    }

    pub fn track_event_mutation(_operation: &'static str) {}
    pub fn track_registration(_outcome: &'static str) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
