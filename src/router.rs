use crate::modules::cache::router::init_cache_router;
use crate::modules::events::router::init_events_router;
use crate::modules::health::health;
use crate::state::AppState;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::get;
use axum::{Router, middleware};
use eventboard_cache::{CacheRule, ReadThrough, X_CACHE, keys, read_through};
use eventboard_observability::{
    PrometheusHandle, logging_middleware, metrics_app, metrics_middleware,
};
use tower_http::cors::CorsLayer;

/// Cacheable routes. The search rule outranks the detail rule by length,
/// and the exact list rule outranks both.
fn read_through_state(state: &AppState) -> ReadThrough {
    let ttls = state.cache_ttls;
    let base = keys::events::BASE_PATH;

    ReadThrough::new(state.cache.clone())
        .with_rule(CacheRule::exact(base, ttls.list()))
        .with_rule(CacheRule::prefix(format!("{base}/search"), ttls.search()))
        .with_rule(CacheRule::prefix(base, ttls.detail()))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = state
        .cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::IF_NONE_MATCH])
        .expose_headers([header::ETAG, HeaderName::from_static(X_CACHE)])
}

pub fn init_router(state: AppState, metrics: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .nest(
            "/api",
            Router::new()
                .nest("/events", init_events_router())
                .nest("/cache", init_cache_router()),
        )
        .with_state(state.clone());

    if let Some(handle) = metrics {
        router = router.merge(metrics_app(handle));
    }

    router
        .layer(middleware::from_fn_with_state(
            read_through_state(&state),
            read_through,
        ))
        .layer(cors_layer(&state))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
