#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use eventboard::eventboard_cache::{CacheConfig, ResponseCache};
use eventboard::router::init_router;
use eventboard::state::AppState;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// App over `pool` with a fresh in-memory response cache.
pub async fn setup_test_app(pool: PgPool) -> (Router, ResponseCache) {
    dotenvy::dotenv().ok();
    let cache = ResponseCache::open(&CacheConfig::memory())
        .await
        .unwrap();
    let state = AppState::new(pool, cache.clone());
    (init_router(state, None), cache)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub x_cache: Option<String>,
    pub etag: Option<String>,
    pub cache_control: Option<String>,
    pub request_id: Option<String>,
    pub body: Value,
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
    };
    let x_cache = header("x-cache");
    let etag = header("etag");
    let cache_control = header("cache-control");
    let request_id = header("x-request-id");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        x_cache,
        etag,
        cache_control,
        request_id,
        body,
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}
