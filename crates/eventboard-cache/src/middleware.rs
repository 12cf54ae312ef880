//! Read-through caching middleware for idempotent GET routes.
//!
//! For requests matching a [`CacheRule`] the middleware:
//! 1. Builds the request key (method, normalized path, sorted query)
//! 2. Serves a stored response on a hit, without running the handler
//! 3. On a miss, runs the handler and stores successful responses for the
//!    rule's TTL
//!
//! Every response of a cacheable route carries `x-cache: HIT|MISS`, an
//! `ETag` and a `Cache-Control` header, and `If-None-Match` is answered with
//! `304 Not Modified`.
//!
//! # Example
//!
//! ```ignore
//! use eventboard_cache::middleware::{CacheRule, ReadThrough, read_through};
//!
//! let read_through_state = ReadThrough::new(cache)
//!     .with_rule(CacheRule::prefix("/api/events", Duration::from_secs(300)))
//!     .with_rule(CacheRule::prefix("/api/events/search", Duration::from_secs(60)));
//!
//! let app = Router::new()
//!     .route("/api/events", get(list_events))
//!     .layer(middleware::from_fn_with_state(read_through_state, read_through));
//! ```

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::cache::{CacheLookup, ResponseCache};
use crate::keys;

/// Response header reporting whether the body came from the cache.
pub const X_CACHE: &str = "x-cache";

/// Larger bodies are served but not stored.
const MAX_CACHEABLE_BODY: usize = 1024 * 1024;

/// How a rule's path is compared with the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMatch {
    /// Only this exact path.
    Exact,
    /// This path and everything below it, on segment boundaries.
    Prefix,
}

/// A cacheable route and its time-to-live.
#[derive(Debug, Clone)]
pub struct CacheRule {
    pub path: String,
    pub matching: PathMatch,
    pub ttl: Duration,
}

impl CacheRule {
    pub fn exact(path: impl Into<String>, ttl: Duration) -> Self {
        Self {
            path: keys::normalize_path(&path.into()),
            matching: PathMatch::Exact,
            ttl,
        }
    }

    pub fn prefix(path: impl Into<String>, ttl: Duration) -> Self {
        Self {
            path: keys::normalize_path(&path.into()),
            matching: PathMatch::Prefix,
            ttl,
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self.matching {
            PathMatch::Exact => path == self.path,
            PathMatch::Prefix => {
                path == self.path
                    || self.path == "/"
                    || path
                        .strip_prefix(self.path.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

/// A stored response: status, content type, validator and base64 body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub etag: String,
    pub body: String,
}

impl CachedResponse {
    pub fn new(status: StatusCode, content_type: Option<&str>, body: &[u8]) -> Self {
        Self {
            status: status.as_u16(),
            content_type: content_type.map(str::to_string),
            etag: generate_etag(body),
            body: BASE64.encode(body),
        }
    }

    fn from_parts(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Self {
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        Self::new(status, content_type, body)
    }

    fn into_response(self, ttl: Duration) -> Option<Response> {
        let body = BASE64.decode(self.body.as_bytes()).ok()?;
        let status = StatusCode::from_u16(self.status).ok()?;

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        let headers = response.headers_mut();
        if let Some(content_type) = self.content_type.and_then(|v| HeaderValue::from_str(&v).ok())
        {
            headers.insert(CONTENT_TYPE, content_type);
        }
        if let Ok(etag) = HeaderValue::from_str(&self.etag) {
            headers.insert(ETAG, etag);
        }
        decorate(headers, ttl, "HIT");
        Some(response)
    }
}

/// Middleware state: the cache plus the routes it applies to.
#[derive(Clone, Debug)]
pub struct ReadThrough {
    cache: ResponseCache,
    rules: Arc<Vec<CacheRule>>,
}

impl ReadThrough {
    pub fn new(cache: ResponseCache) -> Self {
        Self {
            cache,
            rules: Arc::new(Vec::new()),
        }
    }

    pub fn with_rule(mut self, rule: CacheRule) -> Self {
        Arc::make_mut(&mut self.rules).push(rule);
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Exact rules win over prefix rules; among prefix rules the longest
    /// path wins.
    pub fn rule_for(&self, path: &str) -> Option<&CacheRule> {
        let path = keys::normalize_path(path);
        self.rules
            .iter()
            .filter(|rule| rule.matches(&path))
            .max_by_key(|rule| (rule.matching == PathMatch::Exact, rule.path.len()))
    }
}

/// Generates a strong ETag from the body bytes.
fn generate_etag(body: &[u8]) -> String {
    let hash = Sha256::digest(body);
    format!("\"{}\"", hex::encode(&hash[..16]))
}

/// Weak comparison, as `If-None-Match` requires.
fn etags_match(client_etag: &str, server_etag: &str) -> bool {
    let client = client_etag.trim().trim_start_matches("W/");
    let server = server_etag.trim().trim_start_matches("W/");
    client == "*" || client == server
}

fn if_none_match_satisfied(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|header| header.split(',').any(|tag| etags_match(tag, etag)))
}

fn decorate(headers: &mut HeaderMap, ttl: Duration, outcome: &'static str) {
    headers.insert(X_CACHE, HeaderValue::from_static(outcome));
    if !headers.contains_key(CACHE_CONTROL) {
        if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())) {
            headers.insert(CACHE_CONTROL, value);
        }
    }
}

fn not_modified(etag: &str, ttl: Duration, outcome: &'static str) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert(ETAG, value);
    }
    decorate(headers, ttl, outcome);
    response
}

/// The handler's own `Cache-Control` or cookies opt a response out of
/// shared caching.
fn is_storable(status: StatusCode, headers: &HeaderMap) -> bool {
    if !status.is_success() || headers.contains_key(SET_COOKIE) {
        return false;
    }
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|v| !(v.contains("no-store") || v.contains("private")))
}

/// Read-through caching middleware. See the module docs.
pub async fn read_through(
    State(state): State<ReadThrough>,
    request: Request,
    next: Next,
) -> Response {
    // Credentialed requests may return caller-specific bodies.
    if *request.method() != Method::GET || request.headers().contains_key(AUTHORIZATION) {
        return next.run(request).await;
    }

    let Some(ttl) = state.rule_for(request.uri().path()).map(|rule| rule.ttl) else {
        return next.run(request).await;
    };

    let Some(key) = keys::request_key(
        state.cache.key_prefix(),
        request.method(),
        request.uri().path(),
        request.uri().query(),
    ) else {
        return next.run(request).await;
    };

    let if_none_match = request
        .headers()
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let CacheLookup::Hit(raw) = state.cache.lookup(&key).await {
        match serde_json::from_str::<CachedResponse>(&raw) {
            Ok(cached) => {
                if if_none_match_satisfied(if_none_match.as_deref(), &cached.etag) {
                    return not_modified(&cached.etag, ttl, "HIT");
                }
                if let Some(response) = cached.into_response(ttl) {
                    return response;
                }
                warn!(cache.key = %key, "Cached response could not be rebuilt");
            }
            Err(e) => warn!(cache.key = %key, error = %e, "Discarding unreadable cache entry"),
        }
    }

    let response = next.run(request).await;
    if !is_storable(response.status(), response.headers()) {
        let mut response = response;
        response
            .headers_mut()
            .insert(X_CACHE, HeaderValue::from_static("MISS"));
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return (parts, Body::empty()).into_response(),
    };

    let cached = CachedResponse::from_parts(parts.status, &parts.headers, &bytes);
    let etag = cached.etag.clone();

    if bytes.len() <= MAX_CACHEABLE_BODY {
        match serde_json::to_string(&cached) {
            Ok(raw) => {
                state.cache.set(&key, raw, ttl).await;
            }
            Err(e) => warn!(cache.key = %key, error = %e, "Failed to serialize response for cache"),
        }
    }

    if if_none_match_satisfied(if_none_match.as_deref(), &etag) {
        return not_modified(&etag, ttl, "MISS");
    }

    if let Ok(value) = HeaderValue::from_str(&etag) {
        parts.headers.insert(ETAG, value);
    }
    decorate(&mut parts.headers, ttl, "MISS");
    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::CacheConfig;
    use crate::memory::MemoryStore;
    use crate::store::NoopStore;
    use axum::{
        Json, Router,
        http::Request as HttpRequest,
        middleware,
        routing::get,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn rules(cache: ResponseCache) -> ReadThrough {
        ReadThrough::new(cache)
            .with_rule(CacheRule::exact("/api/events", Duration::from_secs(120)))
            .with_rule(CacheRule::prefix("/api/events", Duration::from_secs(300)))
            .with_rule(CacheRule::prefix("/api/events/search", Duration::from_secs(60)))
    }

    fn app(state: ReadThrough, calls: Arc<AtomicUsize>) -> Router {
        let counted = move |status: StatusCode| {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    (status, Json(json!({ "call": n })))
                }
            }
        };

        Router::new()
            .route("/api/events", get(counted(StatusCode::OK)).post(counted(StatusCode::CREATED)))
            .route("/api/events/search", get(counted(StatusCode::OK)))
            .route("/api/events/missing", get(counted(StatusCode::NOT_FOUND)))
            .route("/health", get(counted(StatusCode::OK)))
            .route(
                "/api/events/private",
                get(|| async { ([(CACHE_CONTROL, "private, max-age=0")], "mine") }),
            )
            .layer(middleware::from_fn_with_state(state, read_through))
    }

    async fn send(app: &Router, method: &str, uri: &str) -> Response {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn x_cache(response: &Response) -> &str {
        response.headers().get(X_CACHE).unwrap().to_str().unwrap()
    }

    fn memory_cache() -> (ResponseCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        (ResponseCache::with_store(store, &CacheConfig::memory()), clock)
    }

    #[test]
    fn test_rule_selection() {
        let state = rules(ResponseCache::disabled(&CacheConfig::memory()));
        assert_eq!(state.rule_for("/api/events").unwrap().ttl.as_secs(), 120);
        assert_eq!(state.rule_for("/api/events/").unwrap().ttl.as_secs(), 120);
        assert_eq!(state.rule_for("/api/events/42").unwrap().ttl.as_secs(), 300);
        assert_eq!(state.rule_for("/api/events/search").unwrap().ttl.as_secs(), 60);
        assert!(state.rule_for("/api/events-archive").is_none());
        assert!(state.rule_for("/health").is_none());
    }

    #[test]
    fn test_etags_match() {
        assert!(etags_match("\"abc123\"", "\"abc123\""));
        assert!(etags_match("W/\"abc123\"", "\"abc123\""));
        assert!(etags_match("*", "\"abc123\""));
        assert!(!etags_match("\"abc123\"", "\"xyz789\""));
        assert!(if_none_match_satisfied(Some("\"x\", \"abc\""), "\"abc\""));
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let (cache, _) = memory_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(rules(cache.clone()), calls.clone());

        let first = send(&app, "GET", "/api/events/search?q=jazz&page=1").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(x_cache(&first), "MISS");
        assert_eq!(
            first.headers().get(CACHE_CONTROL).unwrap(),
            "public, max-age=60"
        );
        let first_body = body_string(first).await;

        let second = send(&app, "GET", "/api/events/search?page=1&q=jazz").await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(x_cache(&second), "HIT");
        assert_eq!(
            second.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_string(second).await, first_body);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_entry_expires_after_rule_ttl() {
        let (cache, clock) = memory_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(rules(cache), calls.clone());

        send(&app, "GET", "/api/events/search?q=a").await;
        clock.advance_secs(59);
        assert_eq!(x_cache(&send(&app, "GET", "/api/events/search?q=a").await), "HIT");

        clock.advance_secs(2);
        assert_eq!(x_cache(&send(&app, "GET", "/api/events/search?q=a").await), "MISS");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidation_forces_a_miss() {
        let (cache, _) = memory_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(rules(cache.clone()), calls.clone());

        send(&app, "GET", "/api/events").await;
        send(&app, "GET", "/api/events/search?q=a").await;

        for pattern in keys::events::all_patterns(cache.key_prefix()) {
            cache.delete_pattern(&pattern).await;
        }

        assert_eq!(x_cache(&send(&app, "GET", "/api/events").await), "MISS");
        assert_eq!(x_cache(&send(&app, "GET", "/api/events/search?q=a").await), "MISS");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_get_and_uncached_routes_pass_through() {
        let (cache, _) = memory_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(rules(cache.clone()), calls.clone());

        let created = send(&app, "POST", "/api/events").await;
        assert_eq!(created.status(), StatusCode::CREATED);
        assert!(created.headers().get(X_CACHE).is_none());

        let health = send(&app, "GET", "/health").await;
        assert!(health.headers().get(X_CACHE).is_none());
        send(&app, "GET", "/health").await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.stats().stores, 0);
    }

    #[tokio::test]
    async fn test_error_responses_are_not_stored() {
        let (cache, _) = memory_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(rules(cache.clone()), calls.clone());

        let first = send(&app, "GET", "/api/events/missing").await;
        assert_eq!(first.status(), StatusCode::NOT_FOUND);
        assert_eq!(x_cache(&first), "MISS");
        send(&app, "GET", "/api/events/missing").await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().stores, 0);
    }

    #[tokio::test]
    async fn test_private_responses_are_not_stored() {
        let (cache, _) = memory_cache();
        let app = app(rules(cache.clone()), Arc::new(AtomicUsize::new(0)));

        send(&app, "GET", "/api/events/private").await;
        let second = send(&app, "GET", "/api/events/private").await;
        assert_eq!(x_cache(&second), "MISS");
        assert_eq!(cache.stats().stores, 0);
    }

    #[tokio::test]
    async fn test_authorized_requests_bypass_cache() {
        let (cache, _) = memory_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(rules(cache.clone()), calls.clone());

        for _ in 0..2 {
            let request = HttpRequest::builder()
                .uri("/api/events")
                .header(AUTHORIZATION, "Bearer token")
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert!(response.headers().get(X_CACHE).is_none());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_if_none_match_returns_not_modified() {
        let (cache, _) = memory_cache();
        let app = app(rules(cache), Arc::new(AtomicUsize::new(0)));

        let first = send(&app, "GET", "/api/events").await;
        let etag = first.headers().get(ETAG).unwrap().clone();

        let request = HttpRequest::builder()
            .uri("/api/events")
            .header(IF_NONE_MATCH, etag.clone())
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers().get(ETAG).unwrap(), &etag);
        assert_eq!(x_cache(&response), "HIT");
    }

    #[tokio::test]
    async fn test_unavailable_store_passes_through() {
        let cache = ResponseCache::with_store(Arc::new(NoopStore), &CacheConfig::memory());
        cache.close();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(rules(cache), calls.clone());

        for _ in 0..2 {
            let response = send(&app, "GET", "/api/events").await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(x_cache(&response), "MISS");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
