//! Cache key construction and invalidation patterns.
//!
//! A response key is a pure function of the request:
//!
//! ```text
//! {prefix}:GET:{normalized path}|{sorted, form-encoded query}
//! ```
//!
//! Query pairs are decoded, sorted and re-encoded, so `?b=2&a=1` and
//! `?a=1&b=2` share a key. The re-encoding escapes `&`, `=` and `|`, which
//! makes the layout injective: two requests that differ in path or in any
//! query pair never share a key.

use axum::http::Method;
use url::form_urlencoded;

use crate::glob;

/// Separates the path from the canonical query. Never appears in an encoded
/// query, so the last occurrence always marks the boundary.
const QUERY_SEPARATOR: char = '|';

/// Collapses repeated slashes and drops a trailing slash (except for `/`).
/// Case and percent-encoding are left untouched.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Decodes, sorts and re-encodes query pairs.
pub fn canonical_query(query: Option<&str>) -> String {
    let Some(query) = query else {
        return String::new();
    };

    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Key shared by every cached representation under `path`, without the query.
pub fn route_key(prefix: &str, path: &str) -> String {
    format!("{}:GET:{}", prefix, normalize_path(path))
}

/// Builds the response cache key for a request. Only `GET` requests are
/// cacheable; every other method yields `None`.
pub fn request_key(prefix: &str, method: &Method, path: &str, query: Option<&str>) -> Option<String> {
    if *method != Method::GET {
        return None;
    }

    Some(format!(
        "{}{}{}",
        route_key(prefix, path),
        QUERY_SEPARATOR,
        canonical_query(query)
    ))
}

/// Pattern matching every cached query variant of exactly `path`.
pub fn path_pattern(prefix: &str, path: &str) -> String {
    glob::prefix_pattern(&format!("{}{}", route_key(prefix, path), QUERY_SEPARATOR))
}

/// Pattern matching `path` and everything below it (`/api/events` matches
/// `/api/events/search` but not `/api/events-archive`).
pub fn subtree_patterns(prefix: &str, path: &str) -> [String; 2] {
    let route = route_key(prefix, path);
    [
        glob::prefix_pattern(&format!("{}{}", route, QUERY_SEPARATOR)),
        glob::prefix_pattern(&format!("{}/", route.trim_end_matches('/'))),
    ]
}

/// Invalidation patterns for the events API.
pub mod events {
    use super::*;

    pub const BASE_PATH: &str = "/api/events";

    /// Every cached search result, regardless of query.
    pub fn search_pattern(prefix: &str) -> String {
        path_pattern(prefix, &format!("{BASE_PATH}/search"))
    }

    /// Every cached list page.
    pub fn list_pattern(prefix: &str) -> String {
        path_pattern(prefix, BASE_PATH)
    }

    /// A single event and its sub-resources.
    pub fn detail_patterns(prefix: &str, event_id: &str) -> [String; 2] {
        subtree_patterns(prefix, &format!("{BASE_PATH}/{event_id}"))
    }

    /// Everything under the events API.
    pub fn all_patterns(prefix: &str) -> [String; 2] {
        subtree_patterns(prefix, BASE_PATH)
    }
}
