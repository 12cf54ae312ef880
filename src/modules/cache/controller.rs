use crate::modules::cache::service::CacheService;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use eventboard_cache::CacheStats;
use eventboard_core::AppError;
use eventboard_core::serde::deserialize_optional_string;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub backend: &'static str,
    pub key_prefix: String,
    pub closed: bool,
    pub stats: CacheStats,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearCacheParams {
    /// Route path whose cached responses are dropped, e.g. `/api/events`.
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub deleted: u64,
}

#[instrument(skip(state))]
pub async fn get_cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        backend: state.cache.backend_name(),
        key_prefix: state.cache.key_prefix().to_string(),
        closed: state.cache.is_closed(),
        stats: state.cache.stats(),
    })
}

#[instrument(skip(state))]
pub async fn clear_cache(
    State(state): State<AppState>,
    Query(params): Query<ClearCacheParams>,
) -> Result<Json<ClearCacheResponse>, AppError> {
    if let Some(prefix) = &params.prefix {
        if !prefix.starts_with('/') {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "prefix must be a path starting with '/'"
            )));
        }
    }

    let deleted = CacheService::clear(&state.cache, params.prefix.as_deref()).await;
    Ok(Json(ClearCacheResponse { deleted }))
}
