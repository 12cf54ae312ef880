use crate::modules::cache::controller::{clear_cache, get_cache_stats};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get},
};

pub fn init_cache_router() -> Router<AppState> {
    Router::new()
        .route("/", delete(clear_cache))
        .route("/stats", get(get_cache_stats))
}
