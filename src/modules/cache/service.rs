use eventboard_cache::{ResponseCache, keys};
use tracing::{info, instrument};

pub struct CacheService;

impl CacheService {
    /// Drops every cached events response: lists, searches, details and
    /// registration lists. Called after each successful mutation.
    #[instrument(skip(cache))]
    pub async fn invalidate_events(cache: &ResponseCache) -> u64 {
        let mut deleted = 0;
        for pattern in keys::events::all_patterns(cache.key_prefix()) {
            deleted += cache.delete_pattern(&pattern).await;
        }
        deleted
    }

    /// Drops the cached responses for `path` and everything below it, or the
    /// whole cache when no path is given.
    #[instrument(skip(cache))]
    pub async fn clear(cache: &ResponseCache, path: Option<&str>) -> u64 {
        let deleted = match path {
            Some(path) => {
                let mut deleted = 0;
                for pattern in keys::subtree_patterns(cache.key_prefix(), path) {
                    deleted += cache.delete_pattern(&pattern).await;
                }
                deleted
            }
            None => {
                let prefix = format!("{}:", cache.key_prefix());
                cache.delete_prefix(&prefix).await
            }
        };

        info!(path = path.unwrap_or("*"), deleted, "Response cache cleared");
        deleted
    }
}
