use anyhow::Context;
use eventboard_cache::{CacheConfig, ResponseCache};
use eventboard_config::{CorsConfig, EventCacheTtls};
use eventboard_db::{PgPool, init_db_pool, run_migrations};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub cache: ResponseCache,
    pub cors_config: CorsConfig,
    pub cache_ttls: EventCacheTtls,
}

impl AppState {
    pub fn new(db: PgPool, cache: ResponseCache) -> Self {
        Self {
            db,
            cache,
            cors_config: CorsConfig::from_env(),
            cache_ttls: EventCacheTtls::from_env(),
        }
    }
}

/// Connects the database, applies migrations and opens the response cache.
///
/// An unreachable cache store is not fatal: the server starts with caching
/// disabled and every request goes to the database.
pub async fn init_app_state() -> anyhow::Result<AppState> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = init_db_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&db)
        .await
        .context("Failed to run database migrations")?;

    let cache_config = CacheConfig::from_env();
    let cache = match ResponseCache::open(&cache_config).await {
        Ok(cache) => cache,
        Err(e) => {
            warn!(error = %e, "Response cache unavailable, continuing without it");
            ResponseCache::disabled(&cache_config)
        }
    };

    Ok(AppState::new(db, cache))
}
