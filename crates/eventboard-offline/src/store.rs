use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use crate::error::OfflineError;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens the offline SQLite store and applies its schema.
///
/// In-memory databases live as long as their connection, so they are
/// pinned to a single connection that is never recycled.
pub async fn open_store(database_url: &str) -> Result<SqlitePool, OfflineError> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 4 })
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    info!(database_url, "Offline store ready");

    Ok(pool)
}
