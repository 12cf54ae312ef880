//! Named response buckets.
//!
//! A bucket maps origin-relative request keys to stored responses. The
//! controller keeps two buckets per deployment version (precache and
//! runtime) and drops every other bucket on activation.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use http::StatusCode;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;
use crate::request::{FetchResponse, HeaderPairs};

#[async_trait]
pub trait CacheStorage: Send + Sync + 'static {
    /// Names of every non-empty bucket.
    async fn bucket_names(&self) -> Result<Vec<String>, StorageError>;

    async fn lookup(&self, bucket: &str, key: &str) -> Result<Option<FetchResponse>, StorageError>;

    /// Stores or replaces a single entry.
    async fn put(&self, bucket: &str, key: &str, response: &FetchResponse) -> Result<(), StorageError>;

    /// Stores all entries or none of them.
    async fn put_all(
        &self,
        bucket: &str,
        entries: &[(String, FetchResponse)],
    ) -> Result<(), StorageError>;

    /// Returns `true` if the bucket held any entries.
    async fn delete_bucket(&self, bucket: &str) -> Result<bool, StorageError>;

    async fn keys(&self, bucket: &str) -> Result<Vec<String>, StorageError>;
}

/// Process-local buckets. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    buckets: RwLock<HashMap<String, BTreeMap<String, FetchResponse>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn bucket_names(&self) -> Result<Vec<String>, StorageError> {
        let buckets = self.buckets.read().await;
        let mut names: Vec<String> = buckets
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn lookup(&self, bucket: &str, key: &str) -> Result<Option<FetchResponse>, StorageError> {
        let buckets = self.buckets.read().await;
        Ok(buckets.get(bucket).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, bucket: &str, key: &str, response: &FetchResponse) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn put_all(
        &self,
        bucket: &str,
        entries: &[(String, FetchResponse)],
    ) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        let target = buckets.entry(bucket.to_string()).or_default();
        for (key, response) in entries {
            target.insert(key.clone(), response.clone());
        }
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        let mut buckets = self.buckets.write().await;
        Ok(buckets
            .remove(bucket)
            .is_some_and(|entries| !entries.is_empty()))
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .get(bucket)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}

/// Buckets persisted in the offline SQLite store.
#[derive(Debug, Clone)]
pub struct SqliteCacheStorage {
    pool: SqlitePool,
}

impl SqliteCacheStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn upsert(
        conn: &mut SqliteConnection,
        bucket: &str,
        key: &str,
        response: &FetchResponse,
    ) -> Result<(), StorageError> {
        let headers = serde_json::to_string(&HeaderPairs::from_map(&response.headers))?;

        sqlx::query(
            r#"
            INSERT INTO cache_entries (bucket, request_key, status, headers, body, stored_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (bucket, request_key) DO UPDATE SET
                status = excluded.status,
                headers = excluded.headers,
                body = excluded.body,
                stored_at = excluded.stored_at
            "#,
        )
        .bind(bucket)
        .bind(key)
        .bind(i64::from(response.status.as_u16()))
        .bind(headers)
        .bind(response.body.to_vec())
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CacheStorage for SqliteCacheStorage {
    async fn bucket_names(&self) -> Result<Vec<String>, StorageError> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT bucket FROM cache_entries ORDER BY bucket")
                .fetch_all(&self.pool)
                .await?;
        Ok(names)
    }

    async fn lookup(&self, bucket: &str, key: &str) -> Result<Option<FetchResponse>, StorageError> {
        let row = sqlx::query(
            "SELECT status, headers, body FROM cache_entries WHERE bucket = ? AND request_key = ?",
        )
        .bind(bucket)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: i64 = row.try_get("status")?;
        let headers: String = row.try_get("headers")?;
        let body: Vec<u8> = row.try_get("body")?;

        let status = u16::try_from(status)
            .ok()
            .and_then(|s| StatusCode::from_u16(s).ok())
            .ok_or_else(|| StorageError::Corrupt(format!("status {status}")))?;
        let headers: HeaderPairs = serde_json::from_str(&headers)?;

        Ok(Some(FetchResponse {
            status,
            headers: headers.into_map(),
            body: Bytes::from(body),
        }))
    }

    async fn put(&self, bucket: &str, key: &str, response: &FetchResponse) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert(&mut conn, bucket, key, response).await
    }

    async fn put_all(
        &self,
        bucket: &str,
        entries: &[(String, FetchResponse)],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        for (key, response) in entries {
            Self::upsert(&mut *tx, bucket, key, response).await?;
        }
        tx.commit().await?;

        debug!(bucket, entries = entries.len(), "Bucket entries committed");
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE bucket = ?")
            .bind(bucket)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT request_key FROM cache_entries WHERE bucket = ? ORDER BY request_key",
        )
        .bind(bucket)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }
}
