//! Durable queue of mutating requests issued while offline.
//!
//! Identifiers are assigned by the store and strictly increase; a deleted
//! identifier is never handed out again. An action leaves the queue only
//! after its replay is confirmed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::{HeaderValue, Method, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, instrument};
use url::Url;

use crate::error::QueueError;
use crate::request::{FetchRequest, cache_key};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PendingAction {
    pub id: i64,
    pub method: String,
    /// Origin-relative URL (path and query).
    pub url: String,
    /// `Content-Type` of the original request, if it had one.
    pub content_type: Option<String>,
    /// Raw body bytes, exactly as submitted.
    pub body: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

impl PendingAction {
    /// Rebuilds the original request against `origin`.
    pub fn to_request(&self, origin: &Url) -> Result<FetchRequest, QueueError> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|_| QueueError::InvalidMethod(self.method.clone()))?;
        let url = origin
            .join(&self.url)
            .map_err(|e| QueueError::InvalidUrl(format!("{}: {e}", self.url)))?;

        let mut request = FetchRequest::new(method, url);
        if let Some(content_type) = &self.content_type {
            let value = HeaderValue::from_str(content_type)
                .map_err(|_| QueueError::InvalidHeader(content_type.clone()))?;
            request.headers.insert(CONTENT_TYPE, value);
        }
        Ok(match &self.body {
            Some(body) => request.with_body(body.clone()),
            None => request,
        })
    }
}

/// An action about to be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    pub method: String,
    pub url: String,
    pub content_type: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl NewAction {
    /// Captures the request without re-encoding its body.
    pub fn from_request(request: &FetchRequest) -> Self {
        Self {
            method: request.method.as_str().to_string(),
            url: cache_key(&request.url),
            content_type: request
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: request.body.as_ref().map(|b| b.to_vec()),
        }
    }
}

#[async_trait]
pub trait ActionStore: Send + Sync + 'static {
    async fn enqueue(&self, action: NewAction) -> Result<PendingAction, QueueError>;

    /// Every queued action, oldest first.
    async fn pending(&self) -> Result<Vec<PendingAction>, QueueError>;

    /// Returns `false` if the action was already gone.
    async fn delete(&self, id: i64) -> Result<bool, QueueError>;

    async fn len(&self) -> Result<u64, QueueError>;
}

/// [`ActionStore`] persisted in the offline SQLite store.
#[derive(Debug, Clone)]
pub struct SqliteActionStore {
    pool: SqlitePool,
}

impl SqliteActionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionStore for SqliteActionStore {
    #[instrument(skip(self, action), fields(method = %action.method, url = %action.url))]
    async fn enqueue(&self, action: NewAction) -> Result<PendingAction, QueueError> {
        let queued = sqlx::query_as::<_, PendingAction>(
            r#"
            INSERT INTO pending_actions (method, url, content_type, body, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, method, url, content_type, body, created_at
            "#,
        )
        .bind(&action.method)
        .bind(&action.url)
        .bind(&action.content_type)
        .bind(&action.body)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        debug!(action.id = queued.id, "Action queued");
        Ok(queued)
    }

    async fn pending(&self) -> Result<Vec<PendingAction>, QueueError> {
        let actions = sqlx::query_as::<_, PendingAction>(
            "SELECT id, method, url, content_type, body, created_at FROM pending_actions ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(actions)
    }

    async fn delete(&self, id: i64) -> Result<bool, QueueError> {
        let result = sqlx::query("DELETE FROM pending_actions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn len(&self) -> Result<u64, QueueError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_actions")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_store;

    async fn store() -> SqliteActionStore {
        SqliteActionStore::new(open_store("sqlite::memory:").await.unwrap())
    }

    fn action(method: &str, url: &str, body: Option<&str>) -> NewAction {
        NewAction {
            method: method.to_string(),
            url: url.to_string(),
            content_type: body.map(|_| "application/json".to_string()),
            body: body.map(|b| b.as_bytes().to_vec()),
        }
    }

    #[tokio::test]
    async fn test_enqueue_assigns_increasing_ids() {
        let store = store().await;
        let a = store.enqueue(action("POST", "/api/events", Some("{}"))).await.unwrap();
        let b = store.enqueue(action("DELETE", "/api/events/1", None)).await.unwrap();
        assert!(b.id > a.id);

        let pending = store.pending().await.unwrap();
        assert_eq!(pending, vec![a, b]);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = store().await;
        let a = store.enqueue(action("POST", "/api/a", None)).await.unwrap();
        let b = store.enqueue(action("POST", "/api/b", None)).await.unwrap();
        assert!(store.delete(b.id).await.unwrap());

        let c = store.enqueue(action("POST", "/api/c", None)).await.unwrap();
        assert!(c.id > b.id);
        assert_eq!(store.len().await.unwrap(), 2);
        assert_eq!(
            store.pending().await.unwrap().iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![a.id, c.id]
        );
    }

    #[tokio::test]
    async fn test_delete_twice_is_harmless() {
        let store = store().await;
        let a = store.enqueue(action("PUT", "/api/events/1", Some("{}"))).await.unwrap();
        assert!(store.delete(a.id).await.unwrap());
        assert!(!store.delete(a.id).await.unwrap());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_to_request_rebuilds_against_origin() {
        let store = store().await;
        let queued = store
            .enqueue(action(
                "POST",
                "/api/events/7/registrations?source=offline",
                Some(r#"{"name":"Ada","email":"ada@example.org"}"#),
            ))
            .await
            .unwrap();

        let origin = Url::parse("https://events.example.org").unwrap();
        let request = queued.to_request(&origin).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.url.as_str(),
            "https://events.example.org/api/events/7/registrations?source=offline"
        );
        assert_eq!(
            request.body_text().as_deref(),
            Some(r#"{"name":"Ada","email":"ada@example.org"}"#)
        );
        assert_eq!(
            request.headers.get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_invalid_method_is_rejected() {
        let action = PendingAction {
            id: 1,
            method: "NOT A METHOD".into(),
            url: "/api/events".into(),
            content_type: None,
            body: None,
            created_at: Utc::now(),
        };
        let origin = Url::parse("https://events.example.org").unwrap();
        assert!(matches!(
            action.to_request(&origin),
            Err(QueueError::InvalidMethod(_))
        ));
    }

    #[tokio::test]
    async fn test_binary_body_and_content_type_survive_replay() {
        let store = store().await;
        let origin = Url::parse("https://events.example.org").unwrap();
        let body = vec![0x89, b'P', b'N', b'G', 0xff, 0x00];

        let mut original =
            FetchRequest::new(Method::POST, origin.join("/api/uploads").unwrap())
                .with_body(body.clone());
        original.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let queued = store
            .enqueue(NewAction::from_request(&original))
            .await
            .unwrap();
        let stored = store.pending().await.unwrap().remove(0);
        assert_eq!(stored, queued);

        let replay = stored.to_request(&origin).unwrap();
        assert_eq!(replay.body.as_deref(), Some(body.as_slice()));
        assert_eq!(
            replay.headers.get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
    }

    #[tokio::test]
    async fn test_request_without_content_type_replays_without_one() {
        let store = store().await;
        let origin = Url::parse("https://events.example.org").unwrap();
        let original = FetchRequest::new(Method::DELETE, origin.join("/api/events/3").unwrap());

        store
            .enqueue(NewAction::from_request(&original))
            .await
            .unwrap();
        let replay = store.pending().await.unwrap()[0].to_request(&origin).unwrap();
        assert!(replay.headers.get(CONTENT_TYPE).is_none());
        assert!(replay.body.is_none());
    }
}
