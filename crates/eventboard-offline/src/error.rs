use http::StatusCode;
use thiserror::Error;

/// Failure to obtain a response from the network.
///
/// An aborted attempt is a failure like any other: callers fall back exactly
/// as they do for an unreachable host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("network unreachable: {0}")]
    Unreachable(String),

    #[error("request aborted")]
    Aborted,

    #[error("request timed out")]
    Timeout,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored response is corrupt: {0}")]
    Corrupt(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid method in pending action: {0}")]
    InvalidMethod(String),

    #[error("invalid url in pending action: {0}")]
    InvalidUrl(String),

    #[error("invalid content type in pending action: {0}")]
    InvalidHeader(String),
}

/// Install failures. Nothing is committed when any of these occur.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid precache path {path}: {source}")]
    InvalidPath {
        path: String,
        source: url::ParseError,
    },

    #[error("failed to fetch {path}: {source}")]
    Fetch { path: String, source: NetworkError },

    #[error("unexpected status {status} for {path}")]
    BadStatus { path: String, status: StatusCode },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum OfflineError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to open offline store: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to migrate offline store: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("controller cannot activate from the {0:?} state")]
    NotInstalled(crate::controller::LifecycleState),
}
