//! The controller's view of the network.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::NetworkError;
use crate::request::{FetchRequest, FetchResponse};

/// Issues requests on behalf of the controller.
///
/// Any `Ok` is a response from the server, whatever its status; `Err` means
/// no response arrived.
#[async_trait]
pub trait Network: Send + Sync + 'static {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, NetworkError>;
}

/// [`Network`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestNetwork {
    client: reqwest::Client,
}

impl ReqwestNetwork {
    pub fn new() -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl Network for ReqwestNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, NetworkError> {
        debug!(method = %request.method, url = %request.url, "Network fetch");

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
