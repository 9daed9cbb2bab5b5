use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Status and undecoded body of an upstream reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Build(String),
    #[error("request to {path} failed: {message}")]
    Request { path: String, message: String },
}

/// Seam between the retrieval logic and the wire.
///
/// `path` is relative to the configured base URL.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn post_json(
        &self,
        path: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<TransportResponse, TransportError>;

    async fn get_json(
        &self,
        path: &str,
        api_key: &str,
        query: &[(&str, String)],
    ) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Build(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn finish(
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<TransportResponse, TransportError> {
        let failed = |err: reqwest::Error| TransportError::Request {
            path: path.to_string(),
            message: err.to_string(),
        };
        let response = request.send().await.map_err(failed)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(failed)?;
        debug!(path, status, bytes = body.len(), "upstream responded");
        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn post_json(
        &self,
        path: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<TransportResponse, TransportError> {
        let request = self
            .client
            .post(self.url(path))
            .header(API_KEY_HEADER, api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(body);
        Self::finish(path, request).await
    }

    async fn get_json(
        &self,
        path: &str,
        api_key: &str,
        query: &[(&str, String)],
    ) -> Result<TransportResponse, TransportError> {
        let request = self
            .client
            .get(self.url(path))
            .header(API_KEY_HEADER, api_key)
            .header(ACCEPT, "application/json")
            .query(query);
        Self::finish(path, request).await
    }
}
