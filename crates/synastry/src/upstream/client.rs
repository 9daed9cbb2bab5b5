use super::cache::ResponseCache;
use super::transport::{TransportError, UpstreamTransport};
use crate::config::UpstreamConfig;
use crate::normalize::{normalize, ShapeError, UpstreamPayload};
use crate::report::Report;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const SYNASTRY_PATH: &str = "/api/v1/western/synastry";
pub const CARDS_PATH: &str = "/api/v1/western/synastrycards";

/// Which upstream report endpoint to call. Decides the payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Synastry,
    Cards,
}

impl Endpoint {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Synastry => SYNASTRY_PATH,
            Self::Cards => CARDS_PATH,
        }
    }

    fn tag(self, body: Value) -> UpstreamPayload {
        match self {
            Self::Synastry => UpstreamPayload::Synastry(body),
            Self::Cards => UpstreamPayload::Cards(body),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("upstream API key is not configured")]
    Config,
    #[error("upstream responded with status {status}")]
    UpstreamHttp { status: u16, body: String },
    #[error("upstream payload rejected: {0}")]
    UpstreamShape(#[from] ShapeError),
    #[error("upstream unreachable: {0}")]
    Network(String),
}

impl From<TransportError> for RetrievalError {
    fn from(value: TransportError) -> Self {
        Self::Network(value.to_string())
    }
}

impl RetrievalError {
    /// HTTP status a handler should answer with.
    pub fn status(&self) -> u16 {
        match self {
            Self::Config => 500,
            Self::UpstreamHttp { status, .. } => *status,
            Self::UpstreamShape(_) | Self::Network(_) => 502,
        }
    }
}

pub struct SynastryClient {
    config: UpstreamConfig,
    transport: Arc<dyn UpstreamTransport>,
    cache: ResponseCache,
}

impl SynastryClient {
    pub fn new(config: UpstreamConfig, transport: Arc<dyn UpstreamTransport>) -> Self {
        let cache = ResponseCache::new(config.cache_ttl, config.cache_capacity);
        Self {
            config,
            transport,
            cache,
        }
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &dyn UpstreamTransport {
        self.transport.as_ref()
    }

    /// Credential or `RetrievalError::Config`; blank keys count as missing.
    pub(crate) fn api_key(&self) -> Result<&str, RetrievalError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(RetrievalError::Config)
    }

    /// Fetches and normalizes one report. One POST per uncached call, no retry.
    ///
    /// `request` is usually a [`ReportRequest`](crate::request::ReportRequest);
    /// any serializable body is forwarded as-is.
    pub async fn retrieve_report<R>(
        &self,
        request: &R,
        endpoint: Endpoint,
    ) -> Result<Report, RetrievalError>
    where
        R: Serialize + Sync + ?Sized,
    {
        let body = self.fetch_payload(request, endpoint).await?;
        let report = normalize(endpoint.tag(body), Utc::now()).map_err(|err| {
            error!(path = endpoint.path(), error = %err, "upstream payload failed normalization");
            RetrievalError::UpstreamShape(err)
        })?;
        info!(
            path = endpoint.path(),
            report_id = %report.meta.report_id,
            aspects = report.aspects.len(),
            "report retrieved"
        );
        Ok(report)
    }

    /// Raw upstream body for `request`, served from cache when fresh.
    pub async fn fetch_payload<R>(
        &self,
        request: &R,
        endpoint: Endpoint,
    ) -> Result<Value, RetrievalError>
    where
        R: Serialize + Sync + ?Sized,
    {
        let api_key = self.api_key().map_err(|err| {
            error!("refusing upstream call without an API key");
            err
        })?;

        let path = endpoint.path();
        let payload = serde_json::to_value(request)
            .map_err(|err| RetrievalError::Network(format!("request encoding failed: {err}")))?;
        let cache_key = ResponseCache::key(path, &payload.to_string());
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!(path, "serving cached upstream payload");
            return Ok(cached);
        }

        let response = self
            .transport
            .post_json(path, api_key, &payload)
            .await
            .map_err(|err| {
                warn!(path, error = %err, "upstream transport failed");
                RetrievalError::from(err)
            })?;

        if !response.is_success() {
            warn!(path, status = response.status, body = %response.body, "upstream rejected request");
            return Err(RetrievalError::UpstreamHttp {
                status: response.status,
                body: response.body,
            });
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|err| {
            warn!(path, error = %err, "upstream body is not JSON");
            RetrievalError::Network(format!("undecodable upstream body: {err}"))
        })?;
        self.cache.insert(cache_key, body.clone());
        Ok(body)
    }
}
