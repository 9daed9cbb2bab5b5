use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use synastry::config::UpstreamConfig;
use synastry::error::AppError;
use synastry::upstream::{HttpTransport, SynastryClient};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) client: Arc<SynastryClient>,
}

impl AppState {
    pub(crate) fn new(client: Arc<SynastryClient>, metrics: PrometheusHandle) -> Self {
        Self {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(metrics),
            client,
        }
    }
}

/// Client over the real HTTP transport, shared by the server and CLI.
pub(crate) fn http_client(config: UpstreamConfig) -> Result<Arc<SynastryClient>, AppError> {
    let transport = HttpTransport::new(config.base_url.clone(), config.timeout)?;
    Ok(Arc::new(SynastryClient::new(config, Arc::new(transport))))
}
