use crate::cli::ServeArgs;
use crate::infra::{http_client, AppState};
use crate::routes::with_report_routes;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use synastry::config::AppConfig;
use synastry::error::AppError;
use synastry::telemetry;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let client = http_client(config.upstream)?;
    let upstream = client.config();
    if upstream.api_key.is_none() {
        warn!("ASTRO_API_KEY is not set; report routes will answer 500");
    }
    info!(
        base_url = %upstream.base_url,
        cache_ttl_secs = upstream.cache_ttl.as_secs(),
        cache_capacity = upstream.cache_capacity,
        "upstream client configured"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let app_state = AppState::new(client, prometheus_handle);
    let readiness_flag = app_state.readiness.clone();

    let app = with_report_routes(app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "synastry service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
