use crate::demo::{diagnostic_request, sample_request};
use crate::infra::AppState;
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use synastry::error::AppError;
use synastry::report::{share_summary_text, Report};
use synastry::request::{merge_report_inclusions, ReportRequest};
use synastry::share::{decode_link, report_path};
use synastry::upstream::{Endpoint, FailureView, RetrievalError};
use tracing::{error, warn};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LinkQuery {
    #[serde(default)]
    pub(crate) q: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SharedReportResponse {
    pub(crate) request: ReportRequest,
    pub(crate) report: Report,
}

#[derive(Debug, Serialize)]
pub(crate) struct SharePosterResponse {
    pub(crate) link: String,
    pub(crate) summary_text: String,
}

pub(crate) fn with_report_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/synastry",
            get(sample_synastry_endpoint).post(synastry_endpoint),
        )
        .route("/api/geo/search", get(geo_search_endpoint))
        .route("/api/report", get(shared_report_endpoint))
        .route("/api/share", get(share_poster_endpoint))
        .route("/api/debug", get(debug_endpoint))
        .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn sample_synastry_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<Report>, AppError> {
    raw_report(&state, &sample_request().with_report_inclusions()).await
}

async fn synastry_endpoint(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Json<Report>, AppError> {
    let body: Value = serde_json::from_slice(&body).map_err(|err| {
        warn!(error = %err, "rejecting synastry request body");
        AppError::from(err)
    })?;
    raw_report(&state, &merge_report_inclusions(body)).await
}

async fn raw_report<R>(state: &AppState, request: &R) -> Result<Json<Report>, AppError>
where
    R: Serialize + Sync + ?Sized,
{
    let report = state
        .client
        .retrieve_report(request, Endpoint::Synastry)
        .await?;
    Ok(Json(report))
}

async fn geo_search_endpoint(
    Extension(state): Extension<AppState>,
    Query(params): Query<LinkQuery>,
) -> Response {
    let query = params.q.unwrap_or_default();
    match state.client.search_cities(&query).await {
        Ok(results) => Json(json!({ "results": results })).into_response(),
        Err(RetrievalError::Config) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Server config error" })),
        )
            .into_response(),
        Err(RetrievalError::UpstreamHttp { status, .. }) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            Json(json!({ "results": [] })),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "geo search failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Search failed" })),
            )
                .into_response()
        }
    }
}

async fn shared_report_endpoint(
    Extension(state): Extension<AppState>,
    Query(params): Query<LinkQuery>,
) -> Response {
    match load_shared(&state, params.q.as_deref()).await {
        Ok((request, report)) => Json(SharedReportResponse { request, report }).into_response(),
        Err(view) => failure_response(view),
    }
}

async fn share_poster_endpoint(
    Extension(state): Extension<AppState>,
    Query(params): Query<LinkQuery>,
) -> Response {
    let (request, report) = match load_shared(&state, params.q.as_deref()).await {
        Ok(loaded) => loaded,
        Err(view) => return failure_response(view),
    };

    match report_path(&request) {
        Ok(link) => Json(SharePosterResponse {
            link,
            summary_text: share_summary_text(&report.summary),
        })
        .into_response(),
        Err(err) => {
            error!(error = %err, "failed to re-encode shared request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

/// Diagnostic-only: exposes the retrieval error text.
async fn debug_endpoint(Extension(state): Extension<AppState>) -> Response {
    match state
        .client
        .retrieve_report(&diagnostic_request(), Endpoint::Cards)
        .await
    {
        Ok(report) => Json(json!({ "success": true, "data": report })).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn load_shared(
    state: &AppState,
    link: Option<&str>,
) -> Result<(ReportRequest, Report), FailureView> {
    let request = decode_link(link.unwrap_or_default()).map_err(|err| {
        warn!(error = %err, "rejecting shared link");
        FailureView::from(&err)
    })?;
    let report = state
        .client
        .retrieve_report(&request, Endpoint::Cards)
        .await
        .map_err(|err| FailureView::from(&err))?;
    Ok((request, report))
}

fn failure_response(view: FailureView) -> Response {
    let status = StatusCode::from_u16(view.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(view)).into_response()
}
