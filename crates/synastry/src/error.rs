use crate::config::ConfigError;
use crate::share::InvalidLinkError;
use crate::telemetry::TelemetryError;
use crate::upstream::{RetrievalError, TransportError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Transport(TransportError),
    Retrieval(RetrievalError),
    Link(InvalidLinkError),
    Payload(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Transport(err) => write!(f, "transport error: {}", err),
            AppError::Retrieval(err) => write!(f, "retrieval error: {}", err),
            AppError::Link(err) => write!(f, "invalid link: {}", err),
            AppError::Payload(err) => write!(f, "payload error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Transport(err) => Some(err),
            AppError::Retrieval(err) => Some(err),
            AppError::Link(err) => Some(err),
            AppError::Payload(err) => Some(err),
        }
    }
}

/// Client-facing bodies never include credentials or internal error text.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Retrieval(RetrievalError::Config) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Server config error" }),
            ),
            AppError::Retrieval(RetrievalError::UpstreamHttp { status, body }) => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({ "error": "External API error", "details": body }),
            ),
            AppError::Retrieval(RetrievalError::UpstreamShape(_)) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Unexpected response from external API" }),
            ),
            AppError::Retrieval(RetrievalError::Network(_)) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "External API unreachable" }),
            ),
            AppError::Link(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid share link" }),
            ),
            AppError::Payload(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid JSON body" }),
            ),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Transport(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<TransportError> for AppError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

impl From<RetrievalError> for AppError {
    fn from(value: RetrievalError) -> Self {
        Self::Retrieval(value)
    }
}

impl From<InvalidLinkError> for AppError {
    fn from(value: InvalidLinkError) -> Self {
        Self::Link(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}
