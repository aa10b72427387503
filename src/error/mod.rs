//! Error handling module

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failures raised by the Tuya gateway core (signing, tokens, commands)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Missing credentials, unknown region, empty device id, ... Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token fetch failed. The next call retries from scratch.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Command POST failed after the single auth retry.
    #[error("Command error: {0}")]
    Command(String),
}

impl GatewayError {
    /// Short machine-readable kind, surfaced to local callers
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Config(_) => "config",
            GatewayError::Auth(_) => "auth",
            GatewayError::Command(_) => "command",
        }
    }
}

impl From<config::ConfigError> for GatewayError {
    fn from(e: config::ConfigError) -> Self {
        GatewayError::Config(e.to_string())
    }
}

/// Errors returned by HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::Gateway(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.kind(), e.to_string()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "kind": kind,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
