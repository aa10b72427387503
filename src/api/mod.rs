//! API module - HTTP handlers and routes

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::gateway::DeviceGateway;

/// Shared handler state
#[derive(Clone)]
pub struct GatewayState {
    pub gateway: Arc<DeviceGateway>,
}

impl GatewayState {
    pub fn new(gateway: DeviceGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

pub fn routes() -> Router<GatewayState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Device actions
        .route(
            "/api/device/:action",
            get(handlers::device_action).post(handlers::device_action),
        )
        // Legacy route of the original single-endpoint server
        .route("/power/:state", get(handlers::legacy_power))
}
