//! Device action handlers
//!
//! Verbs map 1:1 onto DeviceGateway operations.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::api::GatewayState;
use crate::error::AppError;
use crate::gateway::PowerStatus;

/// Local action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    PowerOn,
    PowerOff,
}

impl DeviceAction {
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb {
            "power-on" => Some(DeviceAction::PowerOn),
            "power-off" => Some(DeviceAction::PowerOff),
            _ => None,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            DeviceAction::PowerOn => "power-on",
            DeviceAction::PowerOff => "power-off",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    pub action: &'static str,
    pub status: PowerStatus,
}

async fn run_action(
    state: &GatewayState,
    action: DeviceAction,
) -> Result<Json<ActionResponse>, AppError> {
    let status = match action {
        DeviceAction::PowerOn => state.gateway.set_power(true).await?,
        DeviceAction::PowerOff => state.gateway.set_power(false).await?,
    };

    Ok(Json(ActionResponse {
        ok: true,
        action: action.verb(),
        status,
    }))
}

/// POST|GET /api/device/:action - power-on / power-off
pub async fn device_action(
    State(state): State<GatewayState>,
    Path(verb): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let action = DeviceAction::from_verb(&verb)
        .ok_or_else(|| AppError::NotFound(format!("Unknown action: {}", verb)))?;
    run_action(&state, action).await
}

/// GET /power/:state - on / off
pub async fn legacy_power(
    State(state): State<GatewayState>,
    Path(power): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let action = match power.as_str() {
        "on" => DeviceAction::PowerOn,
        "off" => DeviceAction::PowerOff,
        other => {
            return Err(AppError::NotFound(format!(
                "Unknown power state: {}",
                other
            )))
        }
    };
    run_action(&state, action).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_verbs() {
        assert_eq!(DeviceAction::from_verb("power-on"), Some(DeviceAction::PowerOn));
        assert_eq!(DeviceAction::from_verb("power-off"), Some(DeviceAction::PowerOff));
        assert_eq!(DeviceAction::from_verb("POWER-ON"), None);
        assert_eq!(DeviceAction::from_verb("toggle"), None);
        assert_eq!(DeviceAction::PowerOff.verb(), "power-off");
    }
}
