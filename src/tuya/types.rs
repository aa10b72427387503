//! Shared Tuya types: credentials, device target, commands and wire envelopes

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Source of "now" for token freshness and request timestamps
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Cloud project credentials (access id / access secret)
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self, GatewayError> {
        if client_id.trim().is_empty() {
            return Err(GatewayError::Config("Tuya client_id is not set".to_string()));
        }
        if client_secret.is_empty() {
            return Err(GatewayError::Config("Tuya client_secret is not set".to_string()));
        }

        Ok(Self {
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// The single device this process controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    device_id: String,
}

impl DeviceTarget {
    pub fn new(device_id: &str) -> Result<Self, GatewayError> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(GatewayError::Config("Tuya device_id is not set".to_string()));
        }
        Ok(Self {
            device_id: device_id.to_string(),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

/// Value of a data point mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl From<bool> for CommandValue {
    fn from(v: bool) -> Self {
        CommandValue::Bool(v)
    }
}

impl From<i64> for CommandValue {
    fn from(v: i64) -> Self {
        CommandValue::Number(v.into())
    }
}

impl From<&str> for CommandValue {
    fn from(v: &str) -> Self {
        CommandValue::Text(v.to_string())
    }
}

/// One device capability mutation, e.g. `{"code": "switch", "value": true}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub code: String,
    pub value: CommandValue,
}

impl Command {
    pub fn new(code: impl Into<String>, value: impl Into<CommandValue>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CommandBody<'a> {
    pub commands: &'a [Command],
}

/// Generic Tuya OpenAPI envelope
#[derive(Debug, Deserialize)]
pub(crate) struct TuyaResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub result: Option<T>,
    pub t: Option<i64>,
}

fn default_success() -> bool {
    true
}

impl<T> TuyaResponse<T> {
    /// Human-readable failure description ("1010: token invalid")
    pub fn failure(&self) -> String {
        match (self.code, self.msg.as_deref()) {
            (Some(code), Some(msg)) => format!("{}: {}", code, msg),
            (Some(code), None) => format!("code {}", code),
            (None, Some(msg)) => msg.to_string(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResult {
    pub access_token: String,
    pub expire_time: i64,
}

/// Acknowledgement of an accepted command; rejections surface as errors
#[derive(Debug, Clone, Serialize)]
pub struct CloudResponse {
    pub result: Option<serde_json::Value>,
    /// Platform timestamp (ms) of the response, if present
    pub t: Option<i64>,
}
