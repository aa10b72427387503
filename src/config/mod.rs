//! Configuration module
//!
//! Sources, lowest priority first:
//! 1. built-in defaults (plus the legacy `TUYA_ACCESS_ID` / `TUYA_ACCESS_SECRET` /
//!    `TUYA_DEVICE_ID` variables)
//! 2. `config/default.{toml,yaml,json}` (optional)
//! 3. `GATEWAY__<SECTION>__<KEY>` environment variables

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::error::GatewayError;
use crate::tuya::{Credentials, DeviceTarget, Region};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub tuya: TuyaConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Clone, Deserialize)]
pub struct TuyaConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Overrides the region's base URL (private deployments, tests)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub device_id: String,
    /// `fan` or `light`
    #[serde(default = "default_device_class")]
    pub device_class: String,
    /// Overrides the switch code implied by `device_class`
    #[serde(default)]
    pub power_code: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_safety_margin")]
    pub token_safety_margin_secs: u64,
}

impl fmt::Debug for TuyaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TuyaConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("region", &self.region)
            .field("base_url", &self.base_url)
            .field("device_id", &self.device_id)
            .field("device_class", &self.device_class)
            .field("power_code", &self.power_code)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token_safety_margin_secs", &self.token_safety_margin_secs)
            .finish()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_region() -> String {
    "eu".to_string()
}

fn default_device_class() -> String {
    "fan".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_safety_margin() -> u64 {
    60
}

impl Config {
    pub fn load() -> Result<Self, GatewayError> {
        Self::load_from(None)
    }

    /// Load with an explicit environment map instead of the process environment
    pub fn load_from(env: Option<HashMap<String, String>>) -> Result<Self, GatewayError> {
        let legacy = |key: &str| -> String {
            match &env {
                Some(vars) => vars.get(key).cloned(),
                None => std::env::var(key).ok(),
            }
            .unwrap_or_default()
        };

        let settings = config::Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("tuya.client_id", legacy("TUYA_ACCESS_ID"))?
            .set_default("tuya.client_secret", legacy("TUYA_ACCESS_SECRET"))?
            .set_default("tuya.device_id", legacy("TUYA_DEVICE_ID"))?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("GATEWAY")
                    .prefix_separator("__")
                    .separator("__")
                    .source(env.clone()),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl TuyaConfig {
    pub fn credentials(&self) -> Result<Credentials, GatewayError> {
        Credentials::new(&self.client_id, &self.client_secret)
    }

    pub fn region(&self) -> Result<Region, GatewayError> {
        self.region.parse()
    }

    /// Region base URL, or the validated override
    pub fn base_url(&self) -> Result<String, GatewayError> {
        let region = self.region()?;

        match self.base_url.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let parsed = url::Url::parse(raw).map_err(|e| {
                    GatewayError::Config(format!("Invalid Tuya base_url '{}': {}", raw, e))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(GatewayError::Config(format!(
                        "Tuya base_url must be http(s): {}",
                        raw
                    )));
                }
                Ok(raw.trim_end_matches('/').to_string())
            }
            _ => Ok(region.base_url().to_string()),
        }
    }

    pub fn device(&self) -> Result<DeviceTarget, GatewayError> {
        DeviceTarget::new(&self.device_id)
    }

    pub fn request_timeout(&self) -> Result<std::time::Duration, GatewayError> {
        if self.request_timeout_secs == 0 {
            return Err(GatewayError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(std::time::Duration::from_secs(self.request_timeout_secs))
    }

    pub fn safety_margin(&self) -> Result<chrono::Duration, GatewayError> {
        i64::try_from(self.token_safety_margin_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                GatewayError::Config(format!(
                    "token_safety_margin_secs out of range: {}",
                    self.token_safety_margin_secs
                ))
            })
    }
}
