//! DeviceGateway: verb-style facade over the command dispatcher
//!
//! The only surface the HTTP layer touches.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::Client;
use serde::Serialize;

use crate::config::TuyaConfig;
use crate::error::GatewayError;
use crate::tuya::{
    system_clock, Clock, CommandDispatcher, Command, DeviceTarget, TokenManager,
};

/// Kind of device behind the gateway; decides the switch data point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Fan,
    Light,
}

impl DeviceClass {
    pub fn power_code(&self) -> &'static str {
        match self {
            DeviceClass::Fan => "switch",
            DeviceClass::Light => "switch_1",
        }
    }
}

impl FromStr for DeviceClass {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fan" => Ok(DeviceClass::Fan),
            "light" => Ok(DeviceClass::Light),
            other => Err(GatewayError::Config(format!(
                "Unknown device class '{}' (expected fan or light)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerStatus {
    On,
    Off,
}

impl PowerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerStatus::On => "on",
            PowerStatus::Off => "off",
        }
    }
}

impl From<bool> for PowerStatus {
    fn from(on: bool) -> Self {
        if on {
            PowerStatus::On
        } else {
            PowerStatus::Off
        }
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct DeviceGateway {
    dispatcher: CommandDispatcher,
    target: DeviceTarget,
    power_code: String,
}

impl DeviceGateway {
    pub fn new(dispatcher: CommandDispatcher, target: DeviceTarget, power_code: &str) -> Self {
        Self {
            dispatcher,
            target,
            power_code: power_code.to_string(),
        }
    }

    /// Validate configuration and wire up the token manager and dispatcher.
    /// No network I/O happens here; the first token is fetched lazily.
    pub fn from_config(cfg: &TuyaConfig) -> Result<Self, GatewayError> {
        Self::from_config_with_clock(cfg, system_clock())
    }

    pub fn from_config_with_clock(cfg: &TuyaConfig, clock: Clock) -> Result<Self, GatewayError> {
        let credentials = Arc::new(cfg.credentials()?);
        let base_url = cfg.base_url()?;
        let target = cfg.device()?;
        let class: DeviceClass = cfg.device_class.parse()?;
        let power_code = match cfg.power_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => class.power_code().to_string(),
        };

        let http_client = Client::builder()
            .timeout(cfg.request_timeout()?)
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| GatewayError::Config(format!("HTTP client: {}", e)))?;

        let tokens = Arc::new(TokenManager::new(
            http_client.clone(),
            &base_url,
            credentials.clone(),
            cfg.safety_margin()?,
            clock.clone(),
        ));
        let dispatcher =
            CommandDispatcher::new(http_client, &base_url, credentials, tokens, clock);

        tracing::info!(
            "[Gateway] Device {} ({:?}, code '{}') via {}",
            target.device_id(),
            class,
            power_code,
            base_url
        );

        Ok(Self::new(dispatcher, target, &power_code))
    }

    pub fn device_id(&self) -> &str {
        self.target.device_id()
    }

    /// Switch the device on or off
    pub async fn set_power(&self, on: bool) -> Result<PowerStatus, GatewayError> {
        let command = Command::new(self.power_code.clone(), on);

        match self.dispatcher.send(&self.target, &[command]).await {
            Ok(_) => {
                let status = PowerStatus::from(on);
                tracing::info!("[Gateway] Device {} powered {}", self.device_id(), status);
                Ok(status)
            }
            Err(e) => {
                tracing::error!(
                    "[Gateway] Power {} failed for device {}: {}",
                    PowerStatus::from(on),
                    self.device_id(),
                    e
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::tests::tuya_config;
    use crate::tuya::token::tests::{token_body, TestClock, T0};

    fn commands_path() -> String {
        "/v1.0/devices/bf0123456789abcdef/commands".to_string()
    }

    fn ok_body() -> serde_json::Value {
        serde_json::json!({ "success": true, "result": true, "t": T0 })
    }

    #[test]
    fn test_device_class_codes() {
        assert_eq!("fan".parse::<DeviceClass>().unwrap().power_code(), "switch");
        assert_eq!(
            "Light".parse::<DeviceClass>().unwrap().power_code(),
            "switch_1"
        );
        assert!(matches!(
            "toaster".parse::<DeviceClass>(),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_power_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(PowerStatus::On).unwrap(), "on");
        assert_eq!(PowerStatus::from(false).as_str(), "off");
    }

    #[tokio::test]
    async fn test_unsupported_region_fails_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut cfg = tuya_config(&server.uri());
        cfg.region = "mars".to_string();

        let err = DeviceGateway::from_config(&cfg).err().unwrap();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_empty_device_id_is_config_error() {
        let mut cfg = tuya_config("http://127.0.0.1:9");
        cfg.device_id = String::new();
        assert!(matches!(
            DeviceGateway::from_config(&cfg),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_oversized_safety_margin_is_config_error() {
        let mut cfg = tuya_config("http://127.0.0.1:9");
        cfg.token_safety_margin_secs = u64::MAX;
        assert!(matches!(
            DeviceGateway::from_config(&cfg),
            Err(GatewayError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_set_power_on_with_fresh_token() {
        let server = MockServer::start().await;
        let clock = TestClock::at_millis(T0);

        Mock::given(method("GET"))
            .and(path("/v1.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("token-A", 7200)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(commands_path()))
            .and(body_json(serde_json::json!({
                "commands": [{ "code": "switch", "value": false }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(commands_path()))
            .and(body_json(serde_json::json!({
                "commands": [{ "code": "switch", "value": true }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let gateway =
            DeviceGateway::from_config_with_clock(&tuya_config(&server.uri()), clock.clock())
                .unwrap();

        // Warm the cache so the next call runs with a fresh token.
        assert_eq!(gateway.set_power(false).await.unwrap(), PowerStatus::Off);
        clock.advance_secs(60);
        assert_eq!(gateway.set_power(true).await.unwrap(), PowerStatus::On);
    }

    #[tokio::test]
    async fn test_set_power_off_after_expiry_refreshes_once() {
        let server = MockServer::start().await;
        let clock = TestClock::at_millis(T0);

        Mock::given(method("GET"))
            .and(path("/v1.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("token-A", 7200)))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("token-B", 7200)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(commands_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(2)
            .mount(&server)
            .await;

        let gateway =
            DeviceGateway::from_config_with_clock(&tuya_config(&server.uri()), clock.clock())
                .unwrap();

        assert_eq!(gateway.set_power(true).await.unwrap(), PowerStatus::On);
        clock.advance_secs(7200);
        assert_eq!(gateway.set_power(false).await.unwrap(), PowerStatus::Off);
    }

    #[tokio::test]
    async fn test_light_uses_switch_1_and_override_wins() {
        let server = MockServer::start().await;
        let clock = TestClock::at_millis(T0);

        Mock::given(method("GET"))
            .and(path("/v1.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("token-A", 7200)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(commands_path()))
            .and(body_json(serde_json::json!({
                "commands": [{ "code": "switch_1", "value": true }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(commands_path()))
            .and(body_json(serde_json::json!({
                "commands": [{ "code": "switch_led", "value": true }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut cfg = tuya_config(&server.uri());
        cfg.device_class = "light".to_string();
        let light = DeviceGateway::from_config_with_clock(&cfg, clock.clock()).unwrap();
        assert_eq!(light.set_power(true).await.unwrap(), PowerStatus::On);

        cfg.power_code = Some("switch_led".to_string());
        let custom = DeviceGateway::from_config_with_clock(&cfg, clock.clock()).unwrap();
        assert_eq!(custom.set_power(true).await.unwrap(), PowerStatus::On);
    }

    #[tokio::test]
    async fn test_set_power_propagates_command_error() {
        let server = MockServer::start().await;
        let clock = TestClock::at_millis(T0);

        Mock::given(method("GET"))
            .and(path("/v1.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("token-A", 7200)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(commands_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "code": 2001,
                "msg": "device is offline",
                "t": T0
            })))
            .mount(&server)
            .await;

        let gateway =
            DeviceGateway::from_config_with_clock(&tuya_config(&server.uri()), clock.clock())
                .unwrap();
        let err = gateway.set_power(true).await.unwrap_err();
        assert_eq!(err.kind(), "command");
        assert!(err.to_string().contains("device is offline"));
    }
}
