//! Device command delivery with one retry on token rejection

use std::sync::Arc;

use reqwest::{Client, StatusCode};

use crate::error::GatewayError;
use crate::tuya::signer::{self, CanonicalRequest, SIGN_METHOD};
use crate::tuya::token::{Token, TokenManager};
use crate::tuya::types::{
    Clock, CloudResponse, Command, CommandBody, Credentials, DeviceTarget, TuyaResponse,
};

/// Platform error codes meaning the access token is invalid or expired
const AUTH_FAILURE_CODES: [i64; 2] = [1010, 1011];

enum PostOutcome {
    Accepted(CloudResponse),
    AuthRejected(String),
}

pub struct CommandDispatcher {
    http_client: Client,
    base_url: String,
    credentials: Arc<Credentials>,
    tokens: Arc<TokenManager>,
    clock: Clock,
}

impl CommandDispatcher {
    pub fn new(
        http_client: Client,
        base_url: &str,
        credentials: Arc<Credentials>,
        tokens: Arc<TokenManager>,
        clock: Clock,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            tokens,
            clock,
        }
    }

    /// POST `commands` to the device. On token rejection, refresh and retry once.
    pub async fn send(
        &self,
        target: &DeviceTarget,
        commands: &[Command],
    ) -> Result<CloudResponse, GatewayError> {
        let token = self.tokens.ensure_valid().await?;

        let reason = match self.post_commands(target, commands, &token).await? {
            PostOutcome::Accepted(resp) => return Ok(resp),
            PostOutcome::AuthRejected(reason) => reason,
        };

        tracing::warn!(
            "[Tuya] Token rejected for device {} ({}), refreshing and retrying once",
            target.device_id(),
            reason
        );
        let token = self.tokens.refresh_rejected(&token).await?;

        match self.post_commands(target, commands, &token).await? {
            PostOutcome::Accepted(resp) => Ok(resp),
            PostOutcome::AuthRejected(reason) => Err(GatewayError::Command(format!(
                "Token rejected again after refresh: {}",
                reason
            ))),
        }
    }

    async fn post_commands(
        &self,
        target: &DeviceTarget,
        commands: &[Command],
        token: &Token,
    ) -> Result<PostOutcome, GatewayError> {
        let t = (self.clock)().timestamp_millis();
        let sign = signer::sign_request(
            self.credentials.client_secret(),
            &CanonicalRequest::Authenticated {
                client_id: self.credentials.client_id(),
                access_token: token.value(),
                t,
            },
        )?;

        let url = format!(
            "{}/v1.0/devices/{}/commands",
            self.base_url,
            target.device_id()
        );

        let resp = self
            .http_client
            .post(&url)
            .header("client_id", self.credentials.client_id())
            .header("access_token", token.value())
            .header("sign", sign)
            .header("t", t.to_string())
            .header("sign_method", SIGN_METHOD)
            .json(&CommandBody { commands })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Command("Command request timed out".to_string())
                } else {
                    GatewayError::Command(format!("Command request failed: {}", e))
                }
            })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(PostOutcome::AuthRejected(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(GatewayError::Command(format!(
                "Command endpoint returned HTTP {}",
                status
            )));
        }

        let body: TuyaResponse<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| GatewayError::Command(format!("Command response parse failed: {}", e)))?;

        if !body.success {
            if body
                .code
                .map(|c| AUTH_FAILURE_CODES.contains(&c))
                .unwrap_or(false)
            {
                return Ok(PostOutcome::AuthRejected(body.failure()));
            }
            return Err(GatewayError::Command(format!(
                "Device {} rejected command: {}",
                target.device_id(),
                body.failure()
            )));
        }

        tracing::debug!(
            "[Tuya] Sent {} command(s) to device {}",
            commands.len(),
            target.device_id()
        );

        Ok(PostOutcome::Accepted(CloudResponse {
            result: body.result,
            t: body.t,
        }))
    }
}
