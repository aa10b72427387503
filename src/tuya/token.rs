//! Access token cache with single-flight refresh

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tokio::sync::Mutex;

use crate::error::GatewayError;
use crate::tuya::signer::{self, CanonicalRequest, SIGN_METHOD};
use crate::tuya::types::{Clock, Credentials, TokenResult, TuyaResponse};

/// Short-lived bearer token issued by the token endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    issued_at: DateTime<Utc>,
    ttl_seconds: i64,
}

impl Token {
    pub fn new(value: String, issued_at: DateTime<Utc>, ttl_seconds: i64) -> Self {
        Self {
            value,
            issued_at,
            ttl_seconds,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// `None` when the TTL does not fit in the representable time range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Duration::try_seconds(self.ttl_seconds)
            .and_then(|ttl| self.issued_at.checked_add_signed(ttl))
    }

    /// Usable only while `now < expires_at - margin`
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at()
            .and_then(|expires_at| expires_at.checked_sub_signed(margin))
            .map(|deadline| now < deadline)
            .unwrap_or(false)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// Owns the cached token. The mutex is held across the fetch, so at most one
/// token request is in flight and waiters reuse its result.
pub struct TokenManager {
    http_client: Client,
    base_url: String,
    credentials: Arc<Credentials>,
    safety_margin: Duration,
    clock: Clock,
    token: Mutex<Option<Token>>,
}

impl TokenManager {
    pub fn new(
        http_client: Client,
        base_url: &str,
        credentials: Arc<Credentials>,
        safety_margin: Duration,
        clock: Clock,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            safety_margin,
            clock,
            token: Mutex::new(None),
        }
    }

    /// Return the cached token if still fresh, otherwise fetch a new one
    pub async fn ensure_valid(&self) -> Result<Token, GatewayError> {
        let mut cached = self.token.lock().await;

        if let Some(ref token) = *cached {
            if token.is_fresh((self.clock)(), self.safety_margin) {
                return Ok(token.clone());
            }
            tracing::debug!(
                "[Tuya] Cached token issued at {} (ttl {}s) is stale, refreshing",
                token.issued_at(),
                token.ttl_seconds()
            );
        }

        self.refresh_locked(&mut cached).await
    }

    /// Unconditionally fetch a new token, replacing the cached one on success
    pub async fn refresh(&self) -> Result<Token, GatewayError> {
        let mut cached = self.token.lock().await;
        self.refresh_locked(&mut cached).await
    }

    /// Replace a token the platform rejected. If another caller already
    /// replaced it, that replacement is returned without a new fetch.
    pub async fn refresh_rejected(&self, rejected: &Token) -> Result<Token, GatewayError> {
        let mut cached = self.token.lock().await;

        if let Some(ref current) = *cached {
            if current.value() != rejected.value()
                && current.is_fresh((self.clock)(), self.safety_margin)
            {
                tracing::debug!("[Tuya] Rejected token already replaced by another request");
                return Ok(current.clone());
            }
        }

        self.refresh_locked(&mut cached).await
    }

    /// Snapshot of the cached token, if any
    pub async fn current(&self) -> Option<Token> {
        self.token.lock().await.clone()
    }

    // On failure the cache is left as-is; a stale token stays stale and the
    // next ensure_valid() retries.
    async fn refresh_locked(&self, cached: &mut Option<Token>) -> Result<Token, GatewayError> {
        match self.fetch_token().await {
            Ok(token) => {
                tracing::info!(
                    "[Tuya] Token acquired, expires in {} sec",
                    token.ttl_seconds()
                );
                *cached = Some(token.clone());
                Ok(token)
            }
            Err(e) => {
                tracing::error!("[Tuya] Token refresh failed: {}", e);
                Err(e)
            }
        }
    }

    async fn fetch_token(&self) -> Result<Token, GatewayError> {
        let issued_at = (self.clock)();
        let t = issued_at.timestamp_millis();
        let sign = signer::sign_request(
            self.credentials.client_secret(),
            &CanonicalRequest::TokenFetch {
                client_id: self.credentials.client_id(),
                t,
            },
        )?;

        let url = format!("{}/v1.0/token", self.base_url);

        let resp = self
            .http_client
            .get(&url)
            .query(&[("grant_type", "1")])
            .header("client_id", self.credentials.client_id())
            .header("sign", sign)
            .header("t", t.to_string())
            .header("sign_method", SIGN_METHOD)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Auth("Token request timed out".to_string())
                } else {
                    GatewayError::Auth(format!("Token request failed: {}", e))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Auth(format!(
                "Token endpoint returned HTTP {}",
                status
            )));
        }

        let body: TuyaResponse<TokenResult> = resp
            .json()
            .await
            .map_err(|e| GatewayError::Auth(format!("Token parse failed: {}", e)))?;

        if !body.success {
            return Err(GatewayError::Auth(format!("Token error: {}", body.failure())));
        }

        let result = body
            .result
            .ok_or_else(|| GatewayError::Auth("No token in response".to_string()))?;

        if result.access_token.is_empty() {
            return Err(GatewayError::Auth("Empty access token in response".to_string()));
        }
        if result.expire_time <= 0 {
            return Err(GatewayError::Auth(format!(
                "Invalid token expire_time: {}",
                result.expire_time
            )));
        }

        let token = Token::new(result.access_token, issued_at, result.expire_time);
        if token.expires_at().is_none() {
            return Err(GatewayError::Auth(format!(
                "Token expire_time out of range: {}",
                result.expire_time
            )));
        }

        Ok(token)
    }
}
