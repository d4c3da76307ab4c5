//! Outbound delivery of sync operations.
//!
//! The HTTP gateway POSTs each operation's JSON payload to
//! `{base_url}{paths[operation]}` using Basic credentials. Delivery needs all
//! three of base URL, path table and credentials; when any is missing,
//! sending is skipped rather than treated as an error.

use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use vlesync_types::SyncOperation;

/// Username/password pair for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value of an `Authorization` header carrying these credentials.
    pub fn header_value(&self) -> String {
        format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", self.username, self.password))
        )
    }

    /// Checks an `Authorization` header value against these credentials.
    pub fn matches_header(&self, header: &str) -> bool {
        let Some(encoded) = header.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        decoded == format!("{}:{}", self.username, self.password).as_bytes()
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Outbound gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base address of the VLE (e.g. `https://vle.example.com`).
    pub base_url: Option<String>,
    /// Path per operation name, appended to the base address.
    pub paths: Option<HashMap<String, String>>,
    /// Shared-secret credentials sent with every request.
    pub basic_auth: Option<BasicCredentials>,
    /// Per-request timeout (ms).
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            paths: None,
            basic_auth: None,
            timeout_ms: 10_000,
        }
    }
}

impl GatewayConfig {
    /// Returns true when base URL, path table and credentials are all set.
    pub fn is_complete(&self) -> bool {
        self.base_url.is_some() && self.paths.is_some() && self.basic_auth.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// What happened to an operation handed to a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The remote accepted the operation.
    Delivered,
    /// The gateway is not configured; nothing was sent.
    Skipped,
}

/// Sends sync operations to the VLE.
#[async_trait]
pub trait SyncGateway: Send + Sync {
    /// Sends one operation. Makes exactly one attempt.
    async fn send(&self, operation: &SyncOperation) -> GatewayResult<Delivery>;
}

/// Gateway delivering operations over HTTP.
pub struct HttpGateway {
    config: GatewayConfig,
    client: Client,
}

impl HttpGateway {
    /// Creates a new HTTP gateway.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl SyncGateway for HttpGateway {
    async fn send(&self, operation: &SyncOperation) -> GatewayResult<Delivery> {
        let name = operation.name();
        let (Some(base_url), Some(paths), Some(credentials)) = (
            self.config.base_url.as_deref(),
            self.config.paths.as_ref(),
            self.config.basic_auth.as_ref(),
        ) else {
            debug!(operation = %name, "Gateway not configured, skipping");
            return Ok(Delivery::Skipped);
        };

        let path = paths
            .get(name.as_str())
            .ok_or(GatewayError::UnknownOperation(name))?;
        let url = format!("{base_url}{path}");
        let body = operation.payload()?;

        debug!(operation = %name, %url, "Sending operation");
        let response = self
            .client
            .post(&url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Delivery::Delivered)
    }
}
