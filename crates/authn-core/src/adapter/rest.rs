//! REST credential adapter.
//!
//! Posts JSON bodies to configurable endpoints under a base URL:
//! - send: `{"identifier"}` → any 2xx
//! - verify: `{"identifier", "code"}` → `{"token", "expiresIn"}`
//! - refresh (optional): `{"token"}` → `{"token", "expiresIn"?}`
//! - revoke (optional): `{"token"}` with bearer auth → any 2xx
//!
//! Refresh and revoke are only offered as capabilities when their endpoint
//! is configured. Failed requests are not retried.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{
    ApiError, CredentialAdapter, RefreshedToken, TokenRefresh, TokenRevoke, VerifiedToken,
};

/// HTTP request timeout in seconds.
/// Mobile networks are slow; 30s fails fast enough to keep the UI responsive.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestEndpoints {
    pub send_otp: String,
    pub verify_otp: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub revoke_token: Option<String>,
}

impl Default for RestEndpoints {
    fn default() -> Self {
        Self {
            send_otp: "/auth/otp/send".to_string(),
            verify_otp: "/auth/otp/verify".to_string(),
            refresh_token: None,
            revoke_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestAdapterConfig {
    pub base_url: String,
    #[serde(default)]
    pub endpoints: RestEndpoints,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl RestAdapterConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoints: RestEndpoints::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RestAdapter {
    client: Client,
    base_url: String,
    endpoints: RestEndpoints,
}

impl RestAdapter {
    pub fn new(config: RestAdapterConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            anyhow::bail!("REST adapter base URL is empty");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url,
            endpoints: config.endpoints,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send POST request to {}", url))?;
        debug!(url = %url, status = %response.status(), "Auth request completed");
        Self::check_response(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self.post(path, body, None).await?;
        let text = response.text().await.context("Failed to read response body")?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }
}

#[async_trait]
impl CredentialAdapter for RestAdapter {
    async fn send_otp(&self, identifier: &str) -> Result<()> {
        self.post(&self.endpoints.send_otp, &json!({ "identifier": identifier }), None)
            .await?;
        Ok(())
    }

    async fn verify_otp(&self, identifier: &str, code: &str) -> Result<VerifiedToken> {
        self.post_json(
            &self.endpoints.verify_otp,
            &json!({ "identifier": identifier, "code": code }),
        )
        .await
    }

    fn token_refresh(&self) -> Option<&dyn TokenRefresh> {
        self.endpoints
            .refresh_token
            .is_some()
            .then_some(self as &dyn TokenRefresh)
    }

    fn token_revoke(&self) -> Option<&dyn TokenRevoke> {
        self.endpoints
            .revoke_token
            .is_some()
            .then_some(self as &dyn TokenRevoke)
    }
}

#[async_trait]
impl TokenRefresh for RestAdapter {
    async fn refresh_token(&self, old_token: &str) -> Result<RefreshedToken> {
        let path = self
            .endpoints
            .refresh_token
            .as_deref()
            .context("No refresh endpoint configured")?;
        self.post_json(path, &json!({ "token": old_token })).await
    }
}

#[async_trait]
impl TokenRevoke for RestAdapter {
    async fn revoke_token(&self, token: &str) -> Result<()> {
        let path = self
            .endpoints
            .revoke_token
            .as_deref()
            .context("No revoke endpoint configured")?;
        self.post(path, &json!({ "token": token }), Some(token)).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
