//! Credential adapter capabilities.
//!
//! An adapter talks to the authentication backend. Sending and verifying
//! passcodes is mandatory; refresh and revocation are optional capabilities
//! exposed through [`CredentialAdapter::token_refresh`] and
//! [`CredentialAdapter::token_revoke`]. Callers check for the capability
//! before using it.

pub mod error;
pub mod rest;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

pub use error::ApiError;
pub use rest::{RestAdapter, RestAdapterConfig, RestEndpoints};

/// Token issued by a successful passcode verification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedToken {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

/// Replacement token issued by a refresh
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedToken {
    pub token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[async_trait]
pub trait CredentialAdapter: Send + Sync {
    async fn send_otp(&self, identifier: &str) -> Result<()>;

    async fn verify_otp(&self, identifier: &str, code: &str) -> Result<VerifiedToken>;

    fn token_refresh(&self) -> Option<&dyn TokenRefresh> {
        None
    }

    fn token_revoke(&self) -> Option<&dyn TokenRevoke> {
        None
    }
}

#[async_trait]
pub trait TokenRefresh: Send + Sync {
    async fn refresh_token(&self, old_token: &str) -> Result<RefreshedToken>;
}

#[async_trait]
pub trait TokenRevoke: Send + Sync {
    async fn revoke_token(&self, token: &str) -> Result<()>;
}
