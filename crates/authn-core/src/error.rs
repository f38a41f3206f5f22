use std::sync::Arc;

use thiserror::Error;

/// Errors recorded by the session monitor.
///
/// Adapter and storage failures are opaque; they are kept behind an `Arc`
/// so the error can be cloned into every observer's copy of the state.
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("Failed to send one-time passcode: {0}")]
    SendOtp(Arc<anyhow::Error>),

    #[error("Failed to verify one-time passcode: {0}")]
    VerifyOtp(Arc<anyhow::Error>),

    #[error("Adapter returned an empty token")]
    EmptyToken,

    #[error("Session storage failed: {0}")]
    Storage(Arc<anyhow::Error>),

    #[error("Session expired")]
    SessionExpired,

    #[error("Session expired after token refresh failed: {0}")]
    RefreshFailed(Arc<anyhow::Error>),
}

impl AuthError {
    pub(crate) fn send_otp(err: anyhow::Error) -> Self {
        AuthError::SendOtp(Arc::new(err))
    }

    pub(crate) fn verify_otp(err: anyhow::Error) -> Self {
        AuthError::VerifyOtp(Arc::new(err))
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        AuthError::Storage(Arc::new(err))
    }

    pub(crate) fn refresh_failed(err: anyhow::Error) -> Self {
        AuthError::RefreshFailed(Arc::new(err))
    }

    /// True for errors synthesized by the monitor when it ends a session on its own
    pub fn is_forced_logout(&self) -> bool {
        matches!(self, AuthError::SessionExpired | AuthError::RefreshFailed(_))
    }
}
