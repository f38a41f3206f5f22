//! Observable authentication state.
//!
//! The monitor publishes an [`AuthState`] through a `tokio::sync::watch`
//! channel; UI layers subscribe to it and render [`AuthView`] snapshots.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::session::Session;

/// Current phase of the authentication flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    #[default]
    Idle,
    Sending,
    Verifying,
    Authenticated,
    Error,
}

impl AuthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::Idle => "idle",
            AuthStatus::Sending => "sending",
            AuthStatus::Verifying => "verifying",
            AuthStatus::Authenticated => "authenticated",
            AuthStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub session: Option<Session>,
    pub status: AuthStatus,
    pub error: Option<AuthError>,
}

impl AuthState {
    /// A session is held and it has not expired
    pub fn is_authenticated(&self, now: i64) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_expired(now))
    }
}

/// Point-in-time view handed to consumers
#[derive(Debug, Clone)]
pub struct AuthView {
    pub session: Option<Session>,
    pub status: AuthStatus,
    pub is_authenticated: bool,
    pub error: Option<AuthError>,
    pub time_remaining_ms: i64,
}

impl AuthView {
    pub fn new(state: AuthState, now: i64) -> Self {
        let is_authenticated = state.is_authenticated(now);
        let time_remaining_ms = crate::session::time_remaining(state.session.as_ref(), now);
        Self {
            session: state.session,
            status: state.status,
            is_authenticated,
            error: state.error,
            time_remaining_ms,
        }
    }
}
