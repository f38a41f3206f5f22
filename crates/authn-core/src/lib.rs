//! Client-side OTP authentication state.
//!
//! This crate provides:
//! - `Session` and the expiry predicates in [`session`]
//! - `CredentialAdapter`: sends/verifies passcodes, optionally refreshes and revokes tokens
//! - `SessionStore`: persists the current session
//! - `SessionMonitor`: owns the session, watches it for expiry and refreshes it
//!
//! UI layers subscribe to the monitor's [`AuthState`] channel and call its
//! actions (`send_otp`, `verify_otp`, `logout`).

pub mod adapter;
pub mod clock;
pub mod config;
pub mod error;
pub mod monitor;
pub mod session;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use adapter::{
    CredentialAdapter, RefreshedToken, RestAdapter, RestAdapterConfig, TokenRefresh, TokenRevoke,
    VerifiedToken,
};
pub use clock::{Clock, SystemClock};
pub use config::{Config, MonitorConfig, RefreshPolicy};
pub use error::AuthError;
pub use monitor::{SessionMonitor, SessionMonitorBuilder};
pub use session::Session;
pub use state::{AuthState, AuthStatus, AuthView};
pub use store::{FileStore, MemoryStore, SessionStore};
