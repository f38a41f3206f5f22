//! Test doubles for adapters, stores and clocks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::adapter::{CredentialAdapter, RefreshedToken, TokenRefresh, TokenRevoke, VerifiedToken};
use crate::clock::Clock;
use crate::session::Session;
use crate::store::SessionStore;

/// 2024-01-01T12:00:00Z
pub const T0: i64 = 1_704_110_400_000;

/// Ordered record of calls, e.g. `"verify:user@example.com:123456"`
#[derive(Debug, Default)]
pub struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    fn push(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Number of calls of one kind (`"send"`, `"refresh"`, `"remove"`, ...)
    pub fn count(&self, kind: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(':').next() == Some(kind))
            .count()
    }
}

// ============================================================================
// Adapter
// ============================================================================

pub struct MockAdapter {
    send_error: Option<String>,
    verify: Result<VerifiedToken, String>,
    refresh: Option<Result<RefreshedToken, String>>,
    revoke: Option<Result<(), String>>,
    refresh_delay: Option<Duration>,
    pub calls: CallLog,
}

impl MockAdapter {
    /// Sends and verifies successfully; no refresh or revoke capability
    pub fn new() -> Self {
        Self {
            send_error: None,
            verify: Ok(VerifiedToken {
                token: "test-token".to_string(),
                expires_in: 3600,
            }),
            refresh: None,
            revoke: None,
            refresh_delay: None,
            calls: CallLog::default(),
        }
    }

    pub fn failing_send(mut self, message: &str) -> Self {
        self.send_error = Some(message.to_string());
        self
    }

    pub fn verifying(mut self, token: &str, expires_in: u64) -> Self {
        self.verify = Ok(VerifiedToken {
            token: token.to_string(),
            expires_in,
        });
        self
    }

    pub fn failing_verify(mut self, message: &str) -> Self {
        self.verify = Err(message.to_string());
        self
    }

    pub fn refreshing(mut self, token: &str, expires_in: Option<u64>) -> Self {
        self.refresh = Some(Ok(RefreshedToken {
            token: token.to_string(),
            expires_in,
        }));
        self
    }

    pub fn failing_refresh(mut self, message: &str) -> Self {
        self.refresh = Some(Err(message.to_string()));
        self
    }

    /// Hold each refresh call open for `delay` (tokio time) before answering
    pub fn slow_refresh(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    pub fn revoking(mut self) -> Self {
        self.revoke = Some(Ok(()));
        self
    }

    pub fn failing_revoke(mut self, message: &str) -> Self {
        self.revoke = Some(Err(message.to_string()));
        self
    }
}

#[async_trait]
impl CredentialAdapter for MockAdapter {
    async fn send_otp(&self, identifier: &str) -> Result<()> {
        self.calls.push(format!("send:{}", identifier));
        match self.send_error {
            Some(ref message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }

    async fn verify_otp(&self, identifier: &str, code: &str) -> Result<VerifiedToken> {
        self.calls.push(format!("verify:{}:{}", identifier, code));
        self.verify.clone().map_err(|message| anyhow!(message))
    }

    fn token_refresh(&self) -> Option<&dyn TokenRefresh> {
        self.refresh.is_some().then_some(self as &dyn TokenRefresh)
    }

    fn token_revoke(&self) -> Option<&dyn TokenRevoke> {
        self.revoke.is_some().then_some(self as &dyn TokenRevoke)
    }
}

#[async_trait]
impl TokenRefresh for MockAdapter {
    async fn refresh_token(&self, old_token: &str) -> Result<RefreshedToken> {
        self.calls.push(format!("refresh:{}", old_token));
        if let Some(delay) = self.refresh_delay {
            tokio::time::sleep(delay).await;
        }
        match self.refresh {
            Some(ref result) => result.clone().map_err(|message| anyhow!(message)),
            None => Err(anyhow!("refresh not supported")),
        }
    }
}

#[async_trait]
impl TokenRevoke for MockAdapter {
    async fn revoke_token(&self, token: &str) -> Result<()> {
        self.calls.push(format!("revoke:{}", token));
        match self.revoke {
            Some(ref result) => result.clone().map_err(|message| anyhow!(message)),
            None => Err(anyhow!("revoke not supported")),
        }
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
pub struct MockStore {
    slot: Mutex<Option<Session>>,
    fail_get: bool,
    fail_set: bool,
    fail_remove: bool,
    pub calls: CallLog,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
            ..Self::default()
        }
    }

    pub fn failing_get(mut self) -> Self {
        self.fail_get = true;
        self
    }

    pub fn failing_set(mut self) -> Self {
        self.fail_set = true;
        self
    }

    pub fn failing_remove(mut self) -> Self {
        self.fail_remove = true;
        self
    }

    pub fn stored(&self) -> Option<Session> {
        self.slot.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStore for MockStore {
    async fn get_session(&self) -> Result<Option<Session>> {
        self.calls.push("get".to_string());
        if self.fail_get {
            return Err(anyhow!("Storage error"));
        }
        Ok(self.stored())
    }

    async fn set_session(&self, session: &Session) -> Result<()> {
        self.calls.push(format!("set:{}", session.token));
        if self.fail_set {
            return Err(anyhow!("Storage error"));
        }
        *self.slot.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn remove_session(&self) -> Result<()> {
        self.calls.push("remove".to_string());
        if self.fail_remove {
            return Err(anyhow!("Storage error"));
        }
        self.slot.lock().unwrap().take();
        Ok(())
    }
}

// ============================================================================
// Clocks
// ============================================================================

/// Clock that only moves when told to
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Clock that follows tokio's (pausable) time, starting at `base`
pub struct TokioClock {
    base: i64,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(base: i64) -> Self {
        Self {
            base,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_millis(&self) -> i64 {
        self.base + self.start.elapsed().as_millis() as i64
    }
}
