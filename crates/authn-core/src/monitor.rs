//! Session lifecycle monitor.
//!
//! [`SessionMonitor`] owns the current session and drives it through
//! hydrate → authenticate → monitor → refresh/expire → logout. While a
//! session is held, a background task re-checks it on a fixed interval:
//!
//! 1. expired: clear it and stop
//! 2. inside the refresh window: refresh if the adapter can
//! 3. inside the expiry floor and not refreshed: clear it and stop
//!
//! Every operation that mutates the session runs under one async lifecycle
//! lock, so a check tick never interleaves with a verify or a logout.
//! State is published through a `watch` channel for UI layers.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::adapter::{CredentialAdapter, TokenRefresh};
use crate::clock::{Clock, SystemClock};
use crate::config::{MonitorConfig, RefreshPolicy};
use crate::error::AuthError;
use crate::session::{build_session, expiry_from, Session};
use crate::state::{AuthState, AuthStatus, AuthView};
use crate::store::SessionStore;

pub struct SessionMonitorBuilder {
    adapter: Arc<dyn CredentialAdapter>,
    store: Arc<dyn SessionStore>,
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
}

impl SessionMonitorBuilder {
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> SessionMonitor {
        let (state, _) = watch::channel(AuthState::default());
        SessionMonitor {
            inner: Arc::new(Inner {
                adapter: self.adapter,
                store: self.store,
                clock: self.clock,
                config: self.config,
                state,
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }
}

/// Handle to the session monitor. Clones share the same session.
///
/// The recurring check stops when [`SessionMonitor::shutdown`] is called or
/// the last handle is dropped.
#[derive(Clone)]
pub struct SessionMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    adapter: Arc<dyn CredentialAdapter>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    state: watch::Sender<AuthState>,
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    check: Option<JoinHandle<()>>,
}

impl Lifecycle {
    fn stop_check(&mut self) {
        if let Some(handle) = self.check.take() {
            handle.abort();
        }
    }

    /// Forget the handle without aborting. Only the check task itself calls
    /// this, right before it exits.
    fn release_check(&mut self) {
        self.check.take();
    }

    fn is_running(&self) -> bool {
        self.check.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckOutcome {
    Continue,
    Stopped,
}

impl SessionMonitor {
    pub fn builder(
        adapter: Arc<dyn CredentialAdapter>,
        store: Arc<dyn SessionStore>,
    ) -> SessionMonitorBuilder {
        SessionMonitorBuilder {
            adapter,
            store,
            config: MonitorConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Monitor with default timings and the system clock
    pub fn new(adapter: Arc<dyn CredentialAdapter>, store: Arc<dyn SessionStore>) -> Self {
        Self::builder(adapter, store).build()
    }

    /// Restore the persisted session. Call once at startup.
    pub async fn hydrate(&self) -> Result<(), AuthError> {
        let inner = &self.inner;
        let mut lifecycle = inner.lifecycle.lock().await;

        let stored = match inner.store.get_session().await {
            Ok(stored) => stored,
            Err(e) => {
                error!(error = %e, "Failed to load stored session");
                return Err(inner.fail(AuthError::storage(e)));
            }
        };

        let now = inner.clock.now_millis();
        match stored {
            None => {
                debug!("No stored session");
                inner.update(|state| {
                    state.session = None;
                    state.status = AuthStatus::Idle;
                    state.error = None;
                });
            }
            Some(session) if session.token.is_empty() => {
                warn!("Stored session has no token, clearing");
                inner.clear_session(&mut lifecycle).await;
                inner.set_idle();
            }
            Some(session) if session.is_expired(now) => {
                info!(expired_at = ?session.expires_at, "Stored session expired, clearing");
                inner.clear_session(&mut lifecycle).await;
                inner.set_idle();
            }
            Some(session) => {
                info!(expires_at = ?session.expires_at, "Restored stored session");
                inner.update(move |state| {
                    state.session = Some(session);
                    state.status = AuthStatus::Authenticated;
                    state.error = None;
                });
                inner.start_check(&mut lifecycle);
            }
        }
        Ok(())
    }

    /// Ask the adapter to deliver a passcode to `identifier`.
    ///
    /// Leaves any current session alone and does not wait for other
    /// operations.
    pub async fn send_otp(&self, identifier: &str) -> Result<(), AuthError> {
        let inner = &self.inner;
        inner.update(|state| {
            state.status = AuthStatus::Sending;
            state.error = None;
        });

        match inner.adapter.send_otp(identifier).await {
            Ok(()) => {
                debug!("Passcode sent");
                inner.update(|state| state.status = AuthStatus::Idle);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to send passcode");
                Err(inner.fail(AuthError::send_otp(e)))
            }
        }
    }

    /// Verify a passcode and, on success, persist and adopt the new session.
    ///
    /// The session is only adopted once the store has accepted it.
    pub async fn verify_otp(&self, identifier: &str, code: &str) -> Result<(), AuthError> {
        let inner = &self.inner;
        let mut lifecycle = inner.lifecycle.lock().await;
        inner.update(|state| {
            state.status = AuthStatus::Verifying;
            state.error = None;
        });

        let verified = match inner.adapter.verify_otp(identifier, code).await {
            Ok(verified) => verified,
            Err(e) => {
                error!(error = %e, "Passcode verification failed");
                return Err(inner.fail(AuthError::verify_otp(e)));
            }
        };
        if verified.token.is_empty() {
            error!("Passcode verification returned an empty token");
            return Err(inner.fail(AuthError::EmptyToken));
        }

        let session = build_session(verified.token, verified.expires_in, inner.clock.now_millis());
        if let Err(e) = inner.store.set_session(&session).await {
            error!(error = %e, "Failed to persist new session");
            return Err(inner.fail(AuthError::storage(e)));
        }

        info!(expires_in_secs = verified.expires_in, "Passcode verified, session established");
        inner.update(move |state| {
            state.session = Some(session);
            state.status = AuthStatus::Authenticated;
        });
        inner.start_check(&mut lifecycle);
        Ok(())
    }

    /// End the session. Always completes: revocation and storage failures
    /// are logged and skipped.
    pub async fn logout(&self) {
        let inner = &self.inner;
        let mut lifecycle = inner.lifecycle.lock().await;
        lifecycle.stop_check();

        let session = inner.current_session();
        if let Some(ref session) = session {
            if let Some(revoker) = inner.adapter.token_revoke() {
                if let Err(e) = revoker.revoke_token(&session.token).await {
                    warn!(error = %e, "Token revocation failed, continuing logout");
                }
            }
        }

        inner.clear_session(&mut lifecycle).await;
        inner.update(|state| {
            state.status = AuthStatus::Idle;
            state.error = None;
        });
        info!(had_session = session.is_some(), "Logged out");
    }

    /// Stop the recurring check. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.inner.lifecycle.lock().await.stop_check();
        debug!("Session monitor shut down");
    }

    /// Whether the recurring check is currently scheduled
    pub async fn is_monitoring(&self) -> bool {
        self.inner.lifecycle.lock().await.is_running()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn view(&self) -> AuthView {
        AuthView::new(self.state(), self.inner.clock.now_millis())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .state
            .borrow()
            .is_authenticated(self.inner.clock.now_millis())
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }
}

impl Inner {
    fn update(&self, modify: impl FnOnce(&mut AuthState)) {
        self.state.send_modify(modify);
    }

    /// Record `err` as the current error and hand it back
    fn fail(&self, err: AuthError) -> AuthError {
        let recorded = err.clone();
        self.update(move |state| {
            state.status = AuthStatus::Error;
            state.error = Some(recorded);
        });
        err
    }

    fn set_idle(&self) {
        self.update(|state| {
            state.session = None;
            state.status = AuthStatus::Idle;
            state.error = None;
        });
    }

    fn current_session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    async fn clear_session(&self, lifecycle: &mut Lifecycle) {
        lifecycle.stop_check();
        self.update(|state| state.session = None);
        if let Err(e) = self.store.remove_session().await {
            warn!(error = %e, "Failed to remove stored session");
        }
    }

    async fn force_logout(&self, lifecycle: &mut Lifecycle, reason: AuthError) {
        self.clear_session(lifecycle).await;
        self.update(move |state| {
            state.status = AuthStatus::Idle;
            state.error = Some(reason);
        });
    }

    fn start_check(self: &Arc<Self>, lifecycle: &mut Lifecycle) {
        lifecycle.stop_check();
        let period = self.config.check_interval();
        lifecycle.check = Some(tokio::spawn(run_checks(Arc::downgrade(self), period)));
        debug!(interval_ms = period.as_millis() as u64, "Session check started");
    }

    async fn check_once(&self) -> CheckOutcome {
        let mut lifecycle = self.lifecycle.lock().await;

        let Some(session) = self.current_session() else {
            lifecycle.release_check();
            return CheckOutcome::Stopped;
        };

        let now = self.clock.now_millis();
        if session.is_expired(now) {
            info!("Session expired, logging out");
            lifecycle.release_check();
            self.force_logout(&mut lifecycle, AuthError::SessionExpired).await;
            return CheckOutcome::Stopped;
        }

        let mut refresh_error = None;
        if session.is_expiring_soon(now, self.config.refresh_window_ms) {
            match self.adapter.token_refresh() {
                Some(refresher) => match self.refresh(refresher, &session, now).await {
                    Ok(()) => return CheckOutcome::Continue,
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed");
                        refresh_error = Some(e);
                    }
                },
                None => debug!(
                    remaining_ms = session.time_remaining(now),
                    "Session expiring soon, adapter cannot refresh"
                ),
            }
        }

        if session.is_expiring_soon(now, self.config.expiry_floor_ms) {
            let reason = match refresh_error {
                Some(e) => AuthError::refresh_failed(e),
                None => AuthError::SessionExpired,
            };
            info!(reason = %reason, "Session reached expiry floor, logging out");
            lifecycle.release_check();
            self.force_logout(&mut lifecycle, reason).await;
            return CheckOutcome::Stopped;
        }

        CheckOutcome::Continue
    }

    async fn refresh(
        &self,
        refresher: &dyn TokenRefresh,
        session: &Session,
        now: i64,
    ) -> anyhow::Result<()> {
        let refreshed = refresher.refresh_token(&session.token).await?;
        if refreshed.token.is_empty() {
            anyhow::bail!("Refresh returned an empty token");
        }

        let expires_at = match (self.config.refresh_policy, refreshed.expires_in) {
            (RefreshPolicy::TrustAdapter, Some(secs)) => {
                Some(expiry_from(self.clock.now_millis(), secs))
            }
            // The replacement keeps the lifetime the old token had left at `now`
            _ => session.expires_at.map(|_| now + session.time_remaining(now)),
        };
        let next = session.replaced(refreshed.token, expires_at);

        if let Err(e) = self.store.set_session(&next).await {
            warn!(error = %e, "Failed to persist refreshed session");
        }
        info!(expires_at = ?next.expires_at, "Session token refreshed");
        self.update(move |state| state.session = Some(next));
        Ok(())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.lifecycle.get_mut().stop_check();
    }
}

/// Body of the recurring check task. Holds only a weak reference so the
/// monitor can be dropped while the task sleeps.
async fn run_checks(inner: Weak<Inner>, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if inner.check_once().await == CheckOutcome::Stopped {
            break;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
