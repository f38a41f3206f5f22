//! Session value type and expiry predicates.
//!
//! Timestamps are epoch milliseconds. A session without `expires_at`
//! never expires.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default threshold for [`is_expiring_soon`] (1 minute)
pub const DEFAULT_EXPIRING_THRESHOLD_MS: i64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Opaque fields carried verbatim across refresh
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    /// A session that never expires
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
            extra: Map::new(),
        }
    }

    pub fn with_expiry(token: impl Into<String>, expires_at: i64) -> Self {
        Self {
            expires_at: Some(expires_at),
            ..Self::new(token)
        }
    }

    /// Build the replacement for this session after a token refresh.
    /// Extra fields are carried over unchanged.
    pub fn replaced(&self, token: impl Into<String>, expires_at: Option<i64>) -> Self {
        Self {
            token: token.into(),
            expires_at,
            extra: self.extra.clone(),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        is_expired(Some(self), now)
    }

    pub fn is_expiring_soon(&self, now: i64, threshold_ms: i64) -> bool {
        is_expiring_soon(Some(self), now, threshold_ms)
    }

    pub fn time_remaining(&self, now: i64) -> i64 {
        time_remaining(Some(self), now)
    }
}

/// True once `expires_at` has been reached (the boundary counts as expired).
pub fn is_expired(session: Option<&Session>, now: i64) -> bool {
    match session.and_then(|s| s.expires_at) {
        Some(expires_at) => expires_at <= now,
        None => false,
    }
}

/// True if the session expires within `threshold_ms` of `now`, including
/// sessions that are already expired.
pub fn is_expiring_soon(session: Option<&Session>, now: i64, threshold_ms: i64) -> bool {
    match session.and_then(|s| s.expires_at) {
        Some(expires_at) => expires_at <= now.saturating_add(threshold_ms),
        None => false,
    }
}

/// Milliseconds until expiry, clamped at zero. Zero when there is no expiry.
pub fn time_remaining(session: Option<&Session>, now: i64) -> i64 {
    match session.and_then(|s| s.expires_at) {
        Some(expires_at) => expires_at.saturating_sub(now).max(0),
        None => 0,
    }
}

/// Expiry timestamp for a token valid for `expires_in_secs` from `now`
pub fn expiry_from(now: i64, expires_in_secs: u64) -> i64 {
    let lifetime_ms = i64::try_from(expires_in_secs)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000);
    now.saturating_add(lifetime_ms)
}

pub fn build_session(token: impl Into<String>, expires_in_secs: u64, now: i64) -> Session {
    Session::with_expiry(token, expiry_from(now, expires_in_secs))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// 2024-01-01T12:00:00Z
    const NOW: i64 = 1_704_110_400_000;

    #[test]
    fn test_build_session() {
        let session = build_session("tok", 3600, NOW);
        assert_eq!(session.token, "tok");
        assert_eq!(session.expires_at, Some(NOW + 3_600_000));
        assert!(session.extra.is_empty());

        let day = build_session("token", 86_400, NOW);
        assert_eq!(day.expires_at, Some(NOW + 86_400 * 1000));
    }

    #[test]
    fn test_build_session_zero_lifetime_is_expired() {
        let session = build_session("token", 0, NOW);
        assert_eq!(session.expires_at, Some(NOW));
        assert!(session.is_expired(NOW));
    }

    #[test]
    fn test_build_session_saturates() {
        let session = build_session("token", u64::MAX, NOW);
        assert_eq!(session.expires_at, Some(i64::MAX));
    }

    #[test]
    fn test_no_session_or_no_expiry() {
        let forever = Session::new("test");
        for now in [i64::MIN, 0, NOW, i64::MAX] {
            assert!(!is_expired(None, now));
            assert!(!is_expiring_soon(None, now, DEFAULT_EXPIRING_THRESHOLD_MS));
            assert_eq!(time_remaining(None, now), 0);

            assert!(!forever.is_expired(now));
            assert!(!forever.is_expiring_soon(now, i64::MAX));
            assert_eq!(forever.time_remaining(now), 0);
        }
    }

    #[test]
    fn test_is_expired() {
        assert!(!Session::with_expiry("t", NOW + 1000).is_expired(NOW));
        assert!(Session::with_expiry("t", NOW - 1000).is_expired(NOW));
        // Expiring exactly now counts as expired
        assert!(Session::with_expiry("t", NOW).is_expired(NOW));
    }

    #[test]
    fn test_is_expiring_soon() {
        let check = |offset: i64, threshold: i64| {
            Session::with_expiry("t", NOW + offset).is_expiring_soon(NOW, threshold)
        };
        // Beyond the default 1 minute
        assert!(!check(120_000, DEFAULT_EXPIRING_THRESHOLD_MS));
        assert!(check(30_000, DEFAULT_EXPIRING_THRESHOLD_MS));
        assert!(check(150_000, 180_000));
        // Boundary is inclusive
        assert!(check(60_000, 60_000));
        assert!(!check(60_001, 60_000));
        // Already expired
        assert!(check(-1000, DEFAULT_EXPIRING_THRESHOLD_MS));
    }

    #[test]
    fn test_predicates_agree_across_offsets() {
        let session = Session::with_expiry("t", NOW);
        for t in [NOW - 400_000, NOW - 60_000, NOW - 1, NOW, NOW + 1, NOW + 90_000] {
            assert_eq!(session.is_expired(t), t >= NOW);
            assert_eq!(session.time_remaining(t), (NOW - t).max(0));
            for threshold in [0, 60_000, 300_000] {
                assert_eq!(
                    session.is_expiring_soon(t, threshold),
                    session.is_expired(t) || t + threshold >= NOW
                );
            }
        }
    }

    #[test]
    fn test_time_remaining() {
        assert_eq!(Session::with_expiry("t", NOW + 30_000).time_remaining(NOW), 30_000);
        assert_eq!(Session::with_expiry("t", NOW - 1000).time_remaining(NOW), 0);
        assert_eq!(Session::with_expiry("t", NOW).time_remaining(NOW), 0);
    }

    #[test]
    fn test_replaced_keeps_extra_fields() {
        let mut session = Session::with_expiry("old", NOW + 1000);
        session.extra.insert("userId".into(), Value::from(42));

        let next = session.replaced("new", Some(NOW + 5000));
        assert_eq!(next.token, "new");
        assert_eq!(next.expires_at, Some(NOW + 5000));
        assert_eq!(next.extra.get("userId"), Some(&Value::from(42)));
        // Source session untouched
        assert_eq!(session.token, "old");
    }

    #[test]
    fn test_session_json_shape() {
        let json = r#"{"token":"abc","expiresAt":1704110400000,"userId":"u-1","roles":["a"]}"#;
        let session: Session = serde_json::from_str(json).expect("Failed to parse session JSON");
        assert_eq!(session.token, "abc");
        assert_eq!(session.expires_at, Some(NOW));
        assert_eq!(session.extra.get("userId"), Some(&Value::from("u-1")));

        let without_expiry: Session =
            serde_json::from_str(r#"{"token":"abc"}"#).expect("Failed to parse session JSON");
        assert_eq!(without_expiry.expires_at, None);
        let out = serde_json::to_string(&without_expiry).expect("Failed to serialize session");
        assert_eq!(out, r#"{"token":"abc"}"#);
    }
}
