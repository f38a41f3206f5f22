use chrono::{DateTime, Local, Utc};

/// Format remaining session lifetime for display
pub fn format_remaining(ms: i64) -> String {
    let minutes = ms / 60_000;
    if ms <= 0 {
        "expired".to_string()
    } else if minutes < 1 {
        format!("{}s", ms / 1000)
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes < 1440 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{}d {}h", minutes / 1440, (minutes % 1440) / 60)
    }
}

/// Format an epoch-millisecond expiry in local time
pub fn format_expiry(expires_at: Option<i64>) -> String {
    match expires_at.and_then(DateTime::<Utc>::from_timestamp_millis) {
        Some(dt) => dt.with_timezone(&Local).format("%b %d, %Y %H:%M:%S").to_string(),
        None => "never".to_string(),
    }
}

/// Hide most of an email/phone identifier: `user@example.com` → `u***@example.com`
pub fn mask_identifier(identifier: &str) -> String {
    let (local, domain) = match identifier.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (identifier, None),
    };
    let keep = if domain.is_some() { 1 } else { 3 };
    let shown: String = local.chars().take(keep).collect();
    let hidden = local.chars().count().saturating_sub(keep);

    let mut masked = format!("{}{}", shown, "*".repeat(hidden.min(3)));
    if let Some(domain) = domain {
        masked.push('@');
        masked.push_str(domain);
    }
    masked
}
