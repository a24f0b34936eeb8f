//! Unverified JWT expiry inspection
//!
//! The client looks at the token's `exp` claim only to avoid sending a
//! request that is certain to be rejected. Nothing here verifies a signature,
//! and a successful decode is never treated as proof of authentication.
//!
//! Every failure mode (no token, wrong segment count, bad base64, payload
//! that isn't JSON, missing or non-numeric `exp`) reads as "expired", which
//! makes the caller refresh instead of erroring.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Decode the `exp` claim (seconds since the epoch) from a compact JWT.
///
/// Accepts both the base64url alphabet and the standard one, with or
/// without padding, since some backends emit either.
pub fn expiry_secs(token: &str) -> Option<f64> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let normalized: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = URL_SAFE_NO_PAD.decode(normalized).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_f64()
}

/// Whether `token` must be refreshed before use, relative to `now_secs`.
///
/// Expired means `now >= exp - skew`.
pub fn is_expired_at(token: Option<&str>, skew: Duration, now_secs: u64) -> bool {
    let Some(exp) = token.and_then(expiry_secs) else {
        return true;
    };
    now_secs as f64 >= exp - skew.as_secs_f64()
}

/// Whether `token` must be refreshed before use, relative to the wall clock.
pub fn is_expired(token: Option<&str>, skew: Duration) -> bool {
    let now_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    is_expired_at(token, skew, now_secs)
}
