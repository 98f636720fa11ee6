//! Inbound webhook signature verification.
//!
//! The calling platform signs each delivery with a shared secret:
//! `elevenlabs-signature: t={unixTimestamp},v0={hexHmacSha256}` where the
//! MAC covers `"{timestamp}."` followed by the raw request body bytes.
//! Verification is a pure predicate: no side effects, fails closed on any
//! malformed input.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Replay window for inbound deliveries, 30 minutes.
pub const DEFAULT_TOLERANCE_SECS: i64 = 30 * 60;

/// Verifies a delivery against the wall clock. See [`verify_at`].
pub fn verify(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
) -> bool {
    verify_at(payload, signature_header, secret, tolerance_secs, Utc::now().timestamp())
}

/// Clock-injected verification: rejects absent or malformed headers,
/// timestamps older than `now_unix - tolerance_secs`, and any signature
/// that does not match the HMAC recomputed over the raw payload bytes.
///
/// Timestamps in the future are accepted; the platform's clock may run
/// ahead of ours, and the upstream contract does not bound skew in that
/// direction.
pub fn verify_at(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
    now_unix: i64,
) -> bool {
    let Some(header) = signature_header else {
        return false;
    };
    let Some((timestamp_field, signature_field)) = header.split_once(',') else {
        return false;
    };
    let Some(timestamp_raw) = timestamp_field.strip_prefix("t=") else {
        return false;
    };
    let Ok(timestamp) = timestamp_raw.parse::<i64>() else {
        return false;
    };

    if timestamp < now_unix - tolerance_secs {
        return false;
    }

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(timestamp_raw.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = format!("v0={}", hex::encode(mac.finalize().into_bytes()));

    expected.as_bytes().ct_eq(signature_field.as_bytes()).into()
}
