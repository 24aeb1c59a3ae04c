//! Time-bound link signatures.
//!
//! A signature proves knowledge of a share's stored password hash without
//! revealing it. It is the hex HMAC-SHA512 of `"<token>|<expiry>"`, keyed by
//! the SHA-256 digest of the secret, where `<expiry>` is RFC 3339 UTC with
//! second precision.

use crate::error::{CryptoError, CryptoResult};
use chrono::{DateTime, Duration, SecondsFormat, Timelike, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

type HmacSha512 = Hmac<Sha512>;

/// Default signature validity: 30 minutes.
pub const DEFAULT_SIGNATURE_TTL_SECS: u64 = 30 * 60;

/// Returns `now + ttl_secs` truncated to whole seconds.
///
/// Saturates at the latest representable instant.
pub fn signature_expiry(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    let expiry = i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    expiry.with_nanosecond(0).unwrap_or(expiry)
}

fn mac(token: &str, secret: &str, expiration: DateTime<Utc>) -> CryptoResult<HmacSha512> {
    let key = Sha256::digest(secret.as_bytes());
    let mut mac =
        HmacSha512::new_from_slice(&key).map_err(|e| CryptoError::Signature(e.to_string()))?;
    let expiry = expiration.to_rfc3339_opts(SecondsFormat::Secs, true);
    mac.update(format!("{token}|{expiry}").as_bytes());
    Ok(mac)
}

/// Computes the signature of `token` under `secret`, valid until `expiration`.
pub fn create_signature(
    token: &str,
    secret: &str,
    expiration: DateTime<Utc>,
) -> CryptoResult<String> {
    Ok(hex::encode(mac(token, secret, expiration)?.finalize().into_bytes()))
}

/// Checks a signature produced by [`create_signature`].
///
/// Fails if the expiration lies before `now`, the signature is not valid
/// hex, or it does not match. The comparison is constant-time.
pub fn verify_signature(
    token: &str,
    secret: &str,
    signature: &str,
    expiration: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    if now > expiration {
        return false;
    }
    let Ok(bytes) = hex::decode(signature) else {
        return false;
    };
    match mac(token, secret, expiration) {
        Ok(mac) => mac.verify_slice(&bytes).is_ok(),
        Err(_) => false,
    }
}
