//! Miniflux webhook signature verification.
//!
//! Miniflux signs each webhook body with HMAC-SHA256 keyed by the webhook
//! secret and sends the hex digest in the `X-Miniflux-Signature` header.
//! Reference: https://miniflux.app/docs/webhooks.html

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Verify a Miniflux webhook signature.
///
/// The digest must be computed over the body exactly as received; parsing and
/// re-serializing the JSON first changes whitespace and key order.
///
/// # Arguments
///
/// * `secret` - The webhook secret from the Miniflux integration settings
/// * `body` - The raw request body
/// * `signature` - The signature header value, if the header was present
///
/// # Returns
///
/// `true` only if a secret is configured, a signature was supplied and it
/// matches. Everything else fails closed.
pub fn verify_miniflux_signature(secret: Option<&str>, body: &[u8], signature: Option<&str>) -> bool {
    let secret = secret.unwrap_or_default();
    let signature = signature.map(str::trim).unwrap_or_default();

    if !is_signature_verification_enabled(secret) || signature.is_empty() {
        warn!(
            has_secret = !secret.trim().is_empty(),
            has_signature = !signature.is_empty(),
            "miniflux_signature_missing_fields"
        );
        return false;
    }

    let expected_signature = match compute_signature(secret, body) {
        Some(sig) => sig,
        None => {
            warn!("miniflux_signature_invalid_key");
            return false;
        }
    };

    let valid = constant_time_compare(&expected_signature, signature);

    if !valid {
        warn!(
            expected_length = expected_signature.len(),
            actual_length = signature.len(),
            body_length = body.len(),
            "miniflux_signature_mismatch"
        );
    }

    valid
}

/// Hex-encoded HMAC-SHA256 of `body` keyed with `secret`.
pub fn compute_signature(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// A blank secret never verifies anything.
fn is_signature_verification_enabled(secret: &str) -> bool {
    !secret.trim().is_empty()
}
