//! Callback access checks.
//!
//! SNS cannot attach custom headers to HTTP deliveries, so the shared secret
//! travels in the subscription URL as `?token=`.

use tracing::warn;

/// Verify the `token` query parameter against the configured secret.
pub fn verify_callback_token(expected: &str, provided: Option<&str>) -> bool {
    let provided = match provided {
        Some(p) if !p.is_empty() => p,
        _ => {
            warn!("callback_token_missing");
            return false;
        }
    };

    let valid = constant_time_compare(expected, provided);

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = provided.len(),
            "callback_token_mismatch"
        );
    }

    valid
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

/// Check if callback token verification is enabled.
pub fn is_token_verification_enabled(token: &Option<String>) -> bool {
    token
        .as_ref()
        .map(|t| !t.trim().is_empty())
        .unwrap_or(false)
}

/// Whether `transport` is accepted. Everything is accepted without an allowlist.
pub fn is_transport_allowed(allowed: Option<&[String]>, transport: &str) -> bool {
    match allowed {
        Some(list) if !list.is_empty() => list.iter().any(|t| t.eq_ignore_ascii_case(transport)),
        _ => true,
    }
}
