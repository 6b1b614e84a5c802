//! Shared-secret checks for inbound webhooks.

use tracing::warn;

/// Compare a provided secret against the configured one in constant time.
///
/// A missing or empty provided secret never matches.
pub fn verify_shared_secret(expected: &str, provided: Option<&str>) -> bool {
    let provided = match provided {
        Some(p) if !p.is_empty() => p,
        _ => {
            warn!("shared_secret_missing");
            return false;
        }
    };

    let valid = constant_time_compare(expected, provided);

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = provided.len(),
            "shared_secret_mismatch"
        );
    }

    valid
}

/// Constant-time string comparison. Only the length check short-circuits.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
