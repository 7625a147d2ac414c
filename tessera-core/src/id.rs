//! ID generation utilities with prefix support
//!
//! IDs look like `{prefix}_{random}` where the random part is at least 96 bits of
//! OS randomness, base64 URL-safe encoded without padding.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::error::CryptoError;

/// Generate a prefixed ID with 96 bits of entropy
///
/// # Arguments
/// * `prefix` - The prefix for the ID (e.g., "otp", "prn")
///
/// # Example
/// ```
/// use tessera_core::id::generate_prefixed_id;
///
/// let id = generate_prefixed_id("otp").unwrap();
/// assert!(id.starts_with("otp_"));
/// ```
pub fn generate_prefixed_id(prefix: &str) -> Result<String, CryptoError> {
    let mut bytes = [0u8; 12];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Random(e.to_string()))?;

    let encoded = BASE64_URL_SAFE_NO_PAD.encode(bytes);

    Ok(format!("{prefix}_{encoded}"))
}

/// Validate that a prefixed ID has the expected format
///
/// # Returns
/// `true` if the ID starts with `{expected_prefix}_` followed by at least 96 bits
/// of base64 URL-safe data, `false` otherwise
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some(random_part) = id
        .strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= 12,
        Err(_) => false,
    }
}
