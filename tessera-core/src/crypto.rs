//! Cryptographic utilities for verification codes
//!
//! Verification codes are low-entropy secrets (one million possible values), so
//! unlike high-entropy tokens they are stored the way passwords are: salted and
//! hashed with a deliberately slow function. This module uses the `password_auth`
//! crate (Argon2, PHC string format) for both hashing and comparison.
//!
//! # Security
//!
//! - Codes are drawn from the operating system CSPRNG, never from a seeded PRNG.
//! - Comparison is delegated to the hashing primitive's verify routine; plaintext
//!   codes are never compared with string equality.

use rand::{TryRngCore, rngs::OsRng};

use crate::{Error, error::CryptoError};

/// Number of digits in a verification code.
pub const CODE_DIGITS: usize = 6;

const CODE_SPACE: u32 = 1_000_000;

/// Generate a uniformly random six digit verification code.
///
/// Leading zeros are preserved, so `"004213"` is a valid result.
///
/// # Errors
///
/// Returns [`CryptoError::Random`] if the OS random number generator fails.
pub fn generate_code() -> Result<String, CryptoError> {
    // Reject the top partial bucket so every code is equally likely.
    let zone = (u32::MAX / CODE_SPACE) * CODE_SPACE;
    loop {
        let value = OsRng
            .try_next_u32()
            .map_err(|e| CryptoError::Random(e.to_string()))?;
        if value < zone {
            return Ok(format!("{:0width$}", value % CODE_SPACE, width = CODE_DIGITS));
        }
    }
}

/// Hash a plaintext code for storage.
///
/// Every call uses a fresh salt, so hashing the same code twice yields different
/// strings.
pub fn hash_code(code: &str) -> String {
    password_auth::generate_hash(code)
}

/// Check a plaintext code against a stored hash.
///
/// Returns `false` for a wrong code and for a malformed stored hash alike.
pub fn verify_code_hash(code: &str, stored_hash: &str) -> bool {
    password_auth::verify_password(code, stored_hash).is_ok()
}

/// Hashes and compares verification codes off the async executor.
///
/// Argon2 takes tens of milliseconds per call, so the work is moved to the
/// blocking thread pool rather than stalling a runtime worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeHasher;

impl CodeHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a plaintext code for storage.
    pub async fn hash(&self, code: &str) -> Result<String, Error> {
        let code = code.to_string();
        tokio::task::spawn_blocking(move || hash_code(&code))
            .await
            .map_err(|e| CryptoError::Hash(e.to_string()).into())
    }

    /// Check a plaintext code against a stored hash.
    pub async fn matches(&self, code: &str, stored_hash: &str) -> Result<bool, Error> {
        let code = code.to_string();
        let stored_hash = stored_hash.to_string();
        tokio::task::spawn_blocking(move || verify_code_hash(&code, &stored_hash))
            .await
            .map_err(|e| CryptoError::Hash(e.to_string()).into())
    }
}
