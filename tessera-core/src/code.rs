//! Verification codes
//!
//! One row is stored per issuance. The plaintext code only ever exists in memory
//! between generation and dispatch; storage holds the hash.
//!
//! | Field        | Type       | Description                                              |
//! | ------------ | ---------- | -------------------------------------------------------- |
//! | `id`         | `CodeId`   | Opaque identifier, assigned at creation.                 |
//! | `identity`   | `String`   | The email the code authenticates. Not unique.            |
//! | `code_hash`  | `String`   | Argon2 PHC hash of the plaintext code.                   |
//! | `created_at` | `DateTime` | When the code was issued.                                |
//! | `expires_at` | `DateTime` | `created_at` plus the code TTL.                          |
//! | `attempts`   | `u32`      | Verification attempts made against this code.            |
//! | `used`       | `bool`     | Set once the code is consumed or invalidated. Terminal.  |
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, id::generate_prefixed_id};

/// A unique, stable identifier for a verification code record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeId(String);

impl CodeId {
    pub fn new(id: &str) -> Self {
        CodeId(id.to_string())
    }

    pub fn new_random() -> Result<Self, Error> {
        Ok(CodeId(generate_prefixed_id("otp")?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for CodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for CodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode {
    pub id: CodeId,
    pub identity: String,
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
    pub used: bool,
}

impl VerificationCode {
    /// Whether the code has expired as of `now`.
    ///
    /// A code expires at the instant `expires_at` is reached, not after it.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Unused and not yet expired as of `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired_at(now)
    }
}

/// A code about to be inserted. Counters always start at zero and unused.
#[derive(Debug, Clone)]
pub struct NewVerificationCode {
    pub id: CodeId,
    pub identity: String,
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewVerificationCode {
    pub fn new(
        identity: &str,
        code_hash: String,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, Error> {
        Ok(Self {
            id: CodeId::new_random()?,
            identity: identity.to_string(),
            code_hash,
            created_at,
            expires_at: created_at + ttl,
        })
    }

    /// The record as it looks right after insertion.
    pub fn into_record(self) -> VerificationCode {
        VerificationCode {
            id: self.id,
            identity: self.identity,
            code_hash: self.code_hash,
            created_at: self.created_at,
            expires_at: self.expires_at,
            attempts: 0,
            used: false,
        }
    }
}
