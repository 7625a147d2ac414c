//! Session issuance
//!
//! A successful verification ends in a [`Session`]: a signed, self-contained JWT
//! plus the fields it was built from. Nothing about the session is stored; the token
//! is verified statelessly by [`SessionIssuer::verify`].
//!
//! | Field          | Type          | Description                                  |
//! | -------------- | ------------- | -------------------------------------------- |
//! | `token`        | `String`      | The signed JWT handed to the client.         |
//! | `principal_id` | `PrincipalId` | The principal the session authenticates.     |
//! | `identity`     | `String`      | The identity that was verified.              |
//! | `created_at`   | `DateTime`    | When the session was issued.                 |
//! | `expires_at`   | `DateTime`    | When the token stops verifying.              |

pub mod jwt;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{Error, Principal, PrincipalId, error::ValidationError};

pub use jwt::JwtSessionIssuer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub principal_id: PrincipalId,
    pub identity: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Issues sessions for verified principals.
#[async_trait]
pub trait SessionIssuer: Send + Sync + 'static {
    /// Issue a new session for a principal that just proved control of its identity.
    async fn issue(&self, principal: &Principal) -> Result<Session, Error>;

    /// Check a token and rebuild the session it encodes.
    async fn verify(&self, token: &str) -> Result<Session, Error>;
}

/// Claims inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The principal id
    pub sub: String,
    pub email: String,
    /// Unix seconds
    pub iat: i64,
    /// Unix seconds
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Signing scheme and key material. Keys are PEM for RS256, raw bytes for HS256.
#[derive(Debug, Clone)]
pub enum JwtAlgorithm {
    RS256 {
        private_key: Vec<u8>,
        public_key: Vec<u8>,
    },
    HS256 { secret_key: Vec<u8> },
}

/// Signing configuration for session tokens
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub algorithm: JwtAlgorithm,
    /// Issuer claim; when set, tokens from other issuers are rejected
    pub issuer: Option<String>,
}

fn key_error(what: &str, e: impl std::fmt::Display) -> Error {
    ValidationError::InvalidField(format!("{what}: {e}")).into()
}

impl JwtConfig {
    pub fn new_rs256(private_key: Vec<u8>, public_key: Vec<u8>) -> Self {
        let algorithm = JwtAlgorithm::RS256 {
            private_key,
            public_key,
        };
        Self {
            algorithm,
            issuer: None,
        }
    }

    pub fn new_hs256(secret_key: Vec<u8>) -> Self {
        Self {
            algorithm: JwtAlgorithm::HS256 { secret_key },
            issuer: None,
        }
    }

    /// RS256 with keys read from two PEM files.
    pub fn from_rs256_pem_files(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
    ) -> Result<Self, Error> {
        let private_key = std::fs::read(private_key_path)
            .map_err(|e| key_error("Cannot read private key file", e))?;
        let public_key = std::fs::read(public_key_path)
            .map_err(|e| key_error("Cannot read public key file", e))?;

        Ok(Self::new_rs256(private_key, public_key))
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn jwt_algorithm(&self) -> Algorithm {
        match self.algorithm {
            JwtAlgorithm::RS256 { .. } => Algorithm::RS256,
            JwtAlgorithm::HS256 { .. } => Algorithm::HS256,
        }
    }

    pub fn encoding_key(&self) -> Result<EncodingKey, Error> {
        match &self.algorithm {
            JwtAlgorithm::HS256 { secret_key } => Ok(EncodingKey::from_secret(secret_key)),
            JwtAlgorithm::RS256 { private_key, .. } => EncodingKey::from_rsa_pem(private_key)
                .map_err(|e| key_error("Unusable RSA private key", e)),
        }
    }

    pub fn decoding_key(&self) -> Result<DecodingKey, Error> {
        match &self.algorithm {
            JwtAlgorithm::HS256 { secret_key } => Ok(DecodingKey::from_secret(secret_key)),
            JwtAlgorithm::RS256 { public_key, .. } => DecodingKey::from_rsa_pem(public_key)
                .map_err(|e| key_error("Unusable RSA public key", e)),
        }
    }

    /// Algorithm pinned, `exp` checked with no leeway, issuer enforced when set.
    pub fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.jwt_algorithm());
        validation.leeway = 0;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

/// How long sessions last and how their tokens are signed.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub expires_in: Duration,
    pub jwt: JwtConfig,
}

impl SessionConfig {
    /// Sessions signed with `jwt`, valid for 24 hours.
    pub fn new(jwt: JwtConfig) -> Self {
        Self {
            expires_in: Duration::hours(24),
            jwt,
        }
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }
}
