//! Stateless JWT sessions
//!
//! Tokens are self-contained: nothing is written to storage when a session is
//! issued, and verification needs only the signing key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Header, decode, encode, errors::ErrorKind};

use crate::{
    Error, Principal, PrincipalId,
    error::{CryptoError, SessionError},
};

use super::{JwtClaims, Session, SessionConfig, SessionIssuer};

pub struct JwtSessionIssuer {
    config: SessionConfig,
}

impl JwtSessionIssuer {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

#[async_trait]
impl SessionIssuer for JwtSessionIssuer {
    async fn issue(&self, principal: &Principal) -> Result<Session, Error> {
        let now = Utc::now();
        let expires_at = now + self.config.expires_in;

        let claims = JwtClaims {
            sub: principal.id.to_string(),
            email: principal.identity.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.jwt.issuer.clone(),
        };

        let header = Header::new(self.config.jwt.jwt_algorithm());
        let encoding_key = self.config.jwt.encoding_key()?;
        let token = encode(&header, &claims, &encoding_key)
            .map_err(|e| CryptoError::JwtSigning(e.to_string()))?;

        tracing::debug!(principal_id = %principal.id, "Issued session");

        Ok(Session {
            token,
            principal_id: principal.id.clone(),
            identity: principal.identity.clone(),
            created_at: now,
            expires_at,
        })
    }

    async fn verify(&self, token: &str) -> Result<Session, Error> {
        let decoding_key = self.config.jwt.decoding_key()?;
        let validation = self.config.jwt.validation();

        let claims = decode::<JwtClaims>(token, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::InvalidToken(format!("JWT validation failed: {e}")),
            })?
            .claims;

        let created_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| SessionError::InvalidToken("Invalid iat claim".to_string()))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| SessionError::InvalidToken("Invalid exp claim".to_string()))?;

        Ok(Session {
            token: token.to_string(),
            principal_id: PrincipalId::new(&claims.sub),
            identity: claims.email,
            created_at,
            expires_at,
        })
    }
}
