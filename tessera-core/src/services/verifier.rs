//! Verification of submitted codes.
//!
//! A code moves from active to used on success, or to invalidated once it has
//! expired or run out of attempts. Neither terminal state is ever found again,
//! so later attempts see [`VerificationError::NotFound`].
//!
//! The lookup and the attempt increment are separate store calls, so concurrent
//! guesses against one code can each pass the attempt check before any increment
//! lands. The attempt ceiling is therefore a soft bound under concurrency.
//! Consumption is not: the store flips `used` for exactly one caller, and only
//! that caller gets a session.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Error, Session,
    crypto::CodeHasher,
    error::VerificationError,
    repositories::{CodeRepository, PrincipalDirectory},
    session::SessionIssuer,
};

use super::OtpConfig;

/// Checks submitted codes and turns a correct one into a session.
pub struct OtpVerifier<C: CodeRepository, P: PrincipalDirectory, S: SessionIssuer> {
    codes: Arc<C>,
    principals: Arc<P>,
    sessions: Arc<S>,
    hasher: CodeHasher,
    config: OtpConfig,
}

impl<C: CodeRepository, P: PrincipalDirectory, S: SessionIssuer> OtpVerifier<C, P, S> {
    pub fn new(codes: Arc<C>, principals: Arc<P>, sessions: Arc<S>, config: OtpConfig) -> Self {
        Self {
            codes,
            principals,
            sessions,
            hasher: CodeHasher::new(),
            config,
        }
    }

    pub async fn verify_code(&self, identity: &str, code: &str) -> Result<Session, Error> {
        self.verify_code_at(identity, code, Utc::now()).await
    }

    /// Verify a code with expiry judged at `now` rather than the system clock.
    pub async fn verify_code_at(
        &self,
        identity: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, Error> {
        let Some(active) = self.codes.find_active(identity).await? else {
            tracing::debug!(identity, "No active verification code");
            return Err(VerificationError::NotFound.into());
        };

        if active.is_expired_at(now) {
            self.codes.invalidate_active(identity).await?;
            tracing::debug!(identity, code_id = %active.id, "Verification code expired");
            return Err(VerificationError::Expired.into());
        }

        if active.attempts >= self.config.max_attempts {
            self.codes.invalidate_active(identity).await?;
            tracing::warn!(
                code_id = %active.id,
                attempts = active.attempts,
                "Verification code locked after too many attempts"
            );
            return Err(VerificationError::TooManyAttempts.into());
        }

        // Counted before comparing so a wrong guess is never free
        let Some(attempts) = self.codes.increment_attempts(&active.id).await? else {
            tracing::debug!(identity, code_id = %active.id, "Verification code consumed meanwhile");
            return Err(VerificationError::NotFound.into());
        };

        if !self.hasher.matches(code, &active.code_hash).await? {
            tracing::debug!(identity, attempts, "Invalid verification code");
            return Err(VerificationError::InvalidCode.into());
        }

        if !self.codes.mark_used(&active.id).await? {
            tracing::debug!(identity, code_id = %active.id, "Verification code consumed meanwhile");
            return Err(VerificationError::NotFound.into());
        }

        let principal = self.principals.resolve_or_create(identity).await?;
        let session = self.sessions.issue(&principal).await?;

        tracing::info!(principal_id = %principal.id, "Verification code accepted");

        Ok(session)
    }
}
