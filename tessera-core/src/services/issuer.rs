//! Verification code issuance.
//!
//! Requesting a code looks identical to the caller whether a code was issued, the
//! identity is unknown, or the identity has hit its issuance ceiling. Only the logs
//! and the internal [`IssueOutcome`] tell them apart.
//!
//! # Example
//!
//! ```rust,ignore
//! let issuer = OtpIssuer::new(codes, principals, dispatch, OtpConfig::default());
//!
//! // Always returns (), whatever happened
//! issuer.request_code("user@example.com").await;
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{
    Error, NewVerificationCode,
    crypto::{CodeHasher, generate_code},
    repositories::{AuditSink, CodeRepository, PrincipalDirectory},
};

use super::DispatchService;

/// Hashed on the no-op branches so they cost about as much as a real issuance.
const DECOY_CODE: &str = "000000";

/// Lifetime, attempt and issuance limits for verification codes.
#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// How long a code stays valid after issuance.
    pub code_ttl: Duration,
    /// Verification attempts allowed against one code before it locks.
    pub max_attempts: u32,
    /// Codes that may be issued to one identity per `issuance_window`.
    pub max_codes_per_window: u32,
    pub issuance_window: Duration,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_ttl: Duration::minutes(10),
            max_attempts: 5,
            max_codes_per_window: 3,
            issuance_window: Duration::hours(1),
        }
    }
}

impl OtpConfig {
    pub fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_max_codes_per_window(mut self, max: u32, window: Duration) -> Self {
        self.max_codes_per_window = max;
        self.issuance_window = window;
        self
    }
}

/// What a code request actually did. Never shown to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOutcome {
    Issued,
    Throttled,
    UnknownIdentity,
}

pub struct OtpIssuer<C: CodeRepository, P: PrincipalDirectory, A: AuditSink> {
    codes: Arc<C>,
    principals: Arc<P>,
    dispatch: Arc<DispatchService<A>>,
    hasher: CodeHasher,
    config: OtpConfig,
}

impl<C: CodeRepository, P: PrincipalDirectory, A: AuditSink> OtpIssuer<C, P, A> {
    pub fn new(
        codes: Arc<C>,
        principals: Arc<P>,
        dispatch: Arc<DispatchService<A>>,
        config: OtpConfig,
    ) -> Self {
        Self {
            codes,
            principals,
            dispatch,
            hasher: CodeHasher::new(),
            config,
        }
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Request a verification code for an identity.
    ///
    /// Always succeeds from the caller's point of view. Storage failures are logged
    /// and swallowed so they cannot be used to discover registered identities.
    pub async fn request_code(&self, identity: &str) {
        match self.issue(identity).await {
            Ok(outcome) => {
                tracing::debug!(identity, outcome = ?outcome, "Verification code requested");
            }
            Err(e) => {
                tracing::error!(error = %e, identity, "Failed to issue verification code");
                self.spend_decoy_hash().await;
            }
        }
    }

    /// Issue a code if the identity is known and under its issuance ceiling.
    pub async fn issue(&self, identity: &str) -> Result<IssueOutcome, Error> {
        let now = Utc::now();

        let since = now - self.config.issuance_window;
        let recent = self.codes.count_recent(identity, since).await?;
        if recent >= self.config.max_codes_per_window {
            tracing::debug!(identity, count = recent, "Verification code issuance throttled");
            self.spend_decoy_hash().await;
            return Ok(IssueOutcome::Throttled);
        }

        if !self.principals.exists(identity).await? {
            tracing::debug!(identity, "Verification code requested for unknown identity");
            self.spend_decoy_hash().await;
            return Ok(IssueOutcome::UnknownIdentity);
        }

        let invalidated = self.codes.invalidate_active(identity).await?;
        if invalidated > 0 {
            tracing::debug!(identity, count = invalidated, "Invalidated previous codes");
        }

        let code = generate_code()?;
        let code_hash = self.hasher.hash(&code).await?;
        let record = NewVerificationCode::new(identity, code_hash, now, self.config.code_ttl)?;
        self.codes.insert(record).await?;

        match self.codes.delete_expired().await {
            Ok(count) if count > 0 => {
                tracing::debug!(count, "Deleted expired verification codes");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to delete expired verification codes");
            }
            _ => {}
        }

        self.dispatch
            .send_code(identity, &code, self.config.code_ttl.num_minutes())
            .await;

        Ok(IssueOutcome::Issued)
    }

    async fn spend_decoy_hash(&self) {
        if let Err(e) = self.hasher.hash(DECOY_CODE).await {
            tracing::warn!(error = %e, "Decoy hash failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{
        MockAuditSink, MockCodeRepository, MockPrincipalDirectory, RecordingDispatcher,
    };
    use crate::{CodeId, VerificationCode, crypto::verify_code_hash};

    const KNOWN: &str = "a@example.com";

    struct Fixture {
        codes: Arc<MockCodeRepository>,
        dispatcher: Arc<RecordingDispatcher>,
        audit: Arc<MockAuditSink>,
        issuer: OtpIssuer<MockCodeRepository, MockPrincipalDirectory, MockAuditSink>,
    }

    fn fixture() -> Fixture {
        let codes = Arc::new(MockCodeRepository::default());
        let principals = Arc::new(MockPrincipalDirectory::with_identity(KNOWN));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let audit = Arc::new(MockAuditSink::default());
        let dispatch = Arc::new(DispatchService::new(dispatcher.clone(), audit.clone()));
        let issuer = OtpIssuer::new(codes.clone(), principals, dispatch, OtpConfig::default());
        Fixture {
            codes,
            dispatcher,
            audit,
            issuer,
        }
    }

    #[tokio::test]
    async fn test_issue_for_known_identity() {
        let f = fixture();
        let before = Utc::now();

        assert_eq!(f.issuer.issue(KNOWN).await.unwrap(), IssueOutcome::Issued);

        let stored = f.codes.codes_for(KNOWN);
        assert_eq!(stored.len(), 1);
        let code = &stored[0];
        assert_eq!(code.attempts, 0);
        assert!(!code.used);
        assert_eq!(code.expires_at - code.created_at, Duration::minutes(10));
        assert!(code.created_at >= before);

        let plaintext = f.dispatcher.last_code(KNOWN).unwrap();
        assert_ne!(code.code_hash, plaintext);
        assert!(verify_code_hash(&plaintext, &code.code_hash));
        assert_eq!(f.audit.records().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_identity_is_silent() {
        let f = fixture();

        assert_eq!(
            f.issuer.issue("x@nowhere.test").await.unwrap(),
            IssueOutcome::UnknownIdentity
        );
        f.issuer.request_code("x@nowhere.test").await;

        assert!(f.codes.codes().is_empty());
        assert_eq!(f.dispatcher.sent_codes(), 0);
        assert!(f.audit.records().is_empty());
    }

    #[tokio::test]
    async fn test_fourth_request_in_window_is_throttled() {
        let f = fixture();

        for _ in 0..3 {
            assert_eq!(f.issuer.issue(KNOWN).await.unwrap(), IssueOutcome::Issued);
        }
        assert_eq!(f.issuer.issue(KNOWN).await.unwrap(), IssueOutcome::Throttled);

        assert_eq!(f.codes.codes_for(KNOWN).len(), 3);
        assert_eq!(f.dispatcher.sent_codes(), 3);
    }

    #[tokio::test]
    async fn test_codes_older_than_window_do_not_count() {
        let f = fixture();
        let long_ago = Utc::now() - Duration::hours(2);
        for _ in 0..3 {
            f.codes.push(VerificationCode {
                id: CodeId::new_random().unwrap(),
                identity: KNOWN.to_string(),
                code_hash: "hash".to_string(),
                created_at: long_ago,
                // Kept unexpired so the sweep inside issue() leaves them alone
                expires_at: Utc::now() + Duration::minutes(5),
                attempts: 0,
                used: true,
            });
        }

        assert_eq!(f.issuer.issue(KNOWN).await.unwrap(), IssueOutcome::Issued);
    }

    #[tokio::test]
    async fn test_new_code_supersedes_previous() {
        let f = fixture();

        f.issuer.issue(KNOWN).await.unwrap();
        f.issuer.issue(KNOWN).await.unwrap();

        let stored = f.codes.codes_for(KNOWN);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored.iter().filter(|c| !c.used).count(), 1);
        assert!(stored[0].used);
        assert!(!stored[1].used);
    }

    #[tokio::test]
    async fn test_request_code_swallows_storage_failure() {
        let f = fixture();
        f.codes.set_failing(true);

        assert!(f.issuer.issue(KNOWN).await.is_err());
        // Must not panic or surface anything
        f.issuer.request_code(KNOWN).await;
        assert_eq!(f.dispatcher.sent_codes(), 0);
    }

    #[tokio::test]
    async fn test_issue_sweeps_expired_codes() {
        let f = fixture();
        let past = Utc::now() - Duration::hours(3);
        f.codes.push(VerificationCode {
            id: CodeId::new_random().unwrap(),
            identity: "other@example.com".to_string(),
            code_hash: "hash".to_string(),
            created_at: past,
            expires_at: past + Duration::minutes(10),
            attempts: 0,
            used: false,
        });

        f.issuer.issue(KNOWN).await.unwrap();

        assert!(f.codes.codes_for("other@example.com").is_empty());
    }
}
