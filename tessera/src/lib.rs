//! # Tessera
//!
//! Tessera authenticates users with short-lived numeric codes sent to their email
//! address, and gates API traffic with a per-client dual-window rate limiter.
//!
//! What you get:
//! - Six-digit codes, stored only as Argon2 hashes, valid for ten minutes
//! - At most three codes per identity per hour, and five guesses per code
//! - Requests for unknown identities that look exactly like real ones
//! - Stateless JWT sessions once a code is verified
//! - Per-minute and per-hour request ceilings per client address
//!
//! ## Storage Support
//!
//! - SQLite (the `sqlite` feature, enabled by default)
//!
//! ## Example
//!
//! ```rust,no_run
//! use tessera::{JwtConfig, SessionConfig, TesseraBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tessera = TesseraBuilder::new()
//!         .with_sqlite("sqlite://tessera.db?mode=rwc")
//!         .await?
//!         .with_session_config(SessionConfig::new(JwtConfig::new_hs256(b"secret".to_vec())))
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     tessera.request_code("user@example.com").await;
//!     let session = tessera.verify_code("user@example.com", "123456").await?;
//!     println!("{}", session.token);
//!
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tessera_core::{
    CodeSweeper, DispatchService, Dispatcher, JwtSessionIssuer, LogDispatcher, OtpIssuer,
    OtpVerifier, RepositoryProvider, RequestRateLimiter, SessionIssuer,
    error::VerificationError,
    repositories::{AuditSinkAdapter, CodeRepositoryAdapter, PrincipalDirectoryAdapter},
};

pub mod builder;

pub use builder::{NoStorage, TesseraBuilder, TesseraBuilderError, WithStorage};

/// Re-export core types from tessera_core
///
/// These types are commonly used when working with the Tessera API.
pub use tessera_core::{
    Decision, DispatchRecord, DispatchStatus, IssueOutcome, JwtAlgorithm, JwtClaims, JwtConfig,
    OtpConfig, Principal, PrincipalId, RateLimitConfig, Session, SessionConfig,
};

#[cfg(feature = "sqlite")]
pub use tessera_storage_sqlite::SqliteRepositoryProvider;

#[cfg(feature = "mailer")]
pub use tessera_core::services::MailerDispatcher;
#[cfg(feature = "mailer")]
pub use tessera_mailer::MailerConfig;

/// How often the cleanup task sweeps expired codes unless configured otherwise.
pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

/// Errors that can occur when using Tessera.
#[derive(Debug, thiserror::Error)]
pub enum TesseraError {
    /// The supplied code was not accepted
    #[error("Verification failed: {0}")]
    Verification(VerificationError),
    /// The input was malformed
    #[error("Validation error: {0}")]
    Validation(String),
    /// A session could not be issued or the token did not verify
    #[error("Auth error: {0}")]
    AuthError(String),
    /// Error when interacting with storage
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<tessera_core::Error> for TesseraError {
    fn from(error: tessera_core::Error) -> Self {
        use tessera_core::Error;

        match error {
            Error::Verification(e) => TesseraError::Verification(e),
            Error::Validation(e) => TesseraError::Validation(e.to_string()),
            Error::Session(e) => TesseraError::AuthError(e.to_string()),
            Error::Crypto(e) => TesseraError::AuthError(e.to_string()),
            Error::Storage(e) => TesseraError::StorageError(e.to_string()),
            Error::Dispatch(e) => TesseraError::StorageError(e.to_string()),
        }
    }
}

type Codes<R> = CodeRepositoryAdapter<R>;
type Principals<R> = PrincipalDirectoryAdapter<R>;
type Audit<R> = AuditSinkAdapter<R>;

/// Wires the code lifecycle, sessions and rate limiting over one storage backend.
///
/// Every method takes `&self`; share a `Tessera` between request handlers behind an
/// `Arc`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tessera::{JwtConfig, SessionConfig, SqliteRepositoryProvider, Tessera};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let repositories = Arc::new(SqliteRepositoryProvider::connect("sqlite::memory:").await?);
///     let session_config = SessionConfig::new(JwtConfig::new_hs256(b"secret".to_vec()));
///
///     let tessera = Tessera::new(repositories, session_config);
///     tessera.migrate().await?;
///     Ok(())
/// }
/// ```
pub struct Tessera<R: RepositoryProvider> {
    repositories: Arc<R>,
    codes: Arc<Codes<R>>,
    audit: Arc<Audit<R>>,
    issuer: Arc<OtpIssuer<Codes<R>, Principals<R>, Audit<R>>>,
    verifier: Arc<OtpVerifier<Codes<R>, Principals<R>, JwtSessionIssuer>>,
    sessions: Arc<JwtSessionIssuer>,
    dispatch: Arc<DispatchService<Audit<R>>>,
    rate_limiter: Arc<RequestRateLimiter>,
    sweep_interval: std::time::Duration,
}

impl<R: RepositoryProvider> Tessera<R> {
    /// Create a Tessera instance with default limits and delivery disabled.
    ///
    /// Codes are written to the log by [`LogDispatcher`]. Use [`TesseraBuilder`] to
    /// configure limits or a real dispatcher.
    pub fn new(repositories: Arc<R>, session_config: SessionConfig) -> Self {
        Self::from_parts(
            repositories,
            session_config,
            OtpConfig::default(),
            RateLimitConfig::default(),
            Arc::new(LogDispatcher),
            DEFAULT_SWEEP_INTERVAL,
        )
    }

    pub(crate) fn from_parts(
        repositories: Arc<R>,
        session_config: SessionConfig,
        otp_config: OtpConfig,
        rate_limit_config: RateLimitConfig,
        dispatcher: Arc<dyn Dispatcher>,
        sweep_interval: std::time::Duration,
    ) -> Self {
        let codes = Arc::new(CodeRepositoryAdapter::new(repositories.clone()));
        let principals = Arc::new(PrincipalDirectoryAdapter::new(repositories.clone()));
        let audit = Arc::new(AuditSinkAdapter::new(repositories.clone()));

        let sessions = Arc::new(JwtSessionIssuer::new(session_config));
        let dispatch = Arc::new(DispatchService::new(dispatcher, audit.clone()));

        let issuer = Arc::new(OtpIssuer::new(
            codes.clone(),
            principals.clone(),
            dispatch.clone(),
            otp_config.clone(),
        ));
        let verifier = Arc::new(OtpVerifier::new(
            codes.clone(),
            principals,
            sessions.clone(),
            otp_config,
        ));

        Self {
            repositories,
            codes,
            audit,
            issuer,
            verifier,
            sessions,
            dispatch,
            rate_limiter: Arc::new(RequestRateLimiter::new(rate_limit_config)),
            sweep_interval,
        }
    }

    /// Access the underlying repository provider.
    pub fn repositories(&self) -> &Arc<R> {
        &self.repositories
    }

    pub fn otp_config(&self) -> &OtpConfig {
        self.issuer.config()
    }

    pub fn rate_limit_config(&self) -> &RateLimitConfig {
        self.rate_limiter.config()
    }

    /// The shared rate limiter, for middleware that gates traffic itself.
    pub fn rate_limiter(&self) -> &Arc<RequestRateLimiter> {
        &self.rate_limiter
    }

    /// Run migrations for the storage backend.
    pub async fn migrate(&self) -> Result<(), TesseraError> {
        self.repositories.migrate().await.map_err(|e| {
            tracing::error!(error = %e, "Migration failed");
            TesseraError::StorageError(e.to_string())
        })?;
        tracing::info!("Storage migrations applied");
        Ok(())
    }

    /// Check that the storage backend is reachable.
    pub async fn health_check(&self) -> Result<(), TesseraError> {
        self.repositories
            .health_check()
            .await
            .map_err(|e| TesseraError::StorageError(e.to_string()))
    }
}

impl<R: RepositoryProvider> Tessera<R> {
    /// Request a verification code for an identity.
    ///
    /// Returns the same way whether a code was sent, the identity is unknown, the
    /// identity has hit its hourly ceiling, or storage failed.
    pub async fn request_code(&self, identity: &str) {
        self.issuer.request_code(identity).await
    }

    /// Check a code and issue a session for its identity.
    ///
    /// # Errors
    ///
    /// [`TesseraError::Verification`] with the reason the code was refused, or
    /// [`TesseraError::StorageError`] when the store could not be reached.
    pub async fn verify_code(&self, identity: &str, code: &str) -> Result<Session, TesseraError> {
        self.verify_code_at(identity, code, Utc::now()).await
    }

    /// Like [`Tessera::verify_code`], judging expiry against `now`.
    pub async fn verify_code_at(
        &self,
        identity: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, TesseraError> {
        Ok(self.verifier.verify_code_at(identity, code, now).await?)
    }

    /// Verify a session token issued by [`Tessera::verify_code`].
    pub async fn verify_session(&self, token: &str) -> Result<Session, TesseraError> {
        Ok(self.sessions.verify(token).await?)
    }

    /// Count a request from `client` against its rate limits.
    pub fn admit(&self, client: &str) -> Decision {
        self.rate_limiter.admit(client)
    }

    /// Send a plain-text notice. Delivery failures are audited, never returned.
    pub async fn send_notice(&self, identity: &str, subject: &str, body: &str) -> DispatchStatus {
        self.dispatch.send_notice(identity, subject, body).await
    }

    /// Audit log entries for a recipient, newest first.
    pub async fn dispatch_history(
        &self,
        recipient: &str,
    ) -> Result<Vec<DispatchRecord>, TesseraError> {
        use tessera_core::AuditSink;

        Ok(self.audit.find_by_recipient(recipient).await?)
    }

    /// Delete every expired code now.
    ///
    /// # Returns
    ///
    /// The number of codes deleted.
    pub async fn sweep_expired(&self) -> Result<u64, TesseraError> {
        let deleted = self.sweeper().sweep().await?;
        tracing::debug!(deleted, "Swept expired verification codes");
        Ok(deleted)
    }

    /// Start deleting expired codes and idle rate-limit counters in the background.
    ///
    /// The task stops once `shutdown` changes or its sender is dropped.
    pub fn start_cleanup_task(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tracing::info!(interval = ?self.sweep_interval, "Starting cleanup task");
        self.sweeper()
            .with_rate_limiter(self.rate_limiter.clone())
            .start(shutdown)
    }

    fn sweeper(&self) -> CodeSweeper<Codes<R>> {
        CodeSweeper::new(self.codes.clone(), self.sweep_interval)
    }
}
