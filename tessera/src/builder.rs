//! Builder pattern for constructing Tessera instances
//!
//! The builder refuses to produce a [`Tessera`] until storage is configured, and
//! reports a missing session signing key when [`TesseraBuilder::build`] runs.
//!
//! # Example
//!
//! ```rust,no_run
//! use tessera::{JwtConfig, OtpConfig, SessionConfig, TesseraBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tessera = TesseraBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .with_session_config(SessionConfig::new(JwtConfig::new_hs256(b"secret".to_vec())))
//!         .with_otp_config(OtpConfig::default().with_max_attempts(3))
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tessera_core::{
    Dispatcher, LogDispatcher, OtpConfig, RateLimitConfig, RepositoryProvider, SessionConfig,
};

use crate::{DEFAULT_SWEEP_INTERVAL, Tessera};

/// Errors that can occur when building a Tessera instance.
#[derive(Debug, thiserror::Error)]
pub enum TesseraBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Failed to configure mailer
    #[cfg(feature = "mailer")]
    #[error("Mailer configuration failed: {0}")]
    MailerConfiguration(String),
}

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// A type-safe builder for constructing [`Tessera`] instances.
///
/// # Type States
///
/// - [`NoStorage`]: Initial state, storage must be configured
/// - [`WithStorage<R>`]: Storage configured, ready to build or add more configuration
pub struct TesseraBuilder<Storage> {
    storage: Storage,
    session_config: Option<SessionConfig>,
    otp_config: OtpConfig,
    rate_limit_config: RateLimitConfig,
    dispatcher: Arc<dyn Dispatcher>,
    sweep_interval: std::time::Duration,
    apply_migrations: bool,
}

impl Default for TesseraBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseraBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Codes: 10 minute lifetime, 5 attempts, 3 per identity per hour
    /// - Rate limits: 60 requests per minute, 1000 per hour
    /// - Dispatcher: [`LogDispatcher`] (delivery disabled)
    /// - Apply migrations: false
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            session_config: None,
            otp_config: OtpConfig::default(),
            rate_limit_config: RateLimitConfig::default(),
            dispatcher: Arc::new(LogDispatcher),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            apply_migrations: false,
        }
    }

    /// Use an already constructed storage backend.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> TesseraBuilder<WithStorage<R>> {
        TesseraBuilder {
            storage: WithStorage { repositories },
            session_config: self.session_config,
            otp_config: self.otp_config,
            rate_limit_config: self.rate_limit_config,
            dispatcher: self.dispatcher,
            sweep_interval: self.sweep_interval,
            apply_migrations: self.apply_migrations,
        }
    }
}

#[cfg(feature = "sqlite")]
impl TesseraBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/db.sqlite")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<TesseraBuilder<WithStorage<crate::SqliteRepositoryProvider>>, TesseraBuilderError>
    {
        let repositories = crate::SqliteRepositoryProvider::connect(url)
            .await
            .map_err(|e| TesseraBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(repositories)))
    }
}

impl<R: RepositoryProvider> TesseraBuilder<WithStorage<R>> {
    /// Set how sessions are signed and how long they last. Required.
    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = Some(config);
        self
    }

    pub fn with_otp_config(mut self, config: OtpConfig) -> Self {
        self.otp_config = config;
        self
    }

    pub fn with_rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// Deliver codes and notices through `dispatcher` instead of the log.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Deliver codes and notices by email.
    #[cfg(feature = "mailer")]
    pub fn with_mailer(
        mut self,
        config: crate::MailerConfig,
    ) -> Result<Self, TesseraBuilderError> {
        let dispatcher = crate::MailerDispatcher::new(config)
            .map_err(|e| TesseraBuilderError::MailerConfiguration(e.to_string()))?;
        self.dispatcher = Arc::new(dispatcher);
        Ok(self)
    }

    /// Deliver codes and notices by email, configured from `MAILER_*` variables.
    #[cfg(feature = "mailer")]
    pub fn with_mailer_from_env(mut self) -> Result<Self, TesseraBuilderError> {
        let dispatcher = crate::MailerDispatcher::from_env()
            .map_err(|e| TesseraBuilderError::MailerConfiguration(e.to_string()))?;
        self.dispatcher = Arc::new(dispatcher);
        Ok(self)
    }

    /// How often the cleanup task started by [`Tessera::start_cleanup_task`] runs.
    pub fn with_sweep_interval(mut self, interval: std::time::Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Run storage migrations as part of [`TesseraBuilder::build`].
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    pub async fn build(self) -> Result<Tessera<R>, TesseraBuilderError> {
        let session_config = self.session_config.ok_or_else(|| {
            TesseraBuilderError::InvalidConfiguration(
                "A session configuration is required".to_string(),
            )
        })?;

        if self.otp_config.max_attempts == 0 {
            return Err(TesseraBuilderError::InvalidConfiguration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(TesseraBuilderError::InvalidConfiguration(
                "The sweep interval must be greater than zero".to_string(),
            ));
        }

        if self.apply_migrations {
            self.storage
                .repositories
                .migrate()
                .await
                .map_err(|e| TesseraBuilderError::Migration(e.to_string()))?;
        }

        Ok(Tessera::from_parts(
            self.storage.repositories,
            session_config,
            self.otp_config,
            self.rate_limit_config,
            self.dispatcher,
            self.sweep_interval,
        ))
    }
}
