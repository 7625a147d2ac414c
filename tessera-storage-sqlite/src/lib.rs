//! SQLite storage backend for tessera
//!
//! [`SqliteRepositoryProvider`] implements every repository trait from
//! `tessera-core` over a single `sqlx` pool. Timestamps are stored as unix seconds.
//!
//! ```rust,ignore
//! let provider = SqliteRepositoryProvider::connect("sqlite://tessera.db?mode=rwc").await?;
//! provider.migrate().await?;
//! ```
mod migrations;
pub mod repositories;

pub use repositories::{
    SqliteAuditRepository, SqliteCodeRepository, SqlitePrincipalRepository,
    SqliteRepositoryProvider,
};

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tessera_core::{Error, error::StorageError};

impl SqliteRepositoryProvider {
    /// Open a pool for `database_url`, creating the database file if needed.
    ///
    /// In-memory databases get a single connection that is never recycled.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                tracing::error!(error = %e, "Invalid SQLite connection string");
                StorageError::Connection("Invalid SQLite connection string".to_string())
            })?
            .create_if_missing(true);

        let pool_options = if database_url.contains(":memory:") {
            // The database lives and dies with its only connection
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to SQLite");
                StorageError::Connection("Failed to connect to SQLite".to_string())
            })?;

        Ok(Self::new(pool))
    }
}
