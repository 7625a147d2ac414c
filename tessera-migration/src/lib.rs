//! Schema migrations for tessera storage backends
//!
//! A backend lists its [`Migration`]s in version order and hands them to a
//! [`MigrationManager`], which records applied versions in its own table and runs
//! each pending migration in a transaction.
use async_trait::async_trait;
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Duplicate migration version {0}")]
    DuplicateVersion(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    /// Execute the migration
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Rollback the migration
    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Unique version number for ordering migrations
    fn version(&self) -> i64;

    /// Human readable name of the migration
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix timestamp
    pub applied_at: i64,
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_tessera_migrations"
    }

    /// Initialize migration tracking table
    async fn initialize(&self) -> Result<()>;

    /// Apply pending migrations, lowest version first
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Roll back applied migrations, highest version first
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Get list of applied migrations
    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    /// Check if specific migration was applied
    async fn is_applied(&self, version: i64) -> Result<bool>;
}

/// Migrations not yet recorded as applied, sorted by version.
///
/// # Errors
///
/// Returns [`MigrationError::DuplicateVersion`] if two migrations share a version.
pub fn pending<'a, DB: Database>(
    migrations: &'a [Box<dyn Migration<DB>>],
    applied: &[MigrationRecord],
) -> Result<Vec<&'a dyn Migration<DB>>> {
    let mut sorted: Vec<&dyn Migration<DB>> = migrations.iter().map(|m| m.as_ref()).collect();
    sorted.sort_by_key(|m| m.version());

    if let Some(pair) = sorted.windows(2).find(|w| w[0].version() == w[1].version()) {
        return Err(MigrationError::DuplicateVersion(pair[0].version()));
    }

    let pending: Vec<_> = sorted
        .into_iter()
        .filter(|m| !applied.iter().any(|r| r.version == m.version()))
        .collect();
    tracing::debug!(
        applied = applied.len(),
        pending = pending.len(),
        "Resolved pending migrations"
    );
    Ok(pending)
}
