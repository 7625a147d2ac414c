//! Repository implementations for SQLite storage

pub mod audit;
pub mod code;
pub mod principal;

pub use audit::SqliteAuditRepository;
pub use code::SqliteCodeRepository;
pub use principal::SqlitePrincipalRepository;

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use tessera_core::{
    Error,
    error::StorageError,
    repositories::{
        AuditSinkProvider, CodeRepositoryProvider, PrincipalDirectoryProvider, RepositoryProvider,
    },
};
use tessera_migration::MigrationManager;

use crate::migrations::{self, SqliteMigrationManager};

/// Repository provider implementation for SQLite
///
/// Every repository shares one connection pool.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    code: Arc<SqliteCodeRepository>,
    principal: Arc<SqlitePrincipalRepository>,
    audit: Arc<SqliteAuditRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let code = Arc::new(SqliteCodeRepository::new(pool.clone()));
        let principal = Arc::new(SqlitePrincipalRepository::new(pool.clone()));
        let audit = Arc::new(SqliteAuditRepository::new(pool.clone()));

        Self {
            pool,
            code,
            principal,
            audit,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl CodeRepositoryProvider for SqliteRepositoryProvider {
    type CodeRepo = SqliteCodeRepository;

    fn code(&self) -> &Self::CodeRepo {
        &self.code
    }
}

impl PrincipalDirectoryProvider for SqliteRepositoryProvider {
    type PrincipalRepo = SqlitePrincipalRepository;

    fn principal(&self) -> &Self::PrincipalRepo {
        &self.principal
    }
}

impl AuditSinkProvider for SqliteRepositoryProvider {
    type AuditRepo = SqliteAuditRepository;

    fn audit(&self) -> &Self::AuditRepo {
        &self.audit
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            StorageError::Migration("Failed to initialize migrations".to_string())
        })?;

        manager.up(&migrations::all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            StorageError::Migration("Failed to run migrations".to_string())
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "SQLite health check failed");
                StorageError::Connection("Database unavailable".to_string())
            })?;
        Ok(())
    }
}
