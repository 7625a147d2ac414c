use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tessera_core::{
    Error, Principal, PrincipalId, error::StorageError, repositories::PrincipalDirectory,
};

pub struct SqlitePrincipalRepository {
    pool: SqlitePool,
}

impl SqlitePrincipalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqlitePrincipal {
    id: String,
    identity: String,
    created_at: i64,
}

impl From<SqlitePrincipal> for Principal {
    fn from(row: SqlitePrincipal) -> Self {
        Principal {
            id: PrincipalId::new(&row.id),
            identity: row.identity,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_default(),
        }
    }
}

#[async_trait]
impl PrincipalDirectory for SqlitePrincipalRepository {
    async fn exists(&self, identity: &str) -> Result<bool, Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM principals WHERE identity = ?)")
                .bind(identity)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to check principal");
                    StorageError::Database("Failed to check principal".to_string())
                })?;

        Ok(exists)
    }

    async fn resolve_or_create(&self, identity: &str) -> Result<Principal, Error> {
        // A concurrent insert for the same identity loses quietly and both read the winner
        sqlx::query(
            "INSERT INTO principals (id, identity, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(identity) DO NOTHING",
        )
        .bind(PrincipalId::new_random()?.as_str())
        .bind(identity)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create principal");
            StorageError::Database("Failed to create principal".to_string())
        })?;

        self.find_by_identity(identity)
            .await?
            .ok_or_else(|| StorageError::NotFound.into())
    }

    async fn find_by_identity(&self, identity: &str) -> Result<Option<Principal>, Error> {
        let row = sqlx::query_as::<_, SqlitePrincipal>(
            "SELECT id, identity, created_at FROM principals WHERE identity = ?",
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to find principal");
            StorageError::Database("Failed to find principal".to_string())
        })?;

        Ok(row.map(Principal::from))
    }
}
