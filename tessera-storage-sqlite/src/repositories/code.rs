//! SQLite implementation of the verification code repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tessera_core::{
    CodeId, Error, NewVerificationCode, VerificationCode, error::StorageError,
    repositories::CodeRepository,
};

pub struct SqliteCodeRepository {
    pool: SqlitePool,
}

impl SqliteCodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteVerificationCode {
    id: String,
    identity: String,
    code_hash: String,
    created_at: i64,
    expires_at: i64,
    attempts: i64,
    used: bool,
}

impl TryFrom<SqliteVerificationCode> for VerificationCode {
    type Error = StorageError;

    fn try_from(row: SqliteVerificationCode) -> Result<Self, Self::Error> {
        Ok(VerificationCode {
            id: CodeId::new(&row.id),
            identity: row.identity,
            code_hash: row.code_hash,
            created_at: timestamp(row.created_at)?,
            expires_at: timestamp(row.expires_at)?,
            attempts: u32::try_from(row.attempts)
                .map_err(|_| StorageError::Database("Invalid attempt count".to_string()))?,
            used: row.used,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StorageError::Database(format!("Invalid timestamp: {secs}")))
}

#[async_trait]
impl CodeRepository for SqliteCodeRepository {
    async fn insert(&self, code: NewVerificationCode) -> Result<VerificationCode, Error> {
        let row = sqlx::query_as::<_, SqliteVerificationCode>(
            r#"
            INSERT INTO verification_codes (id, identity, code_hash, created_at, expires_at, attempts, used)
            VALUES (?, ?, ?, ?, ?, 0, 0)
            RETURNING id, identity, code_hash, created_at, expires_at, attempts, used
            "#,
        )
        .bind(code.id.as_str())
        .bind(&code.identity)
        .bind(&code.code_hash)
        .bind(code.created_at.timestamp())
        .bind(code.expires_at.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to insert verification code");
            StorageError::Database("Failed to insert verification code".to_string())
        })?;

        Ok(row.try_into()?)
    }

    async fn find_active(&self, identity: &str) -> Result<Option<VerificationCode>, Error> {
        let row = sqlx::query_as::<_, SqliteVerificationCode>(
            r#"
            SELECT id, identity, code_hash, created_at, expires_at, attempts, used
            FROM verification_codes
            WHERE identity = ? AND used = 0 AND expires_at > ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(identity)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to find active verification code");
            StorageError::Database("Failed to find active verification code".to_string())
        })?;

        Ok(row.map(VerificationCode::try_from).transpose()?)
    }

    async fn mark_used(&self, id: &CodeId) -> Result<bool, Error> {
        let result =
            sqlx::query("UPDATE verification_codes SET used = 1 WHERE id = ? AND used = 0")
                .bind(id.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to mark verification code used");
                    StorageError::Database("Failed to mark verification code used".to_string())
                })?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_attempts(&self, id: &CodeId) -> Result<Option<u32>, Error> {
        let attempts: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE verification_codes SET attempts = attempts + 1
            WHERE id = ? AND used = 0
            RETURNING attempts
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to increment verification attempts");
            StorageError::Database("Failed to increment verification attempts".to_string())
        })?;

        match attempts {
            Some(n) => Ok(Some(u32::try_from(n).map_err(|_| {
                StorageError::Database("Invalid attempt count".to_string())
            })?)),
            None => Ok(None),
        }
    }

    async fn invalidate_active(&self, identity: &str) -> Result<u64, Error> {
        let result =
            sqlx::query("UPDATE verification_codes SET used = 1 WHERE identity = ? AND used = 0")
                .bind(identity)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to invalidate verification codes");
                    StorageError::Database("Failed to invalidate verification codes".to_string())
                })?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM verification_codes WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete expired verification codes");
                StorageError::Database("Failed to delete expired verification codes".to_string())
            })?;

        Ok(result.rows_affected())
    }

    async fn count_recent(&self, identity: &str, since: DateTime<Utc>) -> Result<u32, Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM verification_codes WHERE identity = ? AND created_at >= ?",
        )
        .bind(identity)
        .bind(since.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count recent verification codes");
            StorageError::Database("Failed to count recent verification codes".to_string())
        })?;

        Ok(count as u32)
    }
}
