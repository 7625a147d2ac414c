use async_trait::async_trait;
use chrono::DateTime;
use sqlx::SqlitePool;
use tessera_core::{
    DispatchRecord, Error, NewDispatchRecord, error::StorageError, repositories::AuditSink,
};

/// SQLite-backed dispatch audit log.
pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteDispatchRecord {
    id: i64,
    recipient: String,
    kind: String,
    subject: String,
    status: String,
    error_message: Option<String>,
    sent_at: i64,
}

impl TryFrom<SqliteDispatchRecord> for DispatchRecord {
    type Error = StorageError;

    fn try_from(row: SqliteDispatchRecord) -> Result<Self, Self::Error> {
        Ok(DispatchRecord {
            id: row.id,
            recipient: row.recipient,
            kind: row
                .kind
                .parse()
                .map_err(|e| StorageError::Database(format!("{e}")))?,
            subject: row.subject,
            status: row
                .status
                .parse()
                .map_err(|e| StorageError::Database(format!("{e}")))?,
            error_message: row.error_message,
            sent_at: DateTime::from_timestamp(row.sent_at, 0)
                .ok_or_else(|| StorageError::Database("Invalid timestamp".to_string()))?,
        })
    }
}

#[async_trait]
impl AuditSink for SqliteAuditRepository {
    async fn record(&self, record: NewDispatchRecord) -> Result<DispatchRecord, Error> {
        let row = sqlx::query_as::<_, SqliteDispatchRecord>(
            r#"
            INSERT INTO dispatch_log (recipient, kind, subject, status, error_message, sent_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, recipient, kind, subject, status, error_message, sent_at
            "#,
        )
        .bind(&record.recipient)
        .bind(record.kind.as_str())
        .bind(&record.subject)
        .bind(record.status.as_str())
        .bind(&record.error_message)
        .bind(record.sent_at.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record dispatch");
            StorageError::Database("Failed to record dispatch".to_string())
        })?;

        Ok(row.try_into()?)
    }

    async fn find_by_recipient(&self, recipient: &str) -> Result<Vec<DispatchRecord>, Error> {
        let rows = sqlx::query_as::<_, SqliteDispatchRecord>(
            r#"
            SELECT id, recipient, kind, subject, status, error_message, sent_at
            FROM dispatch_log
            WHERE recipient = ?
            ORDER BY sent_at DESC, id DESC
            "#,
        )
        .bind(recipient)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load dispatch records");
            StorageError::Database("Failed to load dispatch records".to_string())
        })?;

        Ok(rows
            .into_iter()
            .map(DispatchRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_test_db;
    use chrono::Utc;
    use tessera_core::{DispatchKind, DispatchStatus};

    fn record(recipient: &str, status: DispatchStatus) -> NewDispatchRecord {
        NewDispatchRecord {
            recipient: recipient.to_string(),
            kind: DispatchKind::VerificationCode,
            subject: "Your verification code".to_string(),
            status,
            error_message: (status == DispatchStatus::Failed).then(|| "refused".to_string()),
            sent_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_and_find() {
        let repo = SqliteAuditRepository::new(setup_test_db().await);

        repo.record(record("a@example.com", DispatchStatus::Sent))
            .await
            .unwrap();
        repo.record(record("a@example.com", DispatchStatus::Failed))
            .await
            .unwrap();
        repo.record(record("b@example.com", DispatchStatus::Disabled))
            .await
            .unwrap();

        let records = repo.find_by_recipient("a@example.com").await.unwrap();
        assert_eq!(records.len(), 2);
        // Newest first
        assert_eq!(records[0].status, DispatchStatus::Failed);
        assert_eq!(records[0].error_message.as_deref(), Some("refused"));
        assert_eq!(records[1].status, DispatchStatus::Sent);
        assert_eq!(records[1].kind, DispatchKind::VerificationCode);
    }
}
