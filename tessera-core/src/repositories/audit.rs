use async_trait::async_trait;

use crate::{
    Error,
    audit::{DispatchRecord, NewDispatchRecord},
};

/// Append-only log of outbound message attempts.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    /// Append one record and return it with its assigned id.
    async fn record(&self, record: NewDispatchRecord) -> Result<DispatchRecord, Error>;

    /// All records for a recipient, newest first.
    async fn find_by_recipient(&self, recipient: &str) -> Result<Vec<DispatchRecord>, Error>;
}
