use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    CodeId, Error, NewVerificationCode, Principal, VerificationCode,
    audit::{DispatchRecord, NewDispatchRecord},
    repositories::{AuditSink, CodeRepository, PrincipalDirectory, RepositoryProvider},
};

/// Adapter that wraps a RepositoryProvider and implements [`CodeRepository`]
pub struct CodeRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> CodeRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> CodeRepository for CodeRepositoryAdapter<R> {
    async fn insert(&self, code: NewVerificationCode) -> Result<VerificationCode, Error> {
        self.provider.code().insert(code).await
    }

    async fn find_active(&self, identity: &str) -> Result<Option<VerificationCode>, Error> {
        self.provider.code().find_active(identity).await
    }

    async fn mark_used(&self, id: &CodeId) -> Result<bool, Error> {
        self.provider.code().mark_used(id).await
    }

    async fn increment_attempts(&self, id: &CodeId) -> Result<Option<u32>, Error> {
        self.provider.code().increment_attempts(id).await
    }

    async fn invalidate_active(&self, identity: &str) -> Result<u64, Error> {
        self.provider.code().invalidate_active(identity).await
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        self.provider.code().delete_expired().await
    }

    async fn count_recent(&self, identity: &str, since: DateTime<Utc>) -> Result<u32, Error> {
        self.provider.code().count_recent(identity, since).await
    }
}

pub struct PrincipalDirectoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> PrincipalDirectoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> PrincipalDirectory for PrincipalDirectoryAdapter<R> {
    async fn exists(&self, identity: &str) -> Result<bool, Error> {
        self.provider.principal().exists(identity).await
    }

    async fn resolve_or_create(&self, identity: &str) -> Result<Principal, Error> {
        self.provider.principal().resolve_or_create(identity).await
    }

    async fn find_by_identity(&self, identity: &str) -> Result<Option<Principal>, Error> {
        self.provider.principal().find_by_identity(identity).await
    }
}

pub struct AuditSinkAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AuditSinkAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AuditSink for AuditSinkAdapter<R> {
    async fn record(&self, record: NewDispatchRecord) -> Result<DispatchRecord, Error> {
        self.provider.audit().record(record).await
    }

    async fn find_by_recipient(&self, recipient: &str) -> Result<Vec<DispatchRecord>, Error> {
        self.provider.audit().find_by_recipient(recipient).await
    }
}
