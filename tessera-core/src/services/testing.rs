//! In-memory collaborators shared by the service tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    CodeId, Error, NewVerificationCode, Principal, PrincipalId, VerificationCode,
    audit::{DispatchRecord, DispatchStatus, NewDispatchRecord},
    error::{DispatchError, StorageError},
    repositories::{AuditSink, CodeRepository, PrincipalDirectory},
};

use super::Dispatcher;

#[derive(Default)]
pub(crate) struct MockCodeRepository {
    codes: Mutex<Vec<VerificationCode>>,
    fail: AtomicBool,
    consume_after_lookup: Mutex<Option<CodeId>>,
}

impl MockCodeRepository {
    pub(crate) fn codes(&self) -> Vec<VerificationCode> {
        self.codes.lock().unwrap().clone()
    }

    pub(crate) fn codes_for(&self, identity: &str) -> Vec<VerificationCode> {
        self.codes()
            .into_iter()
            .filter(|c| c.identity == identity)
            .collect()
    }

    /// Make every subsequent call fail with a storage error.
    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Mark `id` used right after the next `find_active` returns it, as a
    /// competing verifier would.
    pub(crate) fn consume_on_next_lookup(&self, id: CodeId) {
        *self.consume_after_lookup.lock().unwrap() = Some(id);
    }

    pub(crate) fn push(&self, code: VerificationCode) {
        self.codes.lock().unwrap().push(code);
    }

    fn check(&self) -> Result<(), Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Database("mock failure".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl CodeRepository for MockCodeRepository {
    async fn insert(&self, code: NewVerificationCode) -> Result<VerificationCode, Error> {
        self.check()?;
        let record = code.into_record();
        self.codes.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_active(&self, identity: &str) -> Result<Option<VerificationCode>, Error> {
        self.check()?;
        let now = Utc::now();
        let mut codes = self.codes.lock().unwrap();
        // Later pushes win ties, like insertion order in a table
        let found = codes
            .iter()
            .enumerate()
            .filter(|(_, c)| c.identity == identity && c.is_active_at(now))
            .max_by_key(|(i, c)| (c.created_at, *i))
            .map(|(_, c)| c.clone());

        let consume = self.consume_after_lookup.lock().unwrap().take();
        if let Some(id) = consume {
            if let Some(code) = codes.iter_mut().find(|c| c.id == id) {
                code.used = true;
            }
        }
        Ok(found)
    }

    async fn mark_used(&self, id: &CodeId) -> Result<bool, Error> {
        self.check()?;
        let mut codes = self.codes.lock().unwrap();
        match codes.iter_mut().find(|c| &c.id == id && !c.used) {
            Some(code) => {
                code.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_attempts(&self, id: &CodeId) -> Result<Option<u32>, Error> {
        self.check()?;
        let mut codes = self.codes.lock().unwrap();
        Ok(codes
            .iter_mut()
            .find(|c| &c.id == id && !c.used)
            .map(|code| {
                code.attempts += 1;
                code.attempts
            }))
    }

    async fn invalidate_active(&self, identity: &str) -> Result<u64, Error> {
        self.check()?;
        let mut codes = self.codes.lock().unwrap();
        let mut count = 0;
        for code in codes.iter_mut().filter(|c| c.identity == identity && !c.used) {
            code.used = true;
            count += 1;
        }
        Ok(count)
    }

    async fn delete_expired(&self) -> Result<u64, Error> {
        self.check()?;
        let now = Utc::now();
        let mut codes = self.codes.lock().unwrap();
        let before = codes.len();
        codes.retain(|c| !c.is_expired_at(now));
        Ok((before - codes.len()) as u64)
    }

    async fn count_recent(&self, identity: &str, since: DateTime<Utc>) -> Result<u32, Error> {
        self.check()?;
        let codes = self.codes.lock().unwrap();
        Ok(codes
            .iter()
            .filter(|c| c.identity == identity && c.created_at >= since)
            .count() as u32)
    }
}

#[derive(Default)]
pub(crate) struct MockPrincipalDirectory {
    principals: Mutex<Vec<Principal>>,
}

impl MockPrincipalDirectory {
    pub(crate) fn with_identity(identity: &str) -> Self {
        let directory = Self::default();
        directory.principals.lock().unwrap().push(Principal {
            id: PrincipalId::new_random().unwrap(),
            identity: identity.to_string(),
            created_at: Utc::now(),
        });
        directory
    }
}

#[async_trait]
impl PrincipalDirectory for MockPrincipalDirectory {
    async fn exists(&self, identity: &str) -> Result<bool, Error> {
        Ok(self.find_by_identity(identity).await?.is_some())
    }

    async fn resolve_or_create(&self, identity: &str) -> Result<Principal, Error> {
        let mut principals = self.principals.lock().unwrap();
        if let Some(principal) = principals.iter().find(|p| p.identity == identity) {
            return Ok(principal.clone());
        }
        let principal = Principal {
            id: PrincipalId::new_random()?,
            identity: identity.to_string(),
            created_at: Utc::now(),
        };
        principals.push(principal.clone());
        Ok(principal)
    }

    async fn find_by_identity(&self, identity: &str) -> Result<Option<Principal>, Error> {
        let principals = self.principals.lock().unwrap();
        Ok(principals.iter().find(|p| p.identity == identity).cloned())
    }
}

#[derive(Default)]
pub(crate) struct MockAuditSink {
    records: Mutex<Vec<DispatchRecord>>,
    fail: bool,
}

impl MockAuditSink {
    pub(crate) fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn records(&self) -> Vec<DispatchRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MockAuditSink {
    async fn record(&self, record: NewDispatchRecord) -> Result<DispatchRecord, Error> {
        if self.fail {
            return Err(StorageError::Database("mock failure".to_string()).into());
        }
        let mut records = self.records.lock().unwrap();
        let record = DispatchRecord {
            id: records.len() as i64 + 1,
            recipient: record.recipient,
            kind: record.kind,
            subject: record.subject,
            status: record.status,
            error_message: record.error_message,
            sent_at: record.sent_at,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_recipient(&self, recipient: &str) -> Result<Vec<DispatchRecord>, Error> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.recipient == recipient)
            .cloned()
            .collect())
    }
}

/// Captures everything it is asked to send.
#[derive(Default)]
pub(crate) struct RecordingDispatcher {
    codes: Mutex<Vec<(String, String)>>,
    notices: Mutex<Vec<(String, String)>>,
}

impl RecordingDispatcher {
    /// The most recent plaintext code sent to `identity`.
    pub(crate) fn last_code(&self, identity: &str) -> Option<String> {
        self.codes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == identity)
            .map(|(_, code)| code.clone())
    }

    pub(crate) fn sent_codes(&self) -> usize {
        self.codes.lock().unwrap().len()
    }

    pub(crate) fn notices(&self) -> Vec<(String, String)> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn send_code(
        &self,
        identity: &str,
        code: &str,
        _ttl_minutes: i64,
    ) -> Result<DispatchStatus, Error> {
        self.codes
            .lock()
            .unwrap()
            .push((identity.to_string(), code.to_string()));
        Ok(DispatchStatus::Sent)
    }

    async fn send_notice(
        &self,
        identity: &str,
        subject: &str,
        _body: &str,
    ) -> Result<DispatchStatus, Error> {
        self.notices
            .lock()
            .unwrap()
            .push((identity.to_string(), subject.to_string()));
        Ok(DispatchStatus::Sent)
    }
}

pub(crate) struct FailingDispatcher;

#[async_trait]
impl Dispatcher for FailingDispatcher {
    async fn send_code(&self, _: &str, _: &str, _: i64) -> Result<DispatchStatus, Error> {
        Err(DispatchError::Transport("connection refused".to_string()).into())
    }

    async fn send_notice(&self, _: &str, _: &str, _: &str) -> Result<DispatchStatus, Error> {
        Err(DispatchError::Transport("connection refused".to_string()).into())
    }
}
