//! Outbound delivery of verification codes and notices.
//!
//! Delivery never fails the caller. A [`Dispatcher`] reports how the attempt went,
//! [`DispatchService`] turns that into a [`DispatchStatus`], logs it and appends one
//! record to the audit log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    Error,
    audit::{DispatchKind, DispatchStatus, NewDispatchRecord},
    repositories::AuditSink,
};

/// Subject used for verification code messages.
pub const VERIFICATION_SUBJECT: &str = "Your verification code";

/// A transport for outbound messages.
///
/// Implementations return `Ok(DispatchStatus::Sent)` when the message left the
/// process, `Ok(DispatchStatus::Disabled)` when delivery is switched off, and an
/// error when the transport failed.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    async fn send_code(
        &self,
        identity: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<DispatchStatus, Error>;

    async fn send_notice(
        &self,
        identity: &str,
        subject: &str,
        body: &str,
    ) -> Result<DispatchStatus, Error>;
}

/// Dispatcher used when email delivery is disabled.
///
/// Codes are written to the log at `info` so a developer can complete the flow
/// locally. Never use it where logs are shipped off the machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn send_code(
        &self,
        identity: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<DispatchStatus, Error> {
        tracing::info!(
            identity,
            code,
            ttl_minutes,
            "Email delivery disabled; verification code not sent"
        );
        Ok(DispatchStatus::Disabled)
    }

    async fn send_notice(
        &self,
        identity: &str,
        subject: &str,
        _body: &str,
    ) -> Result<DispatchStatus, Error> {
        tracing::info!(identity, subject, "Email delivery disabled; notice not sent");
        Ok(DispatchStatus::Disabled)
    }
}

/// Delivers messages and keeps the audit log.
pub struct DispatchService<A: AuditSink> {
    dispatcher: Arc<dyn Dispatcher>,
    audit: Arc<A>,
}

impl<A: AuditSink> DispatchService<A> {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, audit: Arc<A>) -> Self {
        Self { dispatcher, audit }
    }

    /// Send a verification code. Never fails; the outcome is logged and audited.
    pub async fn send_code(&self, identity: &str, code: &str, ttl_minutes: i64) -> DispatchStatus {
        let result = self.dispatcher.send_code(identity, code, ttl_minutes).await;
        self.settle(identity, DispatchKind::VerificationCode, VERIFICATION_SUBJECT, result)
            .await
    }

    /// Send a plain-text notice. Never fails; the outcome is logged and audited.
    pub async fn send_notice(&self, identity: &str, subject: &str, body: &str) -> DispatchStatus {
        let result = self.dispatcher.send_notice(identity, subject, body).await;
        self.settle(identity, DispatchKind::Notice, subject, result)
            .await
    }

    async fn settle(
        &self,
        recipient: &str,
        kind: DispatchKind,
        subject: &str,
        result: Result<DispatchStatus, Error>,
    ) -> DispatchStatus {
        let (status, error_message) = match result {
            Ok(status) => (status, None),
            Err(e) => (DispatchStatus::Failed, Some(e.to_string())),
        };

        match status {
            DispatchStatus::Sent => {
                tracing::info!(%kind, "Message dispatched");
                tracing::debug!(recipient, %kind, "Message dispatched to recipient");
            }
            DispatchStatus::Disabled => {
                tracing::debug!(recipient, %kind, "Message dispatch disabled");
            }
            DispatchStatus::Failed => {
                tracing::error!(
                    recipient,
                    %kind,
                    error = error_message.as_deref().unwrap_or_default(),
                    "Failed to dispatch message"
                );
            }
        }

        let record = NewDispatchRecord {
            recipient: recipient.to_string(),
            kind,
            subject: subject.to_string(),
            status,
            error_message,
            sent_at: Utc::now(),
        };
        if let Err(e) = self.audit.record(record).await {
            tracing::error!(error = %e, recipient, "Failed to record dispatch audit entry");
        }

        status
    }
}

#[cfg(feature = "mailer")]
pub use self::mailer_impl::MailerDispatcher;

#[cfg(feature = "mailer")]
mod mailer_impl {
    use async_trait::async_trait;
    use tessera_mailer::prelude::*;

    use super::{DispatchStatus, Dispatcher, VERIFICATION_SUBJECT};
    use crate::{Error, error::DispatchError};

    /// Dispatcher backed by a `tessera-mailer` transport.
    pub struct MailerDispatcher {
        transport: Box<dyn Mailer>,
        config: MailerConfig,
    }

    impl MailerDispatcher {
        pub fn new(config: MailerConfig) -> Result<Self, Error> {
            let transport = config
                .build_transport()
                .map_err(|e| DispatchError::Transport(e.to_string()))?;
            Ok(Self { transport, config })
        }

        pub fn from_env() -> Result<Self, Error> {
            let config =
                MailerConfig::from_env().map_err(|e| DispatchError::Transport(e.to_string()))?;
            Self::new(config)
        }

        pub fn with_transport(transport: Box<dyn Mailer>, config: MailerConfig) -> Self {
            Self { transport, config }
        }

        async fn deliver(&self, to: &str, subject: &str, body: String) -> Result<(), Error> {
            let email = Email::builder()
                .from(self.config.get_from_address())
                .to(to)
                .subject(subject)
                .text_body(body)
                .build()
                .map_err(|e| DispatchError::Message(e.to_string()))?;

            self.transport
                .send_email(email)
                .await
                .map_err(|e| DispatchError::Transport(e.to_string()))?;
            Ok(())
        }
    }

    #[async_trait]
    impl Dispatcher for MailerDispatcher {
        async fn send_code(
            &self,
            identity: &str,
            code: &str,
            ttl_minutes: i64,
        ) -> Result<DispatchStatus, Error> {
            let body = format!(
                "Your {} verification code is: {code}\n\n\
                 This code expires in {ttl_minutes} minutes.\n\n\
                 If you did not request this code, you can ignore this email.\n",
                self.config.app_name
            );
            self.deliver(identity, VERIFICATION_SUBJECT, body).await?;
            Ok(DispatchStatus::Sent)
        }

        async fn send_notice(
            &self,
            identity: &str,
            subject: &str,
            body: &str,
        ) -> Result<DispatchStatus, Error> {
            self.deliver(identity, subject, body.to_string()).await?;
            Ok(DispatchStatus::Sent)
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{FailingDispatcher, MockAuditSink, RecordingDispatcher};

    #[tokio::test]
    async fn test_log_dispatcher_reports_disabled() {
        let audit = Arc::new(MockAuditSink::default());
        let service = DispatchService::new(Arc::new(LogDispatcher), audit.clone());

        let status = service.send_code("a@example.com", "123456", 10).await;

        assert_eq!(status, DispatchStatus::Disabled);
        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DispatchStatus::Disabled);
        assert_eq!(records[0].kind, DispatchKind::VerificationCode);
        assert_eq!(records[0].subject, VERIFICATION_SUBJECT);
    }

    #[tokio::test]
    async fn test_sent_notice_is_audited() {
        let audit = Arc::new(MockAuditSink::default());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let service = DispatchService::new(dispatcher.clone(), audit.clone());

        let status = service
            .send_notice("a@example.com", "Welcome", "Hello there")
            .await;

        assert_eq!(status, DispatchStatus::Sent);
        assert_eq!(dispatcher.notices().len(), 1);
        let records = audit.records();
        assert_eq!(records[0].kind, DispatchKind::Notice);
        assert_eq!(records[0].subject, "Welcome");
        assert_eq!(records[0].error_message, None);
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed_and_audited() {
        let audit = Arc::new(MockAuditSink::default());
        let service = DispatchService::new(Arc::new(FailingDispatcher), audit.clone());

        let status = service.send_code("a@example.com", "123456", 10).await;

        assert_eq!(status, DispatchStatus::Failed);
        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DispatchStatus::Failed);
        assert!(records[0].error_message.is_some());
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_status() {
        let audit = Arc::new(MockAuditSink::failing());
        let service = DispatchService::new(Arc::new(RecordingDispatcher::default()), audit);

        let status = service.send_code("a@example.com", "123456", 10).await;

        assert_eq!(status, DispatchStatus::Sent);
    }
}
