use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::message::build_message;
use crate::{Email, Mailer, MailerError, SmtpSettings, TlsType};

/// Delivers mail through an SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    relay: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Prepare a relay connection. Nothing is dialled until the first send.
    pub fn connect(settings: &SmtpSettings) -> Result<Self, MailerError> {
        let host = settings.host.as_str();
        let mut relay = match settings.tls {
            TlsType::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
            TlsType::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
            TlsType::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
        };

        if let Some(port) = settings.port {
            relay = relay.port(port);
        }
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            relay = relay.credentials(Credentials::new(username.clone(), password.clone()));
        }

        tracing::debug!(host, tls = ?settings.tls, "Configured SMTP relay");
        Ok(Self {
            relay: relay.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpTransport {
    async fn send_email(&self, email: Email) -> Result<(), MailerError> {
        let message = build_message(email)?;
        self.relay.send(message).await?;
        Ok(())
    }
}
