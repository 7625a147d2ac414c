//! Outbound email for tessera
//!
//! A [`Mailer`] delivers a plain-text [`Email`]. Two transports are provided: SMTP for
//! production and a file transport that writes `.eml` files for local development.
//! [`MailerConfig::from_env`] picks one from `MAILER_*` environment variables.
pub mod config;
pub mod email;
pub mod error;
pub mod mailer;
mod message;
pub mod transports;

pub use config::{MailerConfig, SmtpSettings, TlsType, TransportConfig};
pub use email::{Email, EmailBuilder};
pub use error::MailerError;
pub use mailer::Mailer;
pub use transports::{FileTransport, SmtpTransport};

pub mod prelude {
    pub use crate::{
        Email, EmailBuilder, FileTransport, Mailer, MailerConfig, MailerError, SmtpTransport,
    };
}
