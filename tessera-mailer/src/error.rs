use thiserror::Error;

/// Why an email could not be built or delivered.
#[derive(Error, Debug)]
pub enum MailerError {
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Writing email file failed: {0}")]
    File(#[from] lettre::transport::file::Error),

    #[error("Invalid mailbox: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Could not assemble message: {0}")]
    Message(#[from] lettre::error::Error),

    /// A required field of an [`crate::Email`] was missing.
    #[error("Incomplete email: {0}")]
    Builder(String),

    /// A `MAILER_*` setting could not be used.
    #[error("Mailer misconfigured: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MailerError>;
