use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Outcomes of checking a supplied code against the active code of an identity.
///
/// Everything except [`VerificationError::TooManyAttempts`] is presented to callers as
/// a plain "unauthorized".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    #[error("No active verification code")]
    NotFound,

    #[error("Verification code expired")]
    Expired,

    #[error("Too many verification attempts")]
    TooManyAttempts,

    #[error("Invalid verification code")]
    InvalidCode,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("JWT signing failed: {0}")]
    JwtSigning(String),

    #[error("Code hashing failed: {0}")]
    Hash(String),

    #[error("Random source unavailable: {0}")]
    Random(String),
}

/// Failures of an outbound message transport.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Message error: {0}")]
    Message(String),
}

impl Error {
    pub fn is_verification_error(&self) -> bool {
        matches!(self, Error::Verification(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// The verification failure behind this error, if any.
    pub fn verification(&self) -> Option<VerificationError> {
        match self {
            Error::Verification(e) => Some(*e),
            _ => None,
        }
    }
}
