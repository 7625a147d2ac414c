use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tessera::TesseraError;
use tessera_core::error::VerificationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The code was missing, wrong or expired. Callers cannot tell which.
    #[error("Invalid or expired verification code")]
    InvalidCode,

    #[error("Too many verification attempts")]
    TooManyAttempts,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<TesseraError> for AuthError {
    fn from(err: TesseraError) -> Self {
        match err {
            TesseraError::Verification(VerificationError::TooManyAttempts) => {
                AuthError::TooManyAttempts
            }
            TesseraError::Verification(
                VerificationError::NotFound
                | VerificationError::Expired
                | VerificationError::InvalidCode,
            ) => AuthError::InvalidCode,
            TesseraError::Validation(msg) => AuthError::BadRequest(msg),
            TesseraError::AuthError(msg) | TesseraError::StorageError(msg) => {
                AuthError::InternalError(msg)
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::InvalidCode => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired verification code",
            ),
            AuthError::TooManyAttempts => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many verification attempts",
            ),
            AuthError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AuthError::InternalError(ref msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
