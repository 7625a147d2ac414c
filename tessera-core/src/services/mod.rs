//! Service layer
//!
//! The services that implement the code lifecycle and traffic gating. Each is
//! `Send + Sync` and meant to be shared behind an `Arc`.

pub mod dispatch;
pub mod issuer;
pub mod rate_limit;
pub mod sweeper;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{DispatchService, Dispatcher, LogDispatcher, VERIFICATION_SUBJECT};
pub use issuer::{IssueOutcome, OtpConfig, OtpIssuer};
pub use rate_limit::{ClientCounter, Decision, RateLimitConfig, RequestRateLimiter};
pub use sweeper::CodeSweeper;
pub use verifier::OtpVerifier;

pub use crate::audit::DispatchStatus;

#[cfg(feature = "mailer")]
pub use dispatch::MailerDispatcher;
