//! Core functionality for the tessera project
//!
//! This crate contains the one-time-code authentication core: the verification code
//! model, hashing of codes at rest, the repository traits storage backends implement,
//! and the services that issue and verify codes and gate traffic per client address.
//!
//! See [`OtpIssuer`] and [`OtpVerifier`] for the code lifecycle, [`RequestRateLimiter`]
//! for per-address throttling, and [`RepositoryProvider`] for what a storage backend
//! has to provide.
//!
//! The core is not intended to be used directly by application code; the `tessera`
//! crate wires these services together.
pub mod audit;
pub mod code;
pub mod crypto;
pub mod error;
pub mod id;
pub mod principal;
pub mod repositories;
pub mod services;
pub mod session;
pub mod validation;

pub use audit::{DispatchKind, DispatchRecord, DispatchStatus, NewDispatchRecord};
pub use code::{CodeId, NewVerificationCode, VerificationCode};
pub use error::Error;
pub use principal::{Principal, PrincipalId};
pub use repositories::{
    AuditSink, CodeRepository, PrincipalDirectory, RepositoryProvider,
};
pub use services::{
    ClientCounter, CodeSweeper, Decision, DispatchService, Dispatcher, IssueOutcome,
    LogDispatcher, OtpConfig, OtpIssuer, OtpVerifier, RateLimitConfig, RequestRateLimiter,
};
pub use session::{
    JwtAlgorithm, JwtClaims, JwtConfig, JwtSessionIssuer, Session, SessionConfig, SessionIssuer,
};
