//! Repository traits for the data access layer
//!
//! Services only ever talk to storage through these traits.
//!
//! # Trait Hierarchy
//!
//! - [`CodeRepository`], [`PrincipalDirectory`] and [`AuditSink`] define the operations
//!   for each data domain
//! - A `*Provider` trait per domain hands out the concrete implementation
//! - [`RepositoryProvider`] combines the providers and adds lifecycle methods

pub mod adapter;
pub mod audit;
pub mod code;
pub mod principal;

pub use adapter::{AuditSinkAdapter, CodeRepositoryAdapter, PrincipalDirectoryAdapter};
pub use audit::AuditSink;
pub use code::CodeRepository;
pub use principal::PrincipalDirectory;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for verification code storage.
pub trait CodeRepositoryProvider: Send + Sync + 'static {
    type CodeRepo: CodeRepository;

    fn code(&self) -> &Self::CodeRepo;
}

/// Provider trait for the principal directory.
pub trait PrincipalDirectoryProvider: Send + Sync + 'static {
    type PrincipalRepo: PrincipalDirectory;

    fn principal(&self) -> &Self::PrincipalRepo;
}

/// Provider trait for the dispatch audit log.
pub trait AuditSinkProvider: Send + Sync + 'static {
    type AuditRepo: AuditSink;

    fn audit(&self) -> &Self::AuditRepo;
}

/// Provider trait that storage backends implement to supply every repository.
///
/// # Implementing a Custom Storage Backend
///
/// ```rust,ignore
/// use tessera_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// impl CodeRepositoryProvider for MyStorage {
///     type CodeRepo = MyCodeRepository;
///     fn code(&self) -> &Self::CodeRepo { &self.codes }
/// }
///
/// // ... principal() and audit() ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider:
    CodeRepositoryProvider + PrincipalDirectoryProvider + AuditSinkProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
