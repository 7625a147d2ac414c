use async_trait::async_trait;

use crate::{Error, Principal};

/// Lookup of the accounts verification codes can be issued to.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync + 'static {
    /// Whether a principal is registered for this identity.
    async fn exists(&self, identity: &str) -> Result<bool, Error>;

    /// Return the principal for an identity, registering one if it does not exist.
    async fn resolve_or_create(&self, identity: &str) -> Result<Principal, Error>;

    async fn find_by_identity(&self, identity: &str) -> Result<Option<Principal>, Error>;
}
