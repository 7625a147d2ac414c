//! Repository trait for verification codes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{CodeId, Error, NewVerificationCode, VerificationCode};

/// Durable store of issued verification codes.
///
/// Each method must be individually atomic (a single statement in a SQL backend).
/// Services never wrap a sequence of calls in a transaction, so implementations
/// must not rely on one either.
///
/// # Security Considerations
///
/// - Only hashes are stored. The plaintext code never reaches this trait.
/// - `used` and `attempts` only ever move forward; no method may reset them.
#[async_trait]
pub trait CodeRepository: Send + Sync + 'static {
    /// Persist a freshly issued code with `attempts = 0` and `used = false`.
    async fn insert(&self, code: NewVerificationCode) -> Result<VerificationCode, Error>;

    /// Find the most recently created unused, unexpired code for an identity.
    ///
    /// Expiry is judged against the store's own clock. Ties on `created_at` are
    /// broken by insertion order, newest first.
    async fn find_active(&self, identity: &str) -> Result<Option<VerificationCode>, Error>;

    /// Mark an unused code as consumed.
    ///
    /// Returns `true` only for the one call that flipped `used`. Concurrent
    /// callers racing on the same code see `false`.
    async fn mark_used(&self, id: &CodeId) -> Result<bool, Error>;

    /// Increment the attempt counter of an unused code and return the new value.
    ///
    /// Returns `None` when the code is missing or already used.
    async fn increment_attempts(&self, id: &CodeId) -> Result<Option<u32>, Error>;

    /// Mark every unused code of an identity as used.
    ///
    /// # Returns
    ///
    /// The number of records invalidated.
    async fn invalidate_active(&self, identity: &str) -> Result<u64, Error>;

    /// Physically remove every code whose `expires_at` has been reached.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    async fn delete_expired(&self) -> Result<u64, Error>;

    /// Count codes created for an identity at or after `since`, used or not.
    async fn count_recent(&self, identity: &str, since: DateTime<Utc>) -> Result<u32, Error>;
}
