//! Credential store trait defining the interface for refresh token persistence.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::token::RefreshToken;
use crate::errors::StoreError;

/// Result of an atomic `Active -> Consumed` compare-and-set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The record was Active and is now Consumed
    Consumed,
    /// The record had already been consumed
    AlreadyConsumed,
    /// The record was revoked before the consume landed
    Revoked,
    /// No record with this fingerprint
    NotFound,
}

/// Port over persisted refresh token records
///
/// The lifecycle manager holds no mutable state of its own, so every
/// guarantee under concurrency rests on this trait:
/// - `try_consume` must be a single atomic conditional update, never a
///   read followed by a write
/// - `revoke_family` must flip every matching row in one statement
///
/// Callers bound each call with a deadline; implementations must not treat a
/// failure as `NotFound`.
///
/// # Example
/// ```no_run
/// # use rotor_core::repositories::{CredentialStore, ConsumeOutcome};
/// # async fn example(store: &impl CredentialStore) -> Result<(), Box<dyn std::error::Error>> {
/// match store.try_consume("lookup-fingerprint").await? {
///     ConsumeOutcome::Consumed => println!("rotation may proceed"),
///     ConsumeOutcome::AlreadyConsumed => println!("replay"),
///     ConsumeOutcome::Revoked | ConsumeOutcome::NotFound => println!("dead token"),
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a refresh token by its lookup fingerprint
    ///
    /// # Returns
    /// * `Ok(Some(RefreshToken))` - Token found
    /// * `Ok(None)` - No token with this fingerprint
    /// * `Err(StoreError)` - Store failure
    async fn lookup_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<RefreshToken>, StoreError>;

    /// Persist a new refresh token record
    ///
    /// # Returns
    /// * `Ok(())` - Stored
    /// * `Err(StoreError::Conflict)` - Fingerprint already stored
    async fn insert(&self, token: RefreshToken) -> Result<(), StoreError>;

    /// Atomically move a record from Active to Consumed
    async fn try_consume(&self, fingerprint: &str) -> Result<ConsumeOutcome, StoreError>;

    /// Revoke every non-revoked record owned by `owner_guid`
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of records that transitioned to Revoked
    async fn revoke_family(&self, owner_guid: &str) -> Result<u64, StoreError>;

    /// Count Active, unexpired records owned by `owner_guid`
    async fn count_active_for(&self, owner_guid: &str) -> Result<u64, StoreError>;

    /// Consume `fingerprint` and insert `successor` as one unit
    ///
    /// The default runs `try_consume` then `insert`. Stores with transactions
    /// should override it so that a cancelled call never leaves a consumed
    /// record without its successor.
    async fn consume_and_replace(
        &self,
        fingerprint: &str,
        successor: RefreshToken,
    ) -> Result<ConsumeOutcome, StoreError> {
        let outcome = self.try_consume(fingerprint).await?;
        if outcome == ConsumeOutcome::Consumed {
            self.insert(successor).await?;
        }
        Ok(outcome)
    }

    /// Delete records that expired before `cutoff` and revoked records issued before it
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of records deleted
    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    async fn lookup_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<RefreshToken>, StoreError> {
        (**self).lookup_by_fingerprint(fingerprint).await
    }

    async fn insert(&self, token: RefreshToken) -> Result<(), StoreError> {
        (**self).insert(token).await
    }

    async fn try_consume(&self, fingerprint: &str) -> Result<ConsumeOutcome, StoreError> {
        (**self).try_consume(fingerprint).await
    }

    async fn revoke_family(&self, owner_guid: &str) -> Result<u64, StoreError> {
        (**self).revoke_family(owner_guid).await
    }

    async fn count_active_for(&self, owner_guid: &str) -> Result<u64, StoreError> {
        (**self).count_active_for(owner_guid).await
    }

    async fn consume_and_replace(
        &self,
        fingerprint: &str,
        successor: RefreshToken,
    ) -> Result<ConsumeOutcome, StoreError> {
        (**self).consume_and_replace(fingerprint, successor).await
    }

    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        (**self).prune(cutoff).await
    }
}
