//! In-memory implementation of CredentialStore
//!
//! Every operation runs under one write lock, which gives the same atomicity
//! the relational store gets from conditional updates. Used by tests and by
//! embedders that do not need persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::token::{RefreshToken, TokenState};
use crate::errors::StoreError;

use super::r#trait::{ConsumeOutcome, CredentialStore};

/// In-memory credential store keyed by lookup fingerprint
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
}

impl InMemoryCredentialStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// All records owned by `owner_guid`, oldest first
    pub async fn family(&self, owner_guid: &str) -> Vec<RefreshToken> {
        let tokens = self.tokens.read().await;
        let mut family: Vec<RefreshToken> = tokens
            .values()
            .filter(|t| t.owner_guid == owner_guid)
            .cloned()
            .collect();
        family.sort_by_key(|t| t.issued_at);
        family
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }

    fn consume_locked(
        tokens: &mut HashMap<String, RefreshToken>,
        fingerprint: &str,
    ) -> ConsumeOutcome {
        match tokens.get_mut(fingerprint) {
            None => ConsumeOutcome::NotFound,
            Some(token) => match token.state {
                TokenState::Active => {
                    token.state = TokenState::Consumed;
                    ConsumeOutcome::Consumed
                }
                TokenState::Consumed => ConsumeOutcome::AlreadyConsumed,
                TokenState::Revoked => ConsumeOutcome::Revoked,
            },
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<RefreshToken>, StoreError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(fingerprint).cloned())
    }

    async fn insert(&self, token: RefreshToken) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().await;

        if tokens.contains_key(&token.lookup_fingerprint) {
            return Err(StoreError::Conflict {
                fingerprint: token.lookup_fingerprint,
            });
        }

        tokens.insert(token.lookup_fingerprint.clone(), token);
        Ok(())
    }

    async fn try_consume(&self, fingerprint: &str) -> Result<ConsumeOutcome, StoreError> {
        let mut tokens = self.tokens.write().await;
        Ok(Self::consume_locked(&mut tokens, fingerprint))
    }

    async fn revoke_family(&self, owner_guid: &str) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.write().await;
        let mut count = 0;
        for token in tokens.values_mut() {
            if token.owner_guid == owner_guid && token.state != TokenState::Revoked {
                token.state = TokenState::Revoked;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn count_active_for(&self, owner_guid: &str) -> Result<u64, StoreError> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .values()
            .filter(|t| t.owner_guid == owner_guid && t.is_usable())
            .count() as u64)
    }

    async fn consume_and_replace(
        &self,
        fingerprint: &str,
        successor: RefreshToken,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut tokens = self.tokens.write().await;

        if tokens.contains_key(&successor.lookup_fingerprint) {
            return Err(StoreError::Conflict {
                fingerprint: successor.lookup_fingerprint,
            });
        }

        let outcome = Self::consume_locked(&mut tokens, fingerprint);
        if outcome == ConsumeOutcome::Consumed {
            tokens.insert(successor.lookup_fingerprint.clone(), successor);
        }
        Ok(outcome)
    }

    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| {
            !(t.expires_at < cutoff || (t.state == TokenState::Revoked && t.issued_at < cutoff))
        });
        Ok((before - tokens.len()) as u64)
    }
}
