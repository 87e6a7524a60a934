//! Unit tests for the token lifecycle manager

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use rotor_shared::config::AuthConfig;

use crate::domain::entities::token::{RefreshToken, TokenState, MAX_OWNER_GUID_LEN};
use crate::errors::{DomainError, TokenError};
use crate::repositories::{ConsumeOutcome, CredentialStore, InMemoryCredentialStore};
use crate::services::token::{
    device_fingerprint_from_user_agent, DeauthorizeTarget, RequestContext, TokenLifecycleManager,
    TokenServiceConfig, MAX_ACCESS_TOKEN_TTL_SECONDS, MAX_REFRESH_TOKEN_TTL_SECONDS,
};

use super::mocks::{FailingStore, ScriptedConsumeStore, SlowStore};

fn manager() -> (TokenLifecycleManager<Arc<InMemoryCredentialStore>>, Arc<InMemoryCredentialStore>) {
    manager_with(TokenServiceConfig::default())
}

fn manager_with(
    config: TokenServiceConfig,
) -> (TokenLifecycleManager<Arc<InMemoryCredentialStore>>, Arc<InMemoryCredentialStore>) {
    let store = Arc::new(InMemoryCredentialStore::new());
    let manager = TokenLifecycleManager::new(store.clone(), config).unwrap();
    (manager, store)
}

#[tokio::test]
async fn test_issue_persists_fingerprint_only() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let pair = manager.issue("g1", "ua-A", &ctx).await.unwrap();

    assert_eq!(pair.access_expires_in, 900);
    assert_eq!(pair.refresh_expires_in, 7 * 24 * 3600);

    let family = store.family("g1").await;
    assert_eq!(family.len(), 1);
    let record = &family[0];
    assert_eq!(record.state, TokenState::Active);
    assert_eq!(record.device_fingerprint, device_fingerprint_from_user_agent("ua-A"));
    assert_ne!(record.lookup_fingerprint, pair.refresh_value);
    assert_eq!(
        record.lookup_fingerprint,
        manager.codec().fingerprinter().fingerprint(&pair.refresh_value)
    );
}

#[tokio::test]
async fn test_issue_single_session_rejects_second_pair() {
    let (manager, store) = manager();
    let ctx = manager.context();

    manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let second = manager.issue("g1", "ua-B", &ctx).await;

    assert_eq!(second.unwrap_err(), TokenError::AlreadyIssued);
    assert_eq!(store.family("g1").await.len(), 1);

    // Other principals are unaffected
    assert!(manager.issue("g2", "ua-A", &ctx).await.is_ok());
}

#[tokio::test]
async fn test_issue_multiple_sessions_when_allowed() {
    let (manager, store) = manager_with(TokenServiceConfig {
        allow_multiple_sessions: true,
        ..Default::default()
    });
    let ctx = manager.context();

    let first = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let second = manager.issue("g1", "ua-B", &ctx).await.unwrap();

    assert_ne!(first.refresh_value, second.refresh_value);
    assert_eq!(store.count_active_for("g1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_issue_allowed_after_deauthorize() {
    let (manager, _store) = manager();
    let ctx = manager.context();

    manager.issue("g1", "ua-A", &ctx).await.unwrap();
    manager
        .deauthorize(DeauthorizeTarget::Principal("g1"), &ctx)
        .await
        .unwrap();

    assert!(manager.issue("g1", "ua-A", &ctx).await.is_ok());
}

#[tokio::test]
async fn test_issue_records_fixed_length_device_key() {
    let (manager, store) = manager();
    let ctx = manager.context();
    let user_agent = "Mozilla/5.0 (X11; Linux x86_64) ".repeat(16);
    assert!(user_agent.len() >= 512);

    let pair = manager.issue("g1", &user_agent, &ctx).await.unwrap();

    let record = &store.family("g1").await[0];
    assert_eq!(record.device_fingerprint.len(), 64);

    let rotated = manager
        .rotate(&pair.refresh_value, &pair.signed_token, &user_agent, &ctx)
        .await
        .unwrap();

    // A different long User-Agent is still a device mismatch
    let other = format!("{}!", user_agent);
    let result = manager
        .rotate(&rotated.refresh_value, &rotated.signed_token, &other, &ctx)
        .await;
    assert_eq!(result.unwrap_err(), TokenError::DeviceMismatch);
}

#[tokio::test]
async fn test_issue_rejects_unusable_guid() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let long_guid = "g".repeat(MAX_OWNER_GUID_LEN + 1);
    let result = manager.issue(&long_guid, "ua-A", &ctx).await;
    assert_eq!(result.unwrap_err(), TokenError::InvalidCredential);
    assert!(!TokenError::InvalidCredential.is_retryable());

    let empty = manager.issue("", "ua-A", &ctx).await;
    assert_eq!(empty.unwrap_err(), TokenError::InvalidCredential);
    assert!(store.is_empty().await);

    let at_limit = "g".repeat(MAX_OWNER_GUID_LEN);
    assert!(manager.issue(&at_limit, "ua-A", &ctx).await.is_ok());
}

#[tokio::test]
async fn test_rotate_consumes_and_chains() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let first = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let second = manager
        .rotate(&first.refresh_value, &first.signed_token, "ua-A", &ctx)
        .await
        .unwrap();

    assert_ne!(first.refresh_value, second.refresh_value);
    assert_ne!(first.signed_token, second.signed_token);

    let family = store.family("g1").await;
    assert_eq!(family.len(), 2);
    let fingerprinter = manager.codec().fingerprinter();
    let old = family
        .iter()
        .find(|t| t.lookup_fingerprint == fingerprinter.fingerprint(&first.refresh_value))
        .unwrap();
    let new = family
        .iter()
        .find(|t| t.lookup_fingerprint == fingerprinter.fingerprint(&second.refresh_value))
        .unwrap();
    assert_eq!(old.state, TokenState::Consumed);
    assert_eq!(new.state, TokenState::Active);
    assert_eq!(new.device_fingerprint, old.device_fingerprint);
    assert_eq!(new.owner_guid, "g1");

    assert_eq!(
        manager.codec().verify(&second.signed_token, &second.refresh_value),
        Ok("g1".to_string())
    );
}

#[tokio::test]
async fn test_rotate_replay_revokes_family() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let first = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let second = manager
        .rotate(&first.refresh_value, &first.signed_token, "ua-A", &ctx)
        .await
        .unwrap();

    let replay = manager
        .rotate(&first.refresh_value, &first.signed_token, "ua-A", &ctx)
        .await;
    assert_eq!(replay.unwrap_err(), TokenError::ReplayDetected);
    assert!(store
        .family("g1")
        .await
        .iter()
        .all(|t| t.state == TokenState::Revoked));

    let after = manager
        .rotate(&second.refresh_value, &second.signed_token, "ua-A", &ctx)
        .await;
    assert_eq!(after.unwrap_err(), TokenError::Deauthorized);
}

#[tokio::test]
async fn test_rotate_with_foreign_signed_token_rejected() {
    let (manager, store) = manager_with(TokenServiceConfig {
        allow_multiple_sessions: true,
        ..Default::default()
    });
    let ctx = manager.context();

    let a = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let b = manager.issue("g1", "ua-A", &ctx).await.unwrap();

    let result = manager
        .rotate(&a.refresh_value, &b.signed_token, "ua-A", &ctx)
        .await;
    assert_eq!(result.unwrap_err(), TokenError::InvalidCredential);

    // Nothing was consumed
    assert_eq!(store.count_active_for("g1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_rotate_unknown_refresh_value() {
    let (manager, _store) = manager();
    let ctx = manager.context();

    let signed = manager
        .codec()
        .issue("g1", "never-stored", Duration::minutes(5))
        .unwrap();
    let result = manager.rotate("never-stored", &signed, "ua-A", &ctx).await;

    assert_eq!(result.unwrap_err(), TokenError::UnknownToken);
}

#[tokio::test]
async fn test_rotate_device_mismatch_revokes_family() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let pair = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let result = manager
        .rotate(&pair.refresh_value, &pair.signed_token, "ua-B", &ctx)
        .await;
    assert_eq!(result.unwrap_err(), TokenError::DeviceMismatch);
    assert_eq!(store.count_active_for("g1").await.unwrap(), 0);

    let retry = manager
        .rotate(&pair.refresh_value, &pair.signed_token, "ua-A", &ctx)
        .await;
    assert_eq!(retry.unwrap_err(), TokenError::Deauthorized);
}

#[tokio::test]
async fn test_rotate_subject_must_own_record() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let value = "value-owned-by-g2";
    let fingerprint = manager.codec().fingerprinter().fingerprint(value);
    store
        .insert(RefreshToken::new(
            "g2",
            fingerprint,
            device_fingerprint_from_user_agent("ua-A"),
            Duration::days(1),
        ))
        .await
        .unwrap();
    let signed = manager.codec().issue("g1", value, Duration::minutes(5)).unwrap();

    let result = manager.rotate(value, &signed, "ua-A", &ctx).await;
    assert_eq!(result.unwrap_err(), TokenError::InvalidCredential);
    assert_eq!(store.count_active_for("g2").await.unwrap(), 1);
}

#[tokio::test]
async fn test_rotate_expired_refresh_token() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let value = "expired-refresh-value";
    let fingerprint = manager.codec().fingerprinter().fingerprint(value);
    store
        .insert(RefreshToken::new(
            "g1",
            fingerprint,
            device_fingerprint_from_user_agent("ua-A"),
            Duration::seconds(-1),
        ))
        .await
        .unwrap();
    let signed = manager.codec().issue("g1", value, Duration::minutes(5)).unwrap();

    let rotated = manager.rotate(value, &signed, "ua-A", &ctx).await;
    assert_eq!(rotated.unwrap_err(), TokenError::InvalidCredential);

    let validated = manager.validate_pair(&signed, value, &ctx).await;
    assert_eq!(validated.unwrap_err(), TokenError::InvalidCredential);

    // Expired sessions do not block a new issue
    assert!(manager.issue("g1", "ua-A", &ctx).await.is_ok());
}

#[tokio::test]
async fn test_rotate_revoked_between_lookup_and_consume() {
    let inner = InMemoryCredentialStore::new();
    let store = ScriptedConsumeStore {
        inner: inner.clone(),
        outcome: ConsumeOutcome::Revoked,
    };
    let manager = TokenLifecycleManager::new(store, TokenServiceConfig::default()).unwrap();
    let ctx = manager.context();

    let pair = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let result = manager
        .rotate(&pair.refresh_value, &pair.signed_token, "ua-A", &ctx)
        .await;

    assert_eq!(result.unwrap_err(), TokenError::Deauthorized);
    assert_eq!(inner.len().await, 1);
}

#[tokio::test]
async fn test_rotate_record_vanished_before_consume() {
    let inner = InMemoryCredentialStore::new();
    let store = ScriptedConsumeStore {
        inner: inner.clone(),
        outcome: ConsumeOutcome::NotFound,
    };
    let manager = TokenLifecycleManager::new(store, TokenServiceConfig::default()).unwrap();
    let ctx = manager.context();

    let pair = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let result = manager
        .rotate(&pair.refresh_value, &pair.signed_token, "ua-A", &ctx)
        .await;

    assert_eq!(result.unwrap_err(), TokenError::UnknownToken);
}

#[tokio::test]
async fn test_validate_pair_is_read_only() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let pair = manager.issue("g1", "ua-A", &ctx).await.unwrap();

    for _ in 0..3 {
        let session = manager
            .validate_pair(&pair.signed_token, &pair.refresh_value, &ctx)
            .await
            .unwrap();
        assert_eq!(session.guid, "g1");
        assert_eq!(session.device_fingerprint, device_fingerprint_from_user_agent("ua-A"));
    }

    assert_eq!(store.count_active_for("g1").await.unwrap(), 1);

    // Still rotatable after validation
    assert!(manager
        .rotate(&pair.refresh_value, &pair.signed_token, "ua-A", &ctx)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_validate_pair_states() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let first = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let second = manager
        .rotate(&first.refresh_value, &first.signed_token, "ua-A", &ctx)
        .await
        .unwrap();

    // Consumed pair is not valid, and checking it does not revoke anything
    let consumed = manager
        .validate_pair(&first.signed_token, &first.refresh_value, &ctx)
        .await;
    assert_eq!(consumed.unwrap_err(), TokenError::InvalidCredential);
    assert_eq!(store.count_active_for("g1").await.unwrap(), 1);

    let mismatched = manager
        .validate_pair(&first.signed_token, &second.refresh_value, &ctx)
        .await;
    assert_eq!(mismatched.unwrap_err(), TokenError::InvalidCredential);

    manager
        .deauthorize(DeauthorizeTarget::Principal("g1"), &ctx)
        .await
        .unwrap();
    let revoked = manager
        .validate_pair(&second.signed_token, &second.refresh_value, &ctx)
        .await;
    assert_eq!(revoked.unwrap_err(), TokenError::Deauthorized);
}

#[tokio::test]
async fn test_deauthorize_is_idempotent() {
    let (manager, _store) = manager();
    let ctx = manager.context();

    let first = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    manager
        .rotate(&first.refresh_value, &first.signed_token, "ua-A", &ctx)
        .await
        .unwrap();

    // Both the consumed and the active record flip to revoked
    let revoked = manager
        .deauthorize(DeauthorizeTarget::Principal("g1"), &ctx)
        .await
        .unwrap();
    assert_eq!(revoked, 2);

    let again = manager
        .deauthorize(DeauthorizeTarget::Principal("g1"), &ctx)
        .await
        .unwrap();
    assert_eq!(again, 0);

    let unknown = manager
        .deauthorize(DeauthorizeTarget::Principal("nobody"), &ctx)
        .await
        .unwrap();
    assert_eq!(unknown, 0);
}

#[tokio::test]
async fn test_deauthorize_by_refresh_value() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let pair = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let revoked = manager
        .deauthorize(DeauthorizeTarget::RefreshValue(&pair.refresh_value), &ctx)
        .await
        .unwrap();

    assert_eq!(revoked, 1);
    assert_eq!(store.count_active_for("g1").await.unwrap(), 0);

    let unknown = manager
        .deauthorize(DeauthorizeTarget::RefreshValue("not-a-value"), &ctx)
        .await;
    assert_eq!(unknown.unwrap_err(), TokenError::UnknownToken);
}

#[tokio::test]
async fn test_deauthorize_by_signed_token() {
    let (manager, store) = manager();
    let ctx = manager.context();

    let pair = manager.issue("g1", "ua-A", &ctx).await.unwrap();
    let revoked = manager
        .deauthorize(DeauthorizeTarget::SignedToken(&pair.signed_token), &ctx)
        .await
        .unwrap();

    assert_eq!(revoked, 1);
    assert_eq!(store.count_active_for("g1").await.unwrap(), 0);

    let garbage = manager
        .deauthorize(DeauthorizeTarget::SignedToken("garbage"), &ctx)
        .await;
    assert_eq!(garbage.unwrap_err(), TokenError::InvalidCredential);
}

#[tokio::test]
async fn test_store_failure_maps_to_unavailable() {
    let manager = TokenLifecycleManager::new(FailingStore, TokenServiceConfig::default()).unwrap();
    let ctx = manager.context();

    assert_eq!(
        manager.issue("g1", "ua-A", &ctx).await.unwrap_err(),
        TokenError::StoreUnavailable
    );

    let signed = manager
        .codec()
        .issue("g1", "refresh", Duration::minutes(5))
        .unwrap();
    assert_eq!(
        manager.rotate("refresh", &signed, "ua-A", &ctx).await.unwrap_err(),
        TokenError::StoreUnavailable
    );
    assert_eq!(
        manager.validate_pair(&signed, "refresh", &ctx).await.unwrap_err(),
        TokenError::StoreUnavailable
    );
    assert_eq!(
        manager
            .deauthorize(DeauthorizeTarget::Principal("g1"), &ctx)
            .await
            .unwrap_err(),
        TokenError::StoreUnavailable
    );
}

#[tokio::test]
async fn test_invalid_signed_token_never_reaches_store() {
    let manager = TokenLifecycleManager::new(FailingStore, TokenServiceConfig::default()).unwrap();
    let ctx = manager.context();

    let result = manager.rotate("refresh", "not-a-token", "ua-A", &ctx).await;
    assert_eq!(result.unwrap_err(), TokenError::InvalidCredential);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_maps_to_unavailable() {
    let store = SlowStore::new(StdDuration::from_secs(10));
    let manager = TokenLifecycleManager::new(store, TokenServiceConfig::default()).unwrap();

    let ctx = RequestContext::with_timeout(StdDuration::from_millis(100));
    let result = manager.issue("g1", "ua-A", &ctx).await;

    assert_eq!(result.unwrap_err(), TokenError::StoreUnavailable);
    assert!(manager.store().inner.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_within_deadline() {
    let store = SlowStore::new(StdDuration::from_millis(10));
    let manager = TokenLifecycleManager::new(store, TokenServiceConfig::default()).unwrap();

    let ctx = RequestContext::with_timeout(StdDuration::from_secs(1));
    assert!(manager.issue("g1", "ua-A", &ctx).await.is_ok());
}

#[test]
fn test_invalid_config_rejected() {
    let result = TokenLifecycleManager::new(
        InMemoryCredentialStore::new(),
        TokenServiceConfig {
            refresh_token_bytes: 16,
            ..Default::default()
        },
    );
    assert!(result.is_err());

    let result = TokenLifecycleManager::new(
        InMemoryCredentialStore::new(),
        TokenServiceConfig {
            signing_secret: String::new(),
            ..Default::default()
        },
    );
    assert!(result.is_err());
}

#[test]
fn test_oversized_token_lifetimes_rejected() {
    let result = TokenLifecycleManager::new(
        InMemoryCredentialStore::new(),
        TokenServiceConfig {
            access_token_ttl: Duration::seconds(10_000_000_000_000),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(DomainError::Configuration { .. })));

    let result = TokenLifecycleManager::new(
        InMemoryCredentialStore::new(),
        TokenServiceConfig {
            refresh_token_ttl: Duration::seconds(MAX_REFRESH_TOKEN_TTL_SECONDS + 1),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(DomainError::Configuration { .. })));

    let at_limit = TokenServiceConfig {
        access_token_ttl: Duration::seconds(MAX_ACCESS_TOKEN_TTL_SECONDS),
        refresh_token_ttl: Duration::seconds(MAX_REFRESH_TOKEN_TTL_SECONDS),
        ..Default::default()
    };
    assert!(at_limit.validate().is_ok());
}

#[test]
fn test_auth_config_expiry_out_of_range() {
    let mut auth = AuthConfig::default();
    auth.jwt.access_token_expiry = i64::MAX;
    assert!(matches!(
        TokenServiceConfig::from_auth_config(&auth),
        Err(DomainError::Configuration { .. })
    ));

    let mut auth = AuthConfig::default();
    auth.jwt.refresh_token_expiry = MAX_REFRESH_TOKEN_TTL_SECONDS * 2;
    assert!(matches!(
        TokenServiceConfig::from_auth_config(&auth),
        Err(DomainError::Configuration { .. })
    ));

    assert!(TokenServiceConfig::from_auth_config(&AuthConfig::default()).is_ok());
}
