//! Unit tests for the retention service

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::domain::entities::token::{RefreshToken, TokenState};
use crate::errors::DomainError;
use crate::repositories::{CredentialStore, InMemoryCredentialStore};
use crate::services::token::{RetentionConfig, RetentionService};

use super::mocks::FailingStore;

fn aged(fingerprint: &str, age_days: i64, lifetime_days: i64, state: TokenState) -> RefreshToken {
    let mut token = RefreshToken::new("g1", fingerprint, "ua-A", Duration::days(lifetime_days));
    token.issued_at = Utc::now() - Duration::days(age_days);
    token.expires_at = token.issued_at + Duration::days(lifetime_days);
    token.state = state;
    token
}

fn config(grace_period_days: i64) -> RetentionConfig {
    RetentionConfig {
        grace_period_days,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_prunes_only_dead_records_past_grace() {
    let store = Arc::new(InMemoryCredentialStore::new());
    // Expired 33 days ago
    store.insert(aged("expired-old", 40, 7, TokenState::Active)).await.unwrap();
    // Expired 3 days ago, still inside the grace period
    store.insert(aged("expired-recent", 10, 7, TokenState::Consumed)).await.unwrap();
    // Revoked long ago but with a long lifetime
    store.insert(aged("revoked-old", 45, 90, TokenState::Revoked)).await.unwrap();
    // Consumed long ago, not expired yet; needed for replay detection
    store.insert(aged("consumed-old", 45, 90, TokenState::Consumed)).await.unwrap();
    store.insert(aged("active", 1, 7, TokenState::Active)).await.unwrap();

    let service = RetentionService::new(store.clone(), config(30));
    let result = service.run_retention().await.unwrap();

    assert!(result.is_success());
    assert_eq!(result.records_pruned, 2);
    assert!(store.lookup_by_fingerprint("expired-old").await.unwrap().is_none());
    assert!(store.lookup_by_fingerprint("revoked-old").await.unwrap().is_none());
    assert!(store.lookup_by_fingerprint("expired-recent").await.unwrap().is_some());
    assert!(store.lookup_by_fingerprint("consumed-old").await.unwrap().is_some());
    assert!(store.lookup_by_fingerprint("active").await.unwrap().is_some());
}

#[tokio::test]
async fn test_disabled_retention_does_nothing() {
    let store = Arc::new(InMemoryCredentialStore::new());
    store.insert(aged("expired-old", 40, 7, TokenState::Active)).await.unwrap();

    let service = RetentionService::new(
        store.clone(),
        RetentionConfig {
            enabled: false,
            ..Default::default()
        },
    );
    let result = service.run_retention().await.unwrap();

    assert_eq!(result.records_pruned, 0);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_store_failure_is_collected() {
    let service = RetentionService::new(Arc::new(FailingStore), config(30));
    let result = service.run_retention().await.unwrap();

    assert!(!result.is_success());
    assert_eq!(result.records_pruned, 0);
}

#[tokio::test]
async fn test_negative_grace_period_rejected() {
    let service = RetentionService::new(Arc::new(InMemoryCredentialStore::new()), config(-1));
    assert!(matches!(
        service.run_retention().await,
        Err(DomainError::Configuration { .. })
    ));
}

#[tokio::test]
async fn test_oversized_grace_period_rejected() {
    let service = RetentionService::new(
        Arc::new(InMemoryCredentialStore::new()),
        config(i64::MAX),
    );
    assert!(matches!(
        service.run_retention().await,
        Err(DomainError::Configuration { .. })
    ));
}

#[tokio::test]
async fn test_zero_interval_rejected() {
    let zero_interval = RetentionConfig {
        interval_seconds: 0,
        ..Default::default()
    };
    assert!(zero_interval.validate().is_err());
    assert!(RetentionConfig::default().validate().is_ok());

    let service = Arc::new(RetentionService::new(
        Arc::new(InMemoryCredentialStore::new()),
        zero_interval,
    ));
    assert!(matches!(
        service.start_background_task(),
        Err(DomainError::Configuration { .. })
    ));
}

#[tokio::test]
async fn test_background_task_not_started_when_disabled() {
    let service = Arc::new(RetentionService::new(
        Arc::new(InMemoryCredentialStore::new()),
        RetentionConfig {
            enabled: false,
            ..Default::default()
        },
    ));
    assert!(service.start_background_task().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_background_task_prunes() {
    let store = Arc::new(InMemoryCredentialStore::new());
    store.insert(aged("expired-old", 40, 7, TokenState::Active)).await.unwrap();

    let service = Arc::new(RetentionService::new(store.clone(), config(30)));
    let handle = service.start_background_task().unwrap().unwrap();

    // The first interval tick fires immediately
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(store.is_empty().await);

    handle.abort();
}
