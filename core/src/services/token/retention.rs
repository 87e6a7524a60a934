//! Retention service for periodic pruning of dead refresh token records
//!
//! The lifecycle manager never deletes records. This service removes rows
//! that expired more than a grace period ago, and revoked rows older than
//! that, so the table does not grow without bound.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::errors::DomainError;
use crate::repositories::CredentialStore;

/// Configuration for the retention service
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// How often to run a pruning cycle (in seconds)
    pub interval_seconds: u64,
    /// How long dead records are kept before deletion (in days)
    pub grace_period_days: i64,
    /// Whether the background task runs at all
    pub enabled: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600, // Run every hour
            grace_period_days: 30,
            enabled: true,
        }
    }
}

/// Longest accepted grace period (100 years)
const MAX_GRACE_PERIOD_DAYS: i64 = 36_500;

impl RetentionConfig {
    /// Rejects settings that would stall the background task or overflow the cutoff
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.interval_seconds == 0 {
            return Err(DomainError::configuration(
                "retention interval must be positive",
            ));
        }
        if self.grace_period_days < 0 {
            return Err(DomainError::configuration(
                "retention grace period must not be negative",
            ));
        }
        if self.grace_period_days > MAX_GRACE_PERIOD_DAYS {
            return Err(DomainError::configuration(format!(
                "retention grace period must not exceed {} days",
                MAX_GRACE_PERIOD_DAYS
            )));
        }
        Ok(())
    }
}

/// Deletes expired and revoked refresh token records past the grace period
pub struct RetentionService<S: CredentialStore + 'static> {
    store: Arc<S>,
    config: RetentionConfig,
}

impl<S: CredentialStore + 'static> RetentionService<S> {
    pub fn new(store: Arc<S>, config: RetentionConfig) -> Self {
        Self { store, config }
    }

    /// Run a single pruning cycle
    ///
    /// # Returns
    /// * `Ok(RetentionResult)` - Summary; store failures are collected in `errors`
    /// * `Err(DomainError)` - The configuration is invalid
    pub async fn run_retention(&self) -> Result<RetentionResult, DomainError> {
        if !self.config.enabled {
            return Ok(RetentionResult::default());
        }

        self.config.validate()?;

        let grace = Duration::try_days(self.config.grace_period_days)
            .ok_or_else(|| DomainError::configuration("retention grace period is out of range"))?;
        let cutoff = Utc::now()
            .checked_sub_signed(grace)
            .ok_or_else(|| DomainError::configuration("retention cutoff is out of range"))?;
        info!(%cutoff, "Starting refresh token retention cycle");

        let mut result = RetentionResult::default();
        match self.store.prune(cutoff).await {
            Ok(count) => {
                result.records_pruned = count;
                info!("Pruned {} refresh token records", count);
            }
            Err(e) => {
                error!("Failed to prune refresh tokens: {}", e);
                result.errors.push(format!("Prune error: {}", e));
            }
        }

        Ok(result)
    }

    /// Start the retention service as a background task
    ///
    /// # Returns
    /// * `Ok(None)` - Retention is disabled
    /// * `Err(DomainError)` - The configuration is invalid; nothing is spawned
    pub fn start_background_task(
        self: Arc<Self>,
    ) -> Result<Option<tokio::task::JoinHandle<()>>, DomainError> {
        if !self.config.enabled {
            warn!("Refresh token retention is disabled");
            return Ok(None);
        }

        self.config.validate()?;

        let interval = std::time::Duration::from_secs(self.config.interval_seconds);

        Ok(Some(tokio::spawn(async move {
            info!(
                "Refresh token retention started - will run every {} seconds",
                self.config.interval_seconds
            );

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                match self.run_retention().await {
                    Ok(result) => {
                        if !result.is_success() {
                            warn!("Retention completed with errors: {:?}", result.errors);
                        }
                    }
                    Err(e) => {
                        error!("Retention cycle failed: {}", e);
                    }
                }
            }
        })))
    }
}

/// Result of a retention cycle
#[derive(Debug, Default)]
pub struct RetentionResult {
    /// Number of records deleted
    pub records_pruned: u64,
    /// Any errors encountered during the cycle
    pub errors: Vec<String>,
}

impl RetentionResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
