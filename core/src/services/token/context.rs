//! Per-request deadline applied to every store call

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::errors::{StoreError, TokenError};

/// Deadline shared by all store calls of one lifecycle operation
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    deadline: Instant,
}

impl RequestContext {
    /// Context expiring at `deadline`
    pub fn new(deadline: Instant) -> Self {
        Self { deadline }
    }

    /// Context expiring `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Runs a store call under the deadline
    ///
    /// Both an elapsed deadline and a store failure become
    /// `TokenError::StoreUnavailable`; neither is ever reported as not found.
    pub async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, TokenError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout_at(self.deadline, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!(operation, "Credential store call failed: {}", e);
                Err(TokenError::StoreUnavailable)
            }
            Err(_) => {
                tracing::warn!(operation, "Credential store call exceeded deadline");
                Err(TokenError::StoreUnavailable)
            }
        }
    }
}
