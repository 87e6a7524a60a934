//! Session binding and lifetime rules

use chrono::Duration;
use sha2::{Digest, Sha256};

use super::config::TokenServiceConfig;

/// Credential kinds with a configured lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// Short-lived signed token
    Access,
    /// Long-lived opaque refresh token
    Refresh,
}

/// Pure predicates consumed by the lifecycle manager
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    access_ttl: Duration,
    refresh_ttl: Duration,
    allow_multiple_sessions: bool,
}

impl SessionPolicy {
    pub fn new(access_ttl: Duration, refresh_ttl: Duration, allow_multiple_sessions: bool) -> Self {
        Self {
            access_ttl,
            refresh_ttl,
            allow_multiple_sessions,
        }
    }

    pub fn from_config(config: &TokenServiceConfig) -> Self {
        Self::new(
            config.access_token_ttl,
            config.refresh_token_ttl,
            config.allow_multiple_sessions,
        )
    }

    /// Fixed-length form of a presented device fingerprint, as recorded
    pub fn device_key(&self, presented: &str) -> String {
        device_fingerprint_from_user_agent(presented)
    }

    /// Exact, constant-time device fingerprint comparison
    pub fn device_fingerprints_match(&self, recorded: &str, presented: &str) -> bool {
        constant_time_eq::constant_time_eq(recorded.as_bytes(), presented.as_bytes())
    }

    /// Lifetime for a credential class
    pub fn ttl_for(&self, class: TokenClass) -> Duration {
        match class {
            TokenClass::Access => self.access_ttl,
            TokenClass::Refresh => self.refresh_ttl,
        }
    }

    /// Whether a principal with `active_sessions` may be issued another pair
    pub fn allows_new_session(&self, active_sessions: u64) -> bool {
        self.allow_multiple_sessions || active_sessions == 0
    }
}

/// Hex SHA-256 of a User-Agent header, for use as a device fingerprint
pub fn device_fingerprint_from_user_agent(user_agent: &str) -> String {
    hex::encode(Sha256::digest(user_agent.as_bytes()))
}
