//! Configuration for the token lifecycle services

use std::str::FromStr;

use chrono::Duration;
use jsonwebtoken::Algorithm;
use rotor_shared::config::AuthConfig;

use crate::domain::entities::token::{
    DEFAULT_ACCESS_TOKEN_TTL_SECONDS, DEFAULT_ISSUER, DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
};
use crate::errors::DomainError;

/// Smallest refresh value, in random bytes (256 bits)
pub const MIN_REFRESH_TOKEN_BYTES: usize = 32;

/// Longest accepted access token lifetime (1 day)
pub const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Longest accepted refresh token lifetime (365 days)
pub const MAX_REFRESH_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// MAC algorithms accepted for signing
pub const ALLOWED_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Configuration for the token lifecycle manager
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct TokenServiceConfig {
    /// MAC secret for access tokens
    pub signing_secret: String,
    /// Key for refresh value lookup fingerprints
    pub fingerprint_key: String,
    /// MAC algorithm
    pub algorithm: Algorithm,
    /// Issuer claim
    pub issuer: String,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token absolute lifetime
    pub refresh_token_ttl: Duration,
    /// Allow several active sessions per principal
    pub allow_multiple_sessions: bool,
    /// Random bytes per refresh value
    pub refresh_token_bytes: usize,
    /// Default deadline for the store calls of one operation
    pub store_timeout: std::time::Duration,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            signing_secret: "development-secret-please-change-in-production".to_string(),
            fingerprint_key: "development-fingerprint-key-please-change".to_string(),
            algorithm: Algorithm::HS512,
            issuer: DEFAULT_ISSUER.to_string(),
            access_token_ttl: Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECONDS),
            refresh_token_ttl: Duration::seconds(DEFAULT_REFRESH_TOKEN_TTL_SECONDS),
            allow_multiple_sessions: false,
            refresh_token_bytes: MIN_REFRESH_TOKEN_BYTES,
            store_timeout: std::time::Duration::from_secs(3),
        }
    }
}

impl std::fmt::Debug for TokenServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenServiceConfig")
            .field("signing_secret", &"<redacted>")
            .field("fingerprint_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("allow_multiple_sessions", &self.allow_multiple_sessions)
            .field("refresh_token_bytes", &self.refresh_token_bytes)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

impl TokenServiceConfig {
    /// Builds and validates the service config from the shared auth config
    pub fn from_auth_config(auth: &AuthConfig) -> Result<Self, DomainError> {
        let algorithm = Algorithm::from_str(&auth.jwt.algorithm).map_err(|_| {
            DomainError::configuration(format!("unknown signing algorithm {}", auth.jwt.algorithm))
        })?;

        let config = Self {
            signing_secret: auth.jwt.secret.clone(),
            fingerprint_key: auth.jwt.fingerprint_key.clone(),
            algorithm,
            issuer: auth.jwt.issuer.clone(),
            access_token_ttl: ttl_from_seconds("access", auth.jwt.access_token_expiry)?,
            refresh_token_ttl: ttl_from_seconds("refresh", auth.jwt.refresh_token_expiry)?,
            allow_multiple_sessions: auth.session.allow_multiple_sessions,
            refresh_token_bytes: auth.session.refresh_token_bytes,
            store_timeout: std::time::Duration::from_millis(auth.session.store_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the services rely on
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.signing_secret.is_empty() {
            return Err(DomainError::configuration("signing secret must not be empty"));
        }
        if self.fingerprint_key.is_empty() {
            return Err(DomainError::configuration("fingerprint key must not be empty"));
        }
        if !ALLOWED_ALGORITHMS.contains(&self.algorithm) {
            return Err(DomainError::configuration(format!(
                "algorithm {:?} is not a MAC algorithm",
                self.algorithm
            )));
        }
        if self.issuer.is_empty() {
            return Err(DomainError::configuration("issuer must not be empty"));
        }
        if self.access_token_ttl <= Duration::zero() || self.refresh_token_ttl <= Duration::zero() {
            return Err(DomainError::configuration("token lifetimes must be positive"));
        }
        if self.access_token_ttl > Duration::seconds(MAX_ACCESS_TOKEN_TTL_SECONDS) {
            return Err(DomainError::configuration(format!(
                "access token lifetime must not exceed {} seconds",
                MAX_ACCESS_TOKEN_TTL_SECONDS
            )));
        }
        if self.refresh_token_ttl > Duration::seconds(MAX_REFRESH_TOKEN_TTL_SECONDS) {
            return Err(DomainError::configuration(format!(
                "refresh token lifetime must not exceed {} seconds",
                MAX_REFRESH_TOKEN_TTL_SECONDS
            )));
        }
        if self.refresh_token_bytes < MIN_REFRESH_TOKEN_BYTES {
            return Err(DomainError::configuration(format!(
                "refresh tokens need at least {} random bytes",
                MIN_REFRESH_TOKEN_BYTES
            )));
        }
        if self.store_timeout.is_zero() {
            return Err(DomainError::configuration("store timeout must be positive"));
        }
        Ok(())
    }
}

fn ttl_from_seconds(class: &str, seconds: i64) -> Result<Duration, DomainError> {
    Duration::try_seconds(seconds).ok_or_else(|| {
        DomainError::configuration(format!("{} token lifetime {}s is out of range", class, seconds))
    })
}
