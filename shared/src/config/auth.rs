//! Token signing and session configuration

use serde::{Deserialize, Serialize};

const DEFAULT_SECRET: &str = "development-secret-please-change-in-production";
const DEFAULT_FINGERPRINT_KEY: &str = "development-fingerprint-key-please-change";

/// Signed token and refresh token configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// MAC secret for signing access tokens
    pub secret: String,

    /// Key for the deterministic digest of refresh values.
    ///
    /// Kept apart from `secret` so that rotating the signing secret leaves
    /// outstanding refresh tokens resolvable.
    pub fingerprint_key: String,

    /// Access token expiry time in seconds
    pub access_token_expiry: i64,

    /// Refresh token absolute lifetime in seconds
    pub refresh_token_expiry: i64,

    /// Issuer claim
    pub issuer: String,

    /// MAC algorithm for signing (default: HS512)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::from(DEFAULT_SECRET),
            fingerprint_key: String::from(DEFAULT_FINGERPRINT_KEY),
            access_token_expiry: 900,     // 15 minutes
            refresh_token_expiry: 604800, // 7 days
            issuer: String::from("rotor-auth"),
            algorithm: default_algorithm(),
        }
    }
}

impl JwtConfig {
    /// Create a new configuration with the given signing secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Set the refresh value fingerprint key
    pub fn with_fingerprint_key(mut self, key: impl Into<String>) -> Self {
        self.fingerprint_key = key.into();
        self
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days * 86400;
        self
    }

    /// Check if using default secrets (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET || self.fingerprint_key == DEFAULT_FINGERPRINT_KEY
    }
}

/// Session policy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Allow more than one active session head per principal
    #[serde(default)]
    pub allow_multiple_sessions: bool,

    /// Upper bound for each credential store call, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Random bytes drawn for each refresh value
    #[serde(default = "default_refresh_token_bytes")]
    pub refresh_token_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            allow_multiple_sessions: false,
            store_timeout_ms: default_store_timeout_ms(),
            refresh_token_bytes: default_refresh_token_bytes(),
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Token configuration
    pub jwt: JwtConfig,

    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
}

impl AuthConfig {
    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let jwt_defaults = JwtConfig::default();
        let session_defaults = SessionConfig::default();

        Self {
            jwt: JwtConfig {
                secret: std::env::var("JWT_SECRET").unwrap_or(jwt_defaults.secret),
                fingerprint_key: std::env::var("REFRESH_FINGERPRINT_KEY")
                    .unwrap_or(jwt_defaults.fingerprint_key),
                access_token_expiry: env_or("JWT_ACCESS_TOKEN_EXPIRY", jwt_defaults.access_token_expiry),
                refresh_token_expiry: env_or("JWT_REFRESH_TOKEN_EXPIRY", jwt_defaults.refresh_token_expiry),
                issuer: std::env::var("JWT_ISSUER").unwrap_or(jwt_defaults.issuer),
                algorithm: std::env::var("JWT_ALGORITHM").unwrap_or(jwt_defaults.algorithm),
            },
            session: SessionConfig {
                allow_multiple_sessions: env_or(
                    "SESSION_ALLOW_MULTIPLE",
                    session_defaults.allow_multiple_sessions,
                ),
                store_timeout_ms: env_or("STORE_TIMEOUT_MS", session_defaults.store_timeout_ms),
                refresh_token_bytes: env_or(
                    "REFRESH_TOKEN_BYTES",
                    session_defaults.refresh_token_bytes,
                ),
            },
        }
    }
}

/// Read and parse an environment variable, keeping the default on absence or parse failure
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn default_algorithm() -> String {
    String::from("HS512")
}

fn default_store_timeout_ms() -> u64 {
    3000
}

fn default_refresh_token_bytes() -> usize {
    32
}
