//! Database configuration module

use serde::{Deserialize, Serialize};

use super::auth::env_or;

/// Database configuration for the MySQL credential store
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Connection timeout in seconds
    pub connect_timeout: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout: u64,

    /// Maximum lifetime of a connection in seconds
    pub max_lifetime: u64,

    /// Enable SQL statement logging
    #[serde(default)]
    pub enable_logging: bool,

    /// Slow query threshold in milliseconds
    #[serde(default = "default_slow_query_threshold")]
    pub slow_query_threshold: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::from("mysql://localhost:3306/rotor"),
            max_connections: 10,
            connect_timeout: 30,
            idle_timeout: 600,
            max_lifetime: 1800,
            enable_logging: false,
            slow_query_threshold: default_slow_query_threshold(),
        }
    }
}

impl DatabaseConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_env_or(Self::default())
    }

    /// Overlay environment variables onto a baseline configuration
    pub fn from_env_or(baseline: Self) -> Self {
        Self {
            url: std::env::var("DATABASE_URL").unwrap_or(baseline.url),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", baseline.max_connections),
            connect_timeout: env_or("DATABASE_CONNECT_TIMEOUT", baseline.connect_timeout),
            enable_logging: env_or("DATABASE_ENABLE_LOGGING", baseline.enable_logging),
            ..baseline
        }
    }

    /// Create a new database configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of connections
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable SQL statement logging
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }
}

fn default_slow_query_threshold() -> u64 {
    1000 // 1 second
}
