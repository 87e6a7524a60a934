//! Configuration module
//!
//! - `auth` - signing secret, fingerprint key, token lifetimes, session policy
//! - `database` - credential store connection and pool configuration
//! - `environment` - environment detection and logging configuration

pub mod auth;
pub mod database;
pub mod environment;

use serde::{Deserialize, Serialize};

pub use auth::{AuthConfig, JwtConfig, SessionConfig};
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Complete application configuration combining all sub-configurations
///
/// Loaded once at process start and treated as immutable afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Credential store configuration
    pub database: DatabaseConfig,

    /// Token and session configuration
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::new("mysql://localhost:3306/rotor_dev"),
            auth: AuthConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig::new("mysql://prod-db:3306/rotor").with_max_connections(50),
            auth: AuthConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Load configuration from environment variables
    ///
    /// The environment picks the baseline, then the auth, database and
    /// logging sections are read from their variables.
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        let baseline = match environment {
            Environment::Production => Self::production(),
            Environment::Development | Environment::Staging => Self::development(),
        };

        Self {
            environment,
            database: DatabaseConfig::from_env_or(baseline.database),
            auth: AuthConfig::from_env(),
            logging: LoggingConfig::from_env_or(LoggingConfig::for_environment(environment)),
        }
    }
}
