//! Configuration loading for infrastructure services
//!
//! Two entry points:
//! - [`load_config`] reads `.env` (if present) and then the process environment
//! - [`load_config_from_file`] layers a config file and `ROTOR__*` variables
//!   over the built-in defaults

use rotor_core::services::token::TokenServiceConfig;
use rotor_shared::config::AppConfig;

use crate::InfrastructureError;

/// Prefix for nested environment overrides, e.g. `ROTOR__AUTH__JWT__ISSUER`
pub const ENV_PREFIX: &str = "ROTOR";

/// Load configuration from `.env` and environment variables
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => return Err(InfrastructureError::Config(format!("Invalid .env file: {}", e))),
    }

    let config = AppConfig::from_env();
    warn_on_default_secrets(&config);
    Ok(config)
}

/// Load configuration from a file, overridable through `ROTOR__` variables
///
/// The format follows the file extension (`.toml`, `.json`, `.yaml`).
pub fn load_config_from_file(path: &str) -> Result<AppConfig, InfrastructureError> {
    let defaults = ::config::Config::try_from(&AppConfig::default()).map_err(config_error)?;

    let config: AppConfig = ::config::Config::builder()
        .add_source(defaults)
        .add_source(::config::File::with_name(path))
        .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .and_then(|settings| settings.try_deserialize())
        .map_err(config_error)?;

    tracing::info!(path, environment = %config.environment, "Loaded configuration file");
    warn_on_default_secrets(&config);
    Ok(config)
}

/// Validated token service configuration for the loaded application config
pub fn token_service_config(config: &AppConfig) -> Result<TokenServiceConfig, InfrastructureError> {
    TokenServiceConfig::from_auth_config(&config.auth)
        .map_err(|e| InfrastructureError::Config(e.to_string()))
}

fn warn_on_default_secrets(config: &AppConfig) {
    if config.auth.jwt.is_using_default_secret() {
        tracing::warn!(
            environment = %config.environment,
            "Using the built-in signing secret; set JWT_SECRET and REFRESH_FINGERPRINT_KEY"
        );
    }
}

fn config_error(err: ::config::ConfigError) -> InfrastructureError {
    InfrastructureError::Config(err.to_string())
}
