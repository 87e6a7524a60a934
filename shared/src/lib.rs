//! Shared configuration and response types for the Rotor workspace
//!
//! This crate provides functionality used by both the core and the
//! infrastructure layer:
//! - Configuration types (auth, database, environment/logging)
//! - The serializable error response handed to request-handling collaborators

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, DatabaseConfig, Environment, JwtConfig, LogFormat, LoggingConfig,
    SessionConfig,
};
pub use errors::{error_codes, ErrorResponse, IntoErrorResponse};
