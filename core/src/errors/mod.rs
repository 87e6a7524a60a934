//! Domain-specific error types and error handling.

mod types;


pub use types::{StoreError, TokenError};

use thiserror::Error;

/// Core domain errors (construction and bridging)
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Shorthand for [`DomainError::Configuration`]
    pub fn configuration(message: impl Into<String>) -> Self {
        DomainError::Configuration {
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
