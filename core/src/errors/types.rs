//! Tagged error kinds for the credential lifecycle and the credential store.
//!
//! Callers dispatch on these variants, never on the rendered message.

use rotor_shared::errors::{error_codes, ErrorResponse, IntoErrorResponse};
use thiserror::Error;

/// Closed set of lifecycle outcomes surfaced to the caller
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenError {
    /// Bad signature, expired token, disallowed algorithm or broken pairing
    #[error("Invalid credential")]
    InvalidCredential,

    /// Refresh value not recognized
    #[error("Unknown refresh token")]
    UnknownToken,

    /// Presented device differs from the one bound at issuance; the family was revoked
    #[error("Device mismatch, session revoked")]
    DeviceMismatch,

    /// An already-consumed refresh value was presented; the family was revoked
    #[error("Refresh token reuse detected, session revoked")]
    ReplayDetected,

    /// The session was already ended
    #[error("Session deauthorized")]
    Deauthorized,

    /// An active session already exists for the principal
    #[error("Credentials already issued")]
    AlreadyIssued,

    /// The credential store failed or did not answer before the deadline
    #[error("Credential store unavailable")]
    StoreUnavailable,
}

impl TokenError {
    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            TokenError::InvalidCredential => error_codes::INVALID_CREDENTIAL,
            TokenError::UnknownToken => error_codes::UNKNOWN_TOKEN,
            TokenError::DeviceMismatch => error_codes::DEVICE_MISMATCH,
            TokenError::ReplayDetected => error_codes::REPLAY_DETECTED,
            TokenError::Deauthorized => error_codes::DEAUTHORIZED,
            TokenError::AlreadyIssued => error_codes::ALREADY_ISSUED,
            TokenError::StoreUnavailable => error_codes::STORE_UNAVAILABLE,
        }
    }

    /// The whole family was revoked; the caller must force a logout
    pub fn forces_logout(&self) -> bool {
        matches!(self, TokenError::DeviceMismatch | TokenError::ReplayDetected)
    }

    /// Safe for the caller to retry the whole operation with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, TokenError::StoreUnavailable)
    }
}

impl IntoErrorResponse for TokenError {
    fn to_error_response(&self) -> ErrorResponse {
        let response = ErrorResponse::new(self.error_code(), self.to_string());
        if self.forces_logout() {
            response.add_detail("force_logout", true)
        } else if self.is_retryable() {
            response.add_detail("retryable", true)
        } else {
            response
        }
    }
}

impl From<TokenError> for ErrorResponse {
    fn from(err: TokenError) -> Self {
        err.to_error_response()
    }
}

/// Failures reported by a credential store implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record with the same lookup fingerprint already exists
    #[error("Refresh token fingerprint already stored: {fingerprint}")]
    Conflict { fingerprint: String },

    /// The backing store failed
    #[error("Credential store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Shorthand for [`StoreError::Unavailable`]
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }
}
