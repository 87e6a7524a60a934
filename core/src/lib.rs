//! # Rotor Core
//!
//! Core domain layer for paired credential issuance and rotation.
//! This crate contains the refresh token entities, the credential store port,
//! the token lifecycle services and the error taxonomy callers dispatch on.
//! Persistence adapters live in `rotor_infra`.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod errors;

// Re-export commonly used types for convenience
pub use domain::entities::{
    AccessClaims, CredentialPair, RefreshToken, SessionInfo, TokenState,
};
pub use services::{
    device_fingerprint_from_user_agent, DeauthorizeTarget, RequestContext, RetentionConfig,
    RetentionService, TokenLifecycleManager, TokenServiceConfig,
};
pub use repositories::*;
pub use errors::*;
