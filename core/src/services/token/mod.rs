//! Token services for paired credential issuance and rotation
//!
//! This module handles:
//! - Signed access token minting and verification
//! - Opaque refresh value generation and fingerprinting
//! - The refresh token lifecycle (issue, rotate, deauthorize, validate)
//! - Background pruning of dead refresh token records

mod codec;
mod config;
mod context;
mod fingerprint;
mod generator;
mod policy;
mod retention;
mod service;

#[cfg(test)]
mod tests;

pub use codec::TokenCodec;
pub use config::{
    TokenServiceConfig, ALLOWED_ALGORITHMS, MAX_ACCESS_TOKEN_TTL_SECONDS,
    MAX_REFRESH_TOKEN_TTL_SECONDS, MIN_REFRESH_TOKEN_BYTES,
};
pub use context::RequestContext;
pub use fingerprint::RefreshFingerprinter;
pub use generator::OpaqueTokenGenerator;
pub use policy::{device_fingerprint_from_user_agent, SessionPolicy, TokenClass};
pub use retention::{RetentionConfig, RetentionResult, RetentionService};
pub use service::{DeauthorizeTarget, TokenLifecycleManager};
