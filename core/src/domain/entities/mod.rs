//! Domain entities representing persisted and issued credentials.

pub mod token;


// Re-export commonly used types
pub use token::{
    fingerprint_prefix, AccessClaims, CredentialPair, RefreshToken, SessionInfo, TokenState,
    DEFAULT_ACCESS_TOKEN_TTL_SECONDS, DEFAULT_ISSUER, DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
};
