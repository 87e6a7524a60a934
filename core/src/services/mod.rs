//! Business services containing the credential lifecycle logic.

pub mod token;

// Re-export commonly used types
pub use token::{
    device_fingerprint_from_user_agent, DeauthorizeTarget, OpaqueTokenGenerator,
    RefreshFingerprinter, RequestContext, RetentionConfig, RetentionResult, RetentionService,
    SessionPolicy, TokenClass, TokenCodec, TokenLifecycleManager, TokenServiceConfig,
};
