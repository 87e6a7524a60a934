//! Domain layer containing the credential entities.

pub mod entities;

// Re-export commonly used domain types
pub use entities::*;
