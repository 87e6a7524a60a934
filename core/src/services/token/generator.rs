//! Opaque refresh value generation

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::errors::DomainError;

use super::config::MIN_REFRESH_TOKEN_BYTES;

/// Draws refresh values from the operating system's CSPRNG
#[derive(Debug, Clone, Copy)]
pub struct OpaqueTokenGenerator {
    byte_length: usize,
}

impl OpaqueTokenGenerator {
    /// Creates a generator producing `byte_length` random bytes per value
    ///
    /// # Errors
    ///
    /// `DomainError::Configuration` if `byte_length` is below 32
    pub fn new(byte_length: usize) -> Result<Self, DomainError> {
        if byte_length < MIN_REFRESH_TOKEN_BYTES {
            return Err(DomainError::configuration(format!(
                "refresh tokens need at least {} random bytes, got {}",
                MIN_REFRESH_TOKEN_BYTES, byte_length
            )));
        }
        Ok(Self { byte_length })
    }

    /// Random bytes per value
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Generates a URL-safe base64 refresh value
    ///
    /// # Panics
    ///
    /// Panics if the operating system random source fails. Weak randomness is
    /// never substituted.
    pub fn generate(&self) -> String {
        let mut bytes = vec![0u8; self.byte_length];
        if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
            tracing::error!("Secure random source unavailable: {}", e);
            panic!("secure random source unavailable: {}", e);
        }
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

impl Default for OpaqueTokenGenerator {
    fn default() -> Self {
        Self {
            byte_length: MIN_REFRESH_TOKEN_BYTES,
        }
    }
}
