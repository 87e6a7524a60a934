//! Deterministic keyed fingerprints of refresh values

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::DomainError;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over refresh values, hex encoded
///
/// The same value always maps to the same fingerprint, so it can serve as the
/// indexed lookup key. The key is independent of the signing secret.
#[derive(Clone)]
pub struct RefreshFingerprinter {
    mac: HmacSha256,
}

impl RefreshFingerprinter {
    /// Creates a fingerprinter keyed with `key`
    pub fn new(key: &[u8]) -> Result<Self, DomainError> {
        if key.is_empty() {
            return Err(DomainError::configuration("fingerprint key must not be empty"));
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|e| DomainError::Internal {
            message: format!("invalid fingerprint key: {}", e),
        })?;
        Ok(Self { mac })
    }

    /// Fingerprint of a refresh value
    pub fn fingerprint(&self, refresh_value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(refresh_value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check that `fingerprint` belongs to `refresh_value`
    pub fn matches(&self, refresh_value: &str, fingerprint: &str) -> bool {
        let expected = self.fingerprint(refresh_value);
        constant_time_eq::constant_time_eq(expected.as_bytes(), fingerprint.as_bytes())
    }
}

impl std::fmt::Debug for RefreshFingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshFingerprinter").finish_non_exhaustive()
    }
}
