//! Signed access token codec
//!
//! Pure and stateless: no I/O, no clock other than `Utc::now()`.

use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::domain::entities::token::AccessClaims;
use crate::errors::TokenError;

use super::config::TokenServiceConfig;
use super::fingerprint::RefreshFingerprinter;

/// Mints and verifies access tokens paired with a refresh value
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    issuer: String,
    fingerprinter: RefreshFingerprinter,
}

impl TokenCodec {
    /// Creates a codec from the service configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated service configuration (secret, algorithm, issuer)
    /// * `fingerprinter` - Fingerprinter shared with the credential store lookups
    pub fn new(config: &TokenServiceConfig, fingerprinter: RefreshFingerprinter) -> Self {
        let secret = config.signing_secret.as_bytes();

        // `Validation::new` pins the allow-list to the configured algorithm
        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            header: Header::new(config.algorithm),
            validation,
            issuer: config.issuer.clone(),
            fingerprinter,
        }
    }

    /// Mints a token for `guid` paired with `paired_refresh_value`
    ///
    /// The token carries the refresh value's fingerprint, never the value.
    pub fn issue(
        &self,
        guid: &str,
        paired_refresh_value: &str,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let fingerprint = self.fingerprinter.fingerprint(paired_refresh_value);
        self.issue_for_fingerprint(guid, &fingerprint, ttl)
    }

    /// Mints a token for a refresh value whose fingerprint is already known
    pub(crate) fn issue_for_fingerprint(
        &self,
        guid: &str,
        paired_fingerprint: &str,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims::new(guid, paired_fingerprint, &self.issuer, ttl);
        self.encode_claims(&claims)
    }

    /// Signs arbitrary claims with the process key
    pub(crate) fn encode_claims(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        encode(&self.header, claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign access token: {}", e);
            TokenError::InvalidCredential
        })
    }

    /// Verifies signature, algorithm, issuer, validity window and pairing
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The principal GUID
    /// * `Err(TokenError::InvalidCredential)` - Any check failed
    pub fn verify(
        &self,
        signed_token: &str,
        expected_paired_refresh_value: &str,
    ) -> Result<String, TokenError> {
        let claims = self.decode(signed_token)?;

        if !self
            .fingerprinter
            .matches(expected_paired_refresh_value, &claims.rfp)
        {
            tracing::debug!("Access token is paired with a different refresh token");
            return Err(TokenError::InvalidCredential);
        }

        Ok(claims.sub)
    }

    /// Verifies everything except pairing and returns the claims
    pub fn decode(&self, signed_token: &str) -> Result<AccessClaims, TokenError> {
        let token_data = decode::<AccessClaims>(signed_token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("Access token rejected: {:?}", e.kind());
                TokenError::InvalidCredential
            })?;

        // jsonwebtoken accepts `now == exp`; the window here is half-open
        if !token_data.claims.is_valid() {
            return Err(TokenError::InvalidCredential);
        }

        Ok(token_data.claims)
    }

    /// Fingerprinter used for pairing
    pub fn fingerprinter(&self) -> &RefreshFingerprinter {
        &self.fingerprinter
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.header.alg)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
