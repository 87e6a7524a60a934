//! Token entities for paired credential issuance.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token lifetime (15 minutes)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;

/// Refresh token absolute lifetime (7 days)
pub const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Issuer written into every access token
pub const DEFAULT_ISSUER: &str = "rotor-auth";

/// Longest principal GUID the store columns accept
pub const MAX_OWNER_GUID_LEN: usize = 128;

/// Characters of the lookup fingerprint used when a record is named in logs
const LOG_PREFIX_LEN: usize = 12;

/// State of a persisted refresh token
///
/// `Active -> Consumed` happens exactly once, on a successful rotation.
/// `Revoked` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenState {
    Active,
    Consumed,
    Revoked,
}

impl TokenState {
    /// Storage representation of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenState::Active => "active",
            TokenState::Consumed => "consumed",
            TokenState::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TokenState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TokenState::Active),
            "consumed" => Ok(TokenState::Consumed),
            "revoked" => Ok(TokenState::Revoked),
            other => Err(format!("Unknown token state: {}", other)),
        }
    }
}

/// Claims carried by the signed access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (principal GUID)
    pub sub: String,

    /// Lookup fingerprint of the refresh value this token was paired with
    pub rfp: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Not before timestamp
    pub nbf: i64,

    /// Issuer
    pub iss: String,

    /// JWT ID (unique identifier for the token)
    pub jti: String,
}

impl AccessClaims {
    /// Creates claims valid from now for `ttl`
    ///
    /// # Arguments
    ///
    /// * `guid` - The principal's GUID
    /// * `paired_fingerprint` - Lookup fingerprint of the paired refresh value
    /// * `issuer` - Issuer claim
    /// * `ttl` - Lifetime of the token
    pub fn new(guid: &str, paired_fingerprint: &str, issuer: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        let exp = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            sub: guid.to_string(),
            rfp: paired_fingerprint.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: issuer.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Checks `not_before <= now < expires_at`
    pub fn is_valid(&self) -> bool {
        let now = Utc::now().timestamp();
        now >= self.nbf && now < self.exp
    }
}

/// Refresh token record stored by the credential store
///
/// The raw refresh value is never part of the record; only its keyed
/// lookup fingerprint is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Unique identifier for the record
    pub id: Uuid,

    /// Deterministic keyed digest of the refresh value
    pub lookup_fingerprint: String,

    /// Principal GUID; the family key
    pub owner_guid: String,

    /// Fingerprint of the device that obtained the session
    pub device_fingerprint: String,

    /// Timestamp when the token was issued
    pub issued_at: DateTime<Utc>,

    /// Timestamp when the token expires
    pub expires_at: DateTime<Utc>,

    /// Lifecycle state
    pub state: TokenState,
}

impl RefreshToken {
    /// Creates a new active refresh token record
    ///
    /// # Arguments
    ///
    /// * `owner_guid` - The principal's GUID
    /// * `lookup_fingerprint` - Keyed digest of the refresh value
    /// * `device_fingerprint` - Fingerprint of the issuing device
    /// * `lifetime` - Absolute lifetime of the refresh token
    pub fn new(
        owner_guid: impl Into<String>,
        lookup_fingerprint: impl Into<String>,
        device_fingerprint: impl Into<String>,
        lifetime: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            lookup_fingerprint: lookup_fingerprint.into(),
            owner_guid: owner_guid.into(),
            device_fingerprint: device_fingerprint.into(),
            issued_at: now,
            expires_at: now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC),
            state: TokenState::Active,
        }
    }

    /// Creates the successor record of a rotation: same owner, same device
    pub fn successor(&self, lookup_fingerprint: impl Into<String>, lifetime: Duration) -> Self {
        Self::new(
            self.owner_guid.clone(),
            lookup_fingerprint,
            self.device_fingerprint.clone(),
            lifetime,
        )
    }

    /// Checks if the refresh token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Active and not expired
    pub fn is_usable(&self) -> bool {
        self.state == TokenState::Active && !self.is_expired()
    }

    /// Short fingerprint prefix for log lines
    pub fn log_id(&self) -> &str {
        fingerprint_prefix(&self.lookup_fingerprint)
    }

    /// Gets the time remaining until expiration, or zero if expired
    pub fn time_until_expiration(&self) -> Duration {
        let now = Utc::now();
        if self.expires_at > now {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }
}

/// Short prefix of a fingerprint, safe to log
pub fn fingerprint_prefix(fingerprint: &str) -> &str {
    let end = fingerprint
        .char_indices()
        .nth(LOG_PREFIX_LEN)
        .map(|(idx, _)| idx)
        .unwrap_or(fingerprint.len());
    &fingerprint[..end]
}

/// Credential pair returned to the caller
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    /// Signed access token
    pub signed_token: String,

    /// Opaque refresh value
    pub refresh_value: String,

    /// Access token expiry time in seconds
    pub access_expires_in: i64,

    /// Refresh token expiry time in seconds
    pub refresh_expires_in: i64,
}

impl CredentialPair {
    /// Creates a new credential pair
    pub fn new(
        signed_token: String,
        refresh_value: String,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            signed_token,
            refresh_value,
            access_expires_in: access_ttl.num_seconds(),
            refresh_expires_in: refresh_ttl.num_seconds(),
        }
    }
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("signed_token", &"<redacted>")
            .field("refresh_value", &"<redacted>")
            .field("access_expires_in", &self.access_expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .finish()
    }
}

/// Session confirmed by a read-only pair validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Principal GUID
    pub guid: String,

    /// Device the session is bound to
    pub device_fingerprint: String,

    /// When the refresh token was issued
    pub issued_at: DateTime<Utc>,

    /// When the refresh token expires
    pub expires_at: DateTime<Utc>,
}

impl From<&RefreshToken> for SessionInfo {
    fn from(record: &RefreshToken) -> Self {
        Self {
            guid: record.owner_guid.clone(),
            device_fingerprint: record.device_fingerprint.clone(),
            issued_at: record.issued_at,
            expires_at: record.expires_at,
        }
    }
}
