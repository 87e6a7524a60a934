//! Token lifecycle manager: issuance, rotation, reuse detection and revocation

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::domain::entities::token::{
    fingerprint_prefix, CredentialPair, RefreshToken, SessionInfo, TokenState,
    MAX_OWNER_GUID_LEN,
};
use crate::errors::{DomainError, TokenError};
use crate::repositories::{ConsumeOutcome, CredentialStore};

use super::codec::TokenCodec;
use super::config::TokenServiceConfig;
use super::context::RequestContext;
use super::fingerprint::RefreshFingerprinter;
use super::generator::OpaqueTokenGenerator;
use super::policy::{SessionPolicy, TokenClass};

/// What a deauthorization call identifies the family by
#[derive(Clone, Copy)]
pub enum DeauthorizeTarget<'a> {
    /// The principal GUID itself
    Principal(&'a str),
    /// Any refresh value of the family, in any state
    RefreshValue(&'a str),
    /// A signed token that is still within its validity window
    SignedToken(&'a str),
}

impl std::fmt::Debug for DeauthorizeTarget<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeauthorizeTarget::Principal(guid) => f.debug_tuple("Principal").field(guid).finish(),
            DeauthorizeTarget::RefreshValue(_) => f.write_str("RefreshValue(<redacted>)"),
            DeauthorizeTarget::SignedToken(_) => f.write_str("SignedToken(<redacted>)"),
        }
    }
}

/// State machine over refresh token records
///
/// Holds no mutable state of its own. Every concurrency guarantee comes from
/// the atomic `try_consume` and `revoke_family` of the store, so one instance
/// can be shared across tasks behind an `Arc`. Store failures are never
/// retried here.
pub struct TokenLifecycleManager<S: CredentialStore> {
    store: S,
    codec: TokenCodec,
    generator: OpaqueTokenGenerator,
    policy: SessionPolicy,
    store_timeout: std::time::Duration,
}

impl<S: CredentialStore> TokenLifecycleManager<S> {
    /// Creates a manager over `store`
    ///
    /// # Arguments
    ///
    /// * `store` - Credential store implementation
    /// * `config` - Service configuration; validated here
    ///
    /// # Returns
    ///
    /// The manager, or `DomainError::Configuration` for an unusable config
    pub fn new(store: S, config: TokenServiceConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let fingerprinter = RefreshFingerprinter::new(config.fingerprint_key.as_bytes())?;
        let generator = OpaqueTokenGenerator::new(config.refresh_token_bytes)?;

        info!(
            algorithm = ?config.algorithm,
            issuer = %config.issuer,
            allow_multiple_sessions = config.allow_multiple_sessions,
            "Token lifecycle manager initialized"
        );

        Ok(Self {
            codec: TokenCodec::new(&config, fingerprinter),
            policy: SessionPolicy::from_config(&config),
            store_timeout: config.store_timeout,
            generator,
            store,
        })
    }

    /// Context carrying the configured default store deadline
    pub fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.store_timeout)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Issues a fresh credential pair to an authenticated principal
    ///
    /// # Errors
    ///
    /// * `InvalidCredential` - Empty GUID or one longer than `MAX_OWNER_GUID_LEN`
    /// * `AlreadyIssued` - Single-session mode and an active session exists
    /// * `StoreUnavailable` - Store failure or deadline
    ///
    /// Only a fixed-length digest of `device_fingerprint` is recorded, so
    /// arbitrarily long User-Agent strings are accepted.
    ///
    /// The active-session count and the insert are two calls; two concurrent
    /// issues for the same principal may both succeed in single-session mode.
    pub async fn issue(
        &self,
        guid: &str,
        device_fingerprint: &str,
        ctx: &RequestContext,
    ) -> Result<CredentialPair, TokenError> {
        if guid.is_empty() || guid.len() > MAX_OWNER_GUID_LEN {
            warn!(guid_len = guid.len(), "Refusing to issue: unusable principal GUID");
            return Err(TokenError::InvalidCredential);
        }

        let active = ctx
            .bounded("count_active_for", self.store.count_active_for(guid))
            .await?;
        if !self.policy.allows_new_session(active) {
            info!(guid, active, "Refusing to issue: active session exists");
            return Err(TokenError::AlreadyIssued);
        }

        let refresh_value = self.generator.generate();
        let fingerprint = self.codec.fingerprinter().fingerprint(&refresh_value);

        // Mint before touching the store so a signing failure leaves no record
        let signed_token = self.mint(guid, &fingerprint)?;

        let record = RefreshToken::new(
            guid,
            fingerprint,
            self.policy.device_key(device_fingerprint),
            self.policy.ttl_for(TokenClass::Refresh),
        );
        let log_id = record.log_id().to_string();
        ctx.bounded("insert", self.store.insert(record)).await?;

        info!(guid, token = %log_id, "Issued credential pair");

        Ok(self.pair(signed_token, refresh_value))
    }

    /// Exchanges a refresh value (with its paired signed token) for a new pair
    ///
    /// The presented refresh value is consumed exactly once. Presenting it
    /// again revokes the whole family, as does a request from another device.
    pub async fn rotate(
        &self,
        refresh_value: &str,
        signed_token: &str,
        device_fingerprint: &str,
        ctx: &RequestContext,
    ) -> Result<CredentialPair, TokenError> {
        let guid = self.codec.verify(signed_token, refresh_value)?;
        let fingerprint = self.codec.fingerprinter().fingerprint(refresh_value);

        let record = self.load(&fingerprint, &guid, ctx).await?;

        let presented_device = self.policy.device_key(device_fingerprint);
        if !self
            .policy
            .device_fingerprints_match(&record.device_fingerprint, &presented_device)
        {
            let revoked = self.revoke_family(&record.owner_guid, ctx).await?;
            warn!(
                guid = %record.owner_guid,
                token = %record.log_id(),
                revoked,
                "Device mismatch on rotation, family revoked"
            );
            return Err(TokenError::DeviceMismatch);
        }

        if record.state == TokenState::Revoked {
            debug!(guid = %record.owner_guid, token = %record.log_id(), "Rotation on revoked token");
            return Err(TokenError::Deauthorized);
        }

        if record.is_expired() {
            debug!(guid = %record.owner_guid, token = %record.log_id(), "Rotation on expired token");
            return Err(TokenError::InvalidCredential);
        }

        let successor_value = self.generator.generate();
        let successor_fingerprint = self.codec.fingerprinter().fingerprint(&successor_value);
        let successor_token = self.mint(&record.owner_guid, &successor_fingerprint)?;
        let successor = record.successor(
            successor_fingerprint,
            self.policy.ttl_for(TokenClass::Refresh),
        );
        let successor_id = successor.log_id().to_string();

        let outcome = ctx
            .bounded(
                "consume_and_replace",
                self.store.consume_and_replace(&fingerprint, successor),
            )
            .await?;

        match outcome {
            ConsumeOutcome::Consumed => {
                info!(
                    guid = %record.owner_guid,
                    from = %record.log_id(),
                    to = %successor_id,
                    "Rotated refresh token"
                );
                Ok(self.pair(successor_token, successor_value))
            }
            ConsumeOutcome::AlreadyConsumed => {
                let revoked = self.revoke_family(&record.owner_guid, ctx).await?;
                warn!(
                    guid = %record.owner_guid,
                    token = %record.log_id(),
                    revoked,
                    "Refresh token reuse detected, family revoked"
                );
                Err(TokenError::ReplayDetected)
            }
            ConsumeOutcome::Revoked => {
                debug!(guid = %record.owner_guid, token = %record.log_id(), "Revoked during rotation");
                Err(TokenError::Deauthorized)
            }
            ConsumeOutcome::NotFound => Err(TokenError::UnknownToken),
        }
    }

    /// Ends every session of a family
    ///
    /// # Returns
    ///
    /// Number of records newly revoked; 0 for a family that was already revoked
    pub async fn deauthorize(
        &self,
        target: DeauthorizeTarget<'_>,
        ctx: &RequestContext,
    ) -> Result<u64, TokenError> {
        let owner = match target {
            DeauthorizeTarget::Principal(guid) => guid.to_string(),
            DeauthorizeTarget::RefreshValue(value) => {
                let fingerprint = self.codec.fingerprinter().fingerprint(value);
                self.find(&fingerprint, ctx)
                    .await?
                    .ok_or(TokenError::UnknownToken)?
                    .owner_guid
            }
            DeauthorizeTarget::SignedToken(token) => {
                let claims = self.codec.decode(token)?;
                let record = self
                    .find(&claims.rfp, ctx)
                    .await?
                    .ok_or(TokenError::UnknownToken)?;
                if record.owner_guid != claims.sub {
                    return Err(TokenError::InvalidCredential);
                }
                record.owner_guid
            }
        };

        let revoked = self.revoke_family(&owner, ctx).await?;
        info!(guid = %owner, revoked, "Family deauthorized");
        Ok(revoked)
    }

    /// Checks a pair without consuming anything
    ///
    /// Runs the signature, lookup and state checks of a rotation. Consumed and
    /// expired records are reported as `InvalidCredential`, so validation
    /// never triggers a revocation.
    pub async fn validate_pair(
        &self,
        signed_token: &str,
        refresh_value: &str,
        ctx: &RequestContext,
    ) -> Result<SessionInfo, TokenError> {
        let guid = self.codec.verify(signed_token, refresh_value)?;
        let fingerprint = self.codec.fingerprinter().fingerprint(refresh_value);

        let record = self.load(&fingerprint, &guid, ctx).await?;

        match record.state {
            TokenState::Revoked => Err(TokenError::Deauthorized),
            TokenState::Consumed => Err(TokenError::InvalidCredential),
            TokenState::Active if record.is_expired() => Err(TokenError::InvalidCredential),
            TokenState::Active => Ok(SessionInfo::from(&record)),
        }
    }

    async fn find(
        &self,
        fingerprint: &str,
        ctx: &RequestContext,
    ) -> Result<Option<RefreshToken>, TokenError> {
        let record = ctx
            .bounded("lookup_by_fingerprint", self.store.lookup_by_fingerprint(fingerprint))
            .await?;
        debug!(token = %fingerprint_prefix(fingerprint), found = record.is_some(), "Looked up refresh token");
        Ok(record)
    }

    /// Looks up the record a verified signed token points at
    async fn load(
        &self,
        fingerprint: &str,
        guid: &str,
        ctx: &RequestContext,
    ) -> Result<RefreshToken, TokenError> {
        let record = self
            .find(fingerprint, ctx)
            .await?
            .ok_or(TokenError::UnknownToken)?;

        if record.owner_guid != guid {
            warn!(
                guid,
                owner = %record.owner_guid,
                token = %record.log_id(),
                "Signed token subject does not own the refresh token"
            );
            return Err(TokenError::InvalidCredential);
        }

        Ok(record)
    }

    async fn revoke_family(&self, owner_guid: &str, ctx: &RequestContext) -> Result<u64, TokenError> {
        ctx.bounded("revoke_family", self.store.revoke_family(owner_guid))
            .await
    }

    fn mint(&self, guid: &str, paired_fingerprint: &str) -> Result<String, TokenError> {
        self.codec
            .issue_for_fingerprint(guid, paired_fingerprint, self.policy.ttl_for(TokenClass::Access))
    }

    fn pair(&self, signed_token: String, refresh_value: String) -> CredentialPair {
        CredentialPair::new(
            signed_token,
            refresh_value,
            self.policy.ttl_for(TokenClass::Access),
            self.policy.ttl_for(TokenClass::Refresh),
        )
    }

    /// Lifetime of newly issued signed tokens
    pub fn access_token_ttl(&self) -> Duration {
        self.policy.ttl_for(TokenClass::Access)
    }
}
