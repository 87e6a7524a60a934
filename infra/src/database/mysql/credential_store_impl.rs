//! MySQL implementation of the CredentialStore trait.
//!
//! Refresh token records live in the `refresh_tokens` table, keyed by the
//! unique `lookup_fingerprint`. The `Active -> Consumed` transition is a
//! single conditional `UPDATE`, and family revocation is a single `UPDATE`
//! over the owner's rows, so concurrent rotations are serialized by the
//! database rather than by this process.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlConnection, MySqlPool, Row};
use uuid::Uuid;

use rotor_core::domain::entities::token::{fingerprint_prefix, RefreshToken, TokenState};
use rotor_core::errors::StoreError;
use rotor_core::repositories::{ConsumeOutcome, CredentialStore};

const SELECT_TOKEN: &str = r#"
    SELECT id, lookup_fingerprint, owner_guid, device_fingerprint, issued_at, expires_at, state
    FROM refresh_tokens
    WHERE lookup_fingerprint = ?
    LIMIT 1
"#;

const INSERT_TOKEN: &str = r#"
    INSERT INTO refresh_tokens (
        id, lookup_fingerprint, owner_guid, device_fingerprint, issued_at, expires_at, state
    ) VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

/// MySQL implementation of CredentialStore
pub struct MySqlCredentialStore {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlCredentialStore {
    /// Create a new MySQL credential store
    ///
    /// # Arguments
    /// * `pool` - MySQL connection pool from SQLx
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert database row to RefreshToken entity
    fn row_to_token(row: &MySqlRow) -> Result<RefreshToken, StoreError> {
        let id: String = row.try_get("id").map_err(|e| column_error("id", e))?;
        let state: String = row.try_get("state").map_err(|e| column_error("state", e))?;

        Ok(RefreshToken {
            id: Uuid::parse_str(&id)
                .map_err(|e| StoreError::unavailable(format!("Invalid token UUID: {}", e)))?,
            lookup_fingerprint: row
                .try_get("lookup_fingerprint")
                .map_err(|e| column_error("lookup_fingerprint", e))?,
            owner_guid: row
                .try_get("owner_guid")
                .map_err(|e| column_error("owner_guid", e))?,
            device_fingerprint: row
                .try_get("device_fingerprint")
                .map_err(|e| column_error("device_fingerprint", e))?,
            issued_at: row
                .try_get::<DateTime<Utc>, _>("issued_at")
                .map_err(|e| column_error("issued_at", e))?,
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .map_err(|e| column_error("expires_at", e))?,
            state: parse_state(&state)?,
        })
    }

    async fn insert_on(conn: &mut MySqlConnection, token: &RefreshToken) -> Result<(), StoreError> {
        sqlx::query(INSERT_TOKEN)
            .bind(token.id.to_string())
            .bind(&token.lookup_fingerprint)
            .bind(&token.owner_guid)
            .bind(&token.device_fingerprint)
            .bind(token.issued_at)
            .bind(token.expires_at)
            .bind(token.state.as_str())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict {
                        fingerprint: token.lookup_fingerprint.clone(),
                    }
                } else {
                    query_error("insert refresh token", e)
                }
            })?;

        Ok(())
    }

    /// Conditional `Active -> Consumed` update, then a state read if it missed
    async fn consume_on(
        conn: &mut MySqlConnection,
        fingerprint: &str,
    ) -> Result<ConsumeOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET state = 'consumed', consumed_at = ?
            WHERE lookup_fingerprint = ? AND state = 'active'
            "#,
        )
        .bind(Utc::now())
        .bind(fingerprint)
        .execute(&mut *conn)
        .await
        .map_err(|e| query_error("consume refresh token", e))?;

        if result.rows_affected() == 1 {
            return Ok(ConsumeOutcome::Consumed);
        }

        // Locking read: inside a transaction a plain SELECT could see a stale snapshot
        let state: Option<String> = sqlx::query_scalar(
            "SELECT state FROM refresh_tokens WHERE lookup_fingerprint = ? LOCK IN SHARE MODE",
        )
        .bind(fingerprint)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| query_error("read refresh token state", e))?;

        let state = state.map(|s| parse_state(&s)).transpose()?;
        outcome_for_missed_consume(state)
    }
}

#[async_trait]
impl CredentialStore for MySqlCredentialStore {
    async fn lookup_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<RefreshToken>, StoreError> {
        let row = sqlx::query(SELECT_TOKEN)
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("find refresh token", e))?;

        row.as_ref().map(Self::row_to_token).transpose()
    }

    async fn insert(&self, token: RefreshToken) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| query_error("acquire connection", e))?;

        Self::insert_on(&mut conn, &token).await
    }

    async fn try_consume(&self, fingerprint: &str) -> Result<ConsumeOutcome, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| query_error("acquire connection", e))?;

        Self::consume_on(&mut conn, fingerprint).await
    }

    async fn revoke_family(&self, owner_guid: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET state = 'revoked', revoked_at = ?
            WHERE owner_guid = ? AND state <> 'revoked'
            "#,
        )
        .bind(Utc::now())
        .bind(owner_guid)
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("revoke token family", e))?;

        Ok(result.rows_affected())
    }

    async fn count_active_for(&self, owner_guid: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM refresh_tokens
            WHERE owner_guid = ? AND state = 'active' AND expires_at > ?
            "#,
        )
        .bind(owner_guid)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| query_error("count active tokens", e))?;

        Ok(count.max(0) as u64)
    }

    /// Consume and insert the successor in one transaction
    ///
    /// Dropping the transaction on any error rolls the consume back, so a
    /// cancelled rotation never strands the family without an active token.
    async fn consume_and_replace(
        &self,
        fingerprint: &str,
        successor: RefreshToken,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| query_error("begin transaction", e))?;

        let outcome = Self::consume_on(&mut tx, fingerprint).await?;
        if outcome != ConsumeOutcome::Consumed {
            tx.rollback()
                .await
                .map_err(|e| query_error("rollback transaction", e))?;
            return Ok(outcome);
        }

        Self::insert_on(&mut tx, &successor).await?;
        tx.commit()
            .await
            .map_err(|e| query_error("commit rotation", e))?;

        tracing::debug!(
            from = %fingerprint_prefix(fingerprint),
            to = %successor.log_id(),
            "Committed refresh token rotation"
        );
        Ok(outcome)
    }

    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at < ?
                OR (state = 'revoked' AND issued_at < ?)
            "#,
        )
        .bind(cutoff)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("prune refresh tokens", e))?;

        Ok(result.rows_affected())
    }
}

fn parse_state(value: &str) -> Result<TokenState, StoreError> {
    TokenState::from_str(value).map_err(StoreError::unavailable)
}

/// Outcome of a conditional consume that updated no row
fn outcome_for_missed_consume(state: Option<TokenState>) -> Result<ConsumeOutcome, StoreError> {
    match state {
        None => Ok(ConsumeOutcome::NotFound),
        Some(TokenState::Consumed) => Ok(ConsumeOutcome::AlreadyConsumed),
        Some(TokenState::Revoked) => Ok(ConsumeOutcome::Revoked),
        // Active rows always match the update
        Some(TokenState::Active) => Err(StoreError::unavailable(
            "refresh token still active after conditional consume",
        )),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn column_error(column: &str, err: sqlx::Error) -> StoreError {
    StoreError::unavailable(format!("Failed to get {}: {}", column, err))
}

fn query_error(action: &str, err: sqlx::Error) -> StoreError {
    tracing::error!("Failed to {}: {}", action, err);
    StoreError::unavailable(format!("Failed to {}: {}", action, err))
}
