//! PostgreSQL implementation of the webhook idempotency ledger.
//!
//! One row per gateway event id, keyed by the id itself. `claim` is a
//! lookup followed by `INSERT ... ON CONFLICT DO NOTHING`; the primary
//! key is what turns two concurrent deliveries of the same event into
//! exactly one winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{ClaimOutcome, LedgerEntry, WebhookLedger};

/// PostgreSQL implementation of [`WebhookLedger`].
#[derive(Clone)]
pub struct PostgresWebhookLedger {
    pool: PgPool,
}

impl PostgresWebhookLedger {
    /// Creates a new PostgresWebhookLedger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookLedger for PostgresWebhookLedger {
    async fn claim(&self, entry: LedgerEntry) -> Result<ClaimOutcome, DomainError> {
        let existing: Option<(bool,)> =
            sqlx::query_as("SELECT processed FROM webhook_events WHERE event_id = $1")
                .bind(&entry.event_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to look up webhook event: {}", e),
                    )
                })?;

        match existing {
            Some((true,)) => return Ok(ClaimOutcome::AlreadyProcessed),
            // Leftover from a failed attempt; the caller replays it.
            Some((false,)) => return Ok(ClaimOutcome::Accepted),
            None => {}
        }

        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (
                event_id, event_type, payload, processed, received_at, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&entry.event_id)
        .bind(&entry.event_type)
        .bind(&entry.payload)
        .bind(entry.processed)
        .bind(entry.received_at.as_datetime())
        .bind(entry.processed_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to ledger webhook event: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            // Lost the insert race to a concurrent delivery.
            return Ok(ClaimOutcome::InFlight);
        }

        Ok(ClaimOutcome::Accepted)
    }

    async fn find(&self, event_id: &str) -> Result<Option<LedgerEntry>, DomainError> {
        let row: Option<LedgerRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, payload, processed, received_at, processed_at
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to fetch webhook event: {}", e),
            )
        })?;

        Ok(row.map(LedgerEntry::from))
    }

    async fn mark_processed(&self, event_id: &str, at: Timestamp) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET processed = TRUE, processed_at = $2
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark webhook event processed: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Webhook event {} missing from ledger", event_id),
            ));
        }

        Ok(())
    }

    async fn delete_processed_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            DELETE FROM webhook_events
            WHERE processed = TRUE AND received_at < $1
            "#,
        )
        .bind(cutoff.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to prune webhook events: {}", e),
            )
        })?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    event_id: String,
    event_type: String,
    payload: serde_json::Value,
    processed: bool,
    received_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        LedgerEntry {
            event_id: row.event_id,
            event_type: row.event_type,
            payload: row.payload,
            processed: row.processed,
            received_at: Timestamp::from_datetime(row.received_at),
            processed_at: row.processed_at.map(Timestamp::from_datetime),
        }
    }
}
