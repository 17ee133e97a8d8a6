//! WebhookLedger port - Interface for the inbound-event idempotency ledger.
//!
//! The gateway delivers webhooks at-least-once: network timeouts, slow
//! responses and its own redelivery schedule all produce duplicates. The
//! ledger turns that into at-most-once side effects. A row is written
//! with `processed = false` BEFORE any side effect is attempted and only
//! flips to true after the whole handler succeeds, so a crash mid-handler
//! leaves a retryable row behind.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// One ledger row per gateway notification id.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    /// Gateway-assigned event id (stringified integer).
    pub event_id: String,

    /// The event's action, e.g. "payment.updated".
    pub event_type: String,

    /// Raw inbound payload for audit and replay diagnosis.
    pub payload: serde_json::Value,

    /// False until the handler has fully succeeded.
    pub processed: bool,

    /// When the event was first ledgered.
    pub received_at: Timestamp,

    /// When the handler succeeded.
    pub processed_at: Option<Timestamp>,
}

impl LedgerEntry {
    /// Creates the unprocessed row written before any side effect.
    pub fn received(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
        now: Timestamp,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            payload,
            processed: false,
            received_at: now,
            processed_at: None,
        }
    }
}

/// Outcome of claiming an event id for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Ours to handle: either a fresh insert or a leftover unprocessed
    /// row from an earlier failed attempt (replay from the top).
    Accepted,

    /// A row exists with `processed = true`; the exactly-once guard.
    AlreadyProcessed,

    /// Lost an insert race to a concurrent request that is handling the
    /// same event right now.
    InFlight,
}

/// Port for the webhook idempotency ledger.
///
/// Implementations must back `claim` with a unique constraint on
/// `event_id`; the in-flight arm exists precisely because two requests
/// can pass the lookup before either inserts.
#[async_trait]
pub trait WebhookLedger: Send + Sync {
    /// Look up the event, then insert `entry` if no row exists.
    ///
    /// - existing row, `processed = true` -> `AlreadyProcessed`
    /// - existing row, `processed = false` -> `Accepted` (retry path)
    /// - no row, insert wins -> `Accepted`
    /// - no row, insert loses the unique-constraint race -> `InFlight`
    async fn claim(&self, entry: LedgerEntry) -> Result<ClaimOutcome, DomainError>;

    /// Find a ledger row by event id.
    async fn find(&self, event_id: &str) -> Result<Option<LedgerEntry>, DomainError>;

    /// Flip `processed` to true after the handler fully succeeded.
    ///
    /// Never called on failure; the row stays claimable for redelivery.
    async fn mark_processed(&self, event_id: &str, at: Timestamp) -> Result<(), DomainError>;

    /// Delete processed rows older than the cutoff, returning how many.
    ///
    /// Unprocessed rows are never pruned; they are pending retries.
    async fn delete_processed_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
