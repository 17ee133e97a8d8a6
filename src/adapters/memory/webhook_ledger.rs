//! In-memory webhook ledger implementation for testing.
//!
//! Models the idempotency contract exactly: one row per event id,
//! `processed` flipped only by `mark_processed`, retries claimable.
//! Claims are atomic under a single lock, so the insert race that
//! produces `InFlight` on Postgres cannot occur here.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic
//! if locks are poisoned. Production code uses the Postgres adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{ClaimOutcome, LedgerEntry, WebhookLedger};

/// In-memory webhook ledger for testing.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
#[derive(Default)]
pub struct InMemoryWebhookLedger {
    rows: RwLock<HashMap<String, LedgerEntry>>,
}

impl InMemoryWebhookLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Number of ledger rows (for test assertions).
    pub fn row_count(&self) -> usize {
        self.rows
            .read()
            .expect("InMemoryWebhookLedger: lock poisoned")
            .len()
    }

    /// Whether the event's row has `processed = true`.
    pub fn is_processed(&self, event_id: &str) -> bool {
        self.rows
            .read()
            .expect("InMemoryWebhookLedger: lock poisoned")
            .get(event_id)
            .map(|entry| entry.processed)
            .unwrap_or(false)
    }
}

#[async_trait]
impl WebhookLedger for InMemoryWebhookLedger {
    async fn claim(&self, entry: LedgerEntry) -> Result<ClaimOutcome, DomainError> {
        let mut rows = self
            .rows
            .write()
            .expect("InMemoryWebhookLedger: lock poisoned");
        match rows.get(&entry.event_id) {
            Some(existing) if existing.processed => Ok(ClaimOutcome::AlreadyProcessed),
            Some(_) => Ok(ClaimOutcome::Accepted),
            None => {
                rows.insert(entry.event_id.clone(), entry);
                Ok(ClaimOutcome::Accepted)
            }
        }
    }

    async fn find(&self, event_id: &str) -> Result<Option<LedgerEntry>, DomainError> {
        Ok(self
            .rows
            .read()
            .expect("InMemoryWebhookLedger: lock poisoned")
            .get(event_id)
            .cloned())
    }

    async fn mark_processed(&self, event_id: &str, at: Timestamp) -> Result<(), DomainError> {
        let mut rows = self
            .rows
            .write()
            .expect("InMemoryWebhookLedger: lock poisoned");
        if let Some(entry) = rows.get_mut(event_id) {
            entry.processed = true;
            entry.processed_at = Some(at);
        }
        Ok(())
    }

    async fn delete_processed_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut rows = self
            .rows
            .write()
            .expect("InMemoryWebhookLedger: lock poisoned");
        let before = rows.len();
        rows.retain(|_, entry| !entry.processed || entry.received_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}
