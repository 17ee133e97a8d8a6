//! In-memory reminder log implementation for testing.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic
//! if locks are poisoned. Production code uses the Postgres adapter.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::ReminderLog;

/// In-memory reminder log for testing.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
#[derive(Default)]
pub struct InMemoryReminderLog {
    sent: RwLock<HashSet<(i64, u32, NaiveDate)>>,
}

impl InMemoryReminderLog {
    /// Creates a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Number of recorded reminders (for test assertions).
    pub fn sent_count(&self) -> usize {
        self.sent
            .read()
            .expect("InMemoryReminderLog: lock poisoned")
            .len()
    }
}

#[async_trait]
impl ReminderLog for InMemoryReminderLog {
    async fn already_sent(
        &self,
        user_id: UserId,
        days_before: u32,
        on: NaiveDate,
    ) -> Result<bool, DomainError> {
        Ok(self
            .sent
            .read()
            .expect("InMemoryReminderLog: lock poisoned")
            .contains(&(user_id.as_i64(), days_before, on)))
    }

    async fn record(
        &self,
        user_id: UserId,
        days_before: u32,
        on: NaiveDate,
    ) -> Result<(), DomainError> {
        self.sent
            .write()
            .expect("InMemoryReminderLog: lock poisoned")
            .insert((user_id.as_i64(), days_before, on));
        Ok(())
    }

    async fn delete_before(&self, cutoff: NaiveDate) -> Result<u64, DomainError> {
        let mut sent = self
            .sent
            .write()
            .expect("InMemoryReminderLog: lock poisoned");
        let before = sent.len();
        sent.retain(|(_, _, date)| *date >= cutoff);
        Ok((before - sent.len()) as u64)
    }
}
