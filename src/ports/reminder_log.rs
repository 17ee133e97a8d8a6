//! Reminder log port - dedup record for payment reminders.
//!
//! The reminder worker runs on an interval, so the same `(user, window,
//! day)` triple comes up repeatedly while the calendar date holds. This
//! log is what makes a reminder fire at most once per user, per window,
//! per day, across runs and across restarts.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::foundation::{DomainError, UserId};

/// Port for the reminder dedup log.
#[async_trait]
pub trait ReminderLog: Send + Sync {
    /// Whether a reminder was already sent for this triple.
    async fn already_sent(
        &self,
        user_id: UserId,
        days_before: u32,
        on: NaiveDate,
    ) -> Result<bool, DomainError>;

    /// Record a sent reminder.
    ///
    /// Recording an existing triple is a no-op, so a crash between send
    /// and record costs at worst one duplicate reminder, never a missed
    /// one.
    async fn record(
        &self,
        user_id: UserId,
        days_before: u32,
        on: NaiveDate,
    ) -> Result<(), DomainError>;

    /// Delete entries older than `cutoff` (retention policy).
    async fn delete_before(&self, cutoff: NaiveDate) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn reminder_log_is_object_safe() {
        fn _accepts_dyn(_log: &dyn ReminderLog) {}
    }
}
