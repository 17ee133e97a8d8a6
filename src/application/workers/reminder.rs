//! Payment reminder worker.
//!
//! Scans active subscriptions approaching their next billing date and
//! notifies each user at fixed day windows before the charge. The
//! reminder log keyed on `(user, window, calendar day)` keeps the sweep
//! idempotent no matter how often the scheduler fires it.

use std::sync::Arc;

use super::WorkerReport;
use crate::domain::billing::Subscription;
use crate::domain::foundation::{Clock, DomainError, Timestamp};
use crate::ports::{BillingStore, NotificationKind, NotificationRequest, Notifier, ReminderLog};

/// Days before the billing date on which a reminder goes out.
const REMINDER_DAYS: [i64; 3] = [7, 3, 1];

/// Scan horizon; one day past the widest reminder window.
const LOOKAHEAD_DAYS: i64 = 8;

/// Sends upcoming-billing reminders for active subscriptions.
pub struct ReminderWorker {
    store: Arc<dyn BillingStore>,
    reminder_log: Arc<dyn ReminderLog>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl ReminderWorker {
    pub fn new(
        store: Arc<dyn BillingStore>,
        reminder_log: Arc<dyn ReminderLog>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            reminder_log,
            notifier,
            clock,
        }
    }

    /// Run one sweep.
    ///
    /// Rows are isolated: a failure sending or recording one reminder is
    /// counted and logged, and the sweep moves on.
    ///
    /// # Errors
    ///
    /// Only the candidate scan itself can fail the sweep.
    pub async fn run_once(&self) -> Result<WorkerReport, DomainError> {
        let now = self.clock.now();
        let candidates = self
            .store
            .subscriptions_billing_between(now, now.plus_days(LOOKAHEAD_DAYS))
            .await?;

        let mut report = WorkerReport::default();
        for subscription in candidates {
            report.checked += 1;

            let days = subscription.days_until_next_billing(now);
            if !REMINDER_DAYS.contains(&days) {
                continue;
            }

            match self.send_reminder(&subscription, days, now).await {
                Ok(true) => report.applied += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(
                        user_id = %subscription.user_id,
                        days_before = days,
                        error = %err,
                        "reminder failed, will retry next sweep"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Send one reminder unless today's already went out.
    ///
    /// Notify-then-record: a crash between the two costs at worst one
    /// duplicate reminder, never a missed one.
    async fn send_reminder(
        &self,
        subscription: &Subscription,
        days: i64,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let days_before = days as u32;
        let today = now.date_naive();

        if self
            .reminder_log
            .already_sent(subscription.user_id, days_before, today)
            .await?
        {
            return Ok(false);
        }

        let Some(email) = subscription.notify_email.as_ref() else {
            tracing::debug!(
                user_id = %subscription.user_id,
                "no notification address, skipping reminder"
            );
            return Ok(false);
        };

        let request = NotificationRequest::new(
            subscription.user_id,
            NotificationKind::PaymentReminder,
            email,
        )
        .with_metadata(serde_json::json!({
            "days_before": days_before,
            "next_billing_date": subscription.next_billing_date,
        }));

        self.notifier.notify(&request).await?;
        self.reminder_log
            .record(subscription.user_id, days_before, today)
            .await?;
        Ok(true)
    }
}
