//! Grace-expiry worker.
//!
//! Suspends past-due subscriptions whose dunning deadline has lapsed.
//! The scan matches `grace_period_end <= now`; the locked re-read inside
//! each row's transaction is what guarantees a payment approved between
//! scan and lock keeps its recovery.

use std::sync::Arc;

use super::WorkerReport;
use crate::domain::billing::{Subscription, SubscriptionStatus};
use crate::domain::foundation::{Clock, DomainError, Timestamp};
use crate::ports::{BillingStore, NotificationKind, NotificationRequest, Notifier};

/// Suspends subscriptions that ran out their grace period.
pub struct GraceExpiryWorker {
    store: Arc<dyn BillingStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl GraceExpiryWorker {
    pub fn new(
        store: Arc<dyn BillingStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    /// Run one sweep.
    ///
    /// # Errors
    ///
    /// Only the candidate scan itself can fail the sweep; per-row errors
    /// are counted in the report.
    pub async fn run_once(&self) -> Result<WorkerReport, DomainError> {
        let now = self.clock.now();
        let candidates = self.store.subscriptions_with_expired_grace(now).await?;

        let mut report = WorkerReport::default();
        for candidate in candidates {
            report.checked += 1;
            match self.suspend(&candidate, now).await {
                Ok(true) => report.applied += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(
                        subscription_id = %candidate.id,
                        error = %err,
                        "grace-expiry suspension failed, row stays eligible"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Suspend one subscription in its own transaction.
    async fn suspend(&self, candidate: &Subscription, now: Timestamp) -> Result<bool, DomainError> {
        let mut txn = self.store.begin().await?;
        let Some(mut subscription) = txn
            .find_subscription_by_id_for_update(&candidate.id)
            .await?
        else {
            return Ok(false);
        };

        // A payment approved since the scan recovers the subscription;
        // the locked row is the truth, not the candidate list.
        if subscription.status != SubscriptionStatus::PastDue || !subscription.grace_expired(now) {
            return Ok(false);
        }

        let deadline = subscription.grace_period_end;
        subscription.suspend(now)?;
        txn.update_subscription(&subscription).await?;
        txn.commit().await?;

        if let Some(request) = self.notification(&subscription, deadline) {
            if let Err(err) = self.notifier.notify(&request).await {
                tracing::warn!(
                    user_id = %request.user_id,
                    error = %err,
                    "grace-expiry notification failed, dropping"
                );
            }
        }
        Ok(true)
    }

    fn notification(
        &self,
        subscription: &Subscription,
        deadline: Option<Timestamp>,
    ) -> Option<NotificationRequest> {
        let email = subscription.notify_email.as_ref()?;
        Some(
            NotificationRequest::new(subscription.user_id, NotificationKind::GraceExpired, email)
                .with_metadata(serde_json::json!({
                    "grace_period_end": deadline,
                })),
        )
    }
}
