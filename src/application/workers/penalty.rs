//! Penalty worker.
//!
//! Finds pending payments past due beyond the penalty grace window,
//! writes the late fee exactly once, and demotes the owning subscription
//! to past_due. Each row gets its own transaction with locked re-reads,
//! so a candidate settled between scan and lock is quietly skipped and a
//! failing row never takes the batch down with it.

use std::sync::Arc;

use super::WorkerReport;
use crate::domain::billing::{DunningPolicy, Payment, PenaltyPolicy, Subscription, SubscriptionStatus};
use crate::domain::foundation::{Clock, DomainError, Timestamp};
use crate::ports::{BillingStore, NotificationKind, NotificationRequest, Notifier};

/// Applies late fees to overdue pending payments.
pub struct PenaltyWorker {
    store: Arc<dyn BillingStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    policy: PenaltyPolicy,
    dunning: DunningPolicy,
}

impl PenaltyWorker {
    /// Creates a worker with the default penalty and dunning policies.
    pub fn new(
        store: Arc<dyn BillingStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            policy: PenaltyPolicy::default(),
            dunning: DunningPolicy::default(),
        }
    }

    /// Overrides the penalty policy.
    pub fn with_policy(mut self, policy: PenaltyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides the dunning policy.
    pub fn with_dunning_policy(mut self, dunning: DunningPolicy) -> Self {
        self.dunning = dunning;
        self
    }

    /// Run one sweep.
    ///
    /// # Errors
    ///
    /// Only the candidate scan itself can fail the sweep; per-row errors
    /// are counted in the report.
    pub async fn run_once(&self) -> Result<WorkerReport, DomainError> {
        let now = self.clock.now();
        let cutoff = now.minus_days(self.policy.grace_days);
        let candidates = self.store.overdue_pending_payments(cutoff).await?;

        let mut report = WorkerReport::default();
        for candidate in candidates {
            report.checked += 1;
            match self.penalize(&candidate, now).await {
                Ok(true) => report.applied += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(
                        payment_id = %candidate.id,
                        error = %err,
                        "penalty failed, row stays eligible"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Apply the fee to one payment in its own transaction.
    async fn penalize(&self, candidate: &Payment, now: Timestamp) -> Result<bool, DomainError> {
        let mut txn = self.store.begin().await?;

        // Subscription first, then payment: same lock order as the
        // webhook path.
        let subscription = txn
            .find_subscription_by_id_for_update(&candidate.subscription_id)
            .await?;
        let Some(mut payment) = txn.find_payment_for_update(&candidate.id).await? else {
            return Ok(false);
        };

        // The row may have settled or been penalized since the scan.
        if !payment.is_penalty_candidate(now, self.policy.grace_days) {
            return Ok(false);
        }

        let breakdown = self.policy.calculate(payment.amount, payment.due_date, now);
        if breakdown.amount == 0 {
            // Sub-cent base amounts can round to zero; skip without a write.
            return Ok(false);
        }

        payment.apply_penalty(breakdown.amount, now)?;
        txn.update_payment(&payment).await?;

        let notification = match subscription {
            Some(mut sub) => {
                if matches!(
                    sub.status,
                    SubscriptionStatus::Active | SubscriptionStatus::PastDue
                ) {
                    // Keeps an already-anchored grace deadline.
                    sub.mark_past_due(now.plus_days(self.dunning.grace_days), now)?;
                    txn.update_subscription(&sub).await?;
                } else {
                    tracing::debug!(
                        subscription_id = %sub.id,
                        status = ?sub.status,
                        "penalty applied without demotion"
                    );
                }
                self.notification(&sub, &payment, breakdown.days_late)
            }
            None => {
                tracing::warn!(
                    payment_id = %payment.id,
                    subscription_id = %payment.subscription_id,
                    "penalized payment has no subscription row"
                );
                None
            }
        };

        txn.commit().await?;

        if let Some(request) = notification {
            if let Err(err) = self.notifier.notify(&request).await {
                tracing::warn!(
                    user_id = %request.user_id,
                    error = %err,
                    "penalty notification failed, dropping"
                );
            }
        }
        Ok(true)
    }

    fn notification(
        &self,
        subscription: &Subscription,
        payment: &Payment,
        days_late: i64,
    ) -> Option<NotificationRequest> {
        let email = subscription.notify_email.as_ref()?;
        Some(
            NotificationRequest::new(subscription.user_id, NotificationKind::PenaltyApplied, email)
                .with_metadata(serde_json::json!({
                    "penalty_cents": payment.penalty_fee,
                    "total_cents": payment.total_amount,
                    "days_late": days_late,
                })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, InMemoryNotifier};
    use crate::domain::foundation::{ManualClock, PaymentId, PlanId, SubscriptionId, UserId};

    fn start() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    struct Harness {
        store: Arc<InMemoryBillingStore>,
        notifier: Arc<InMemoryNotifier>,
        clock: Arc<ManualClock>,
        worker: PenaltyWorker,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryBillingStore::new());
        let notifier = Arc::new(InMemoryNotifier::new());
        let clock = Arc::new(ManualClock::new(start()));
        let worker = PenaltyWorker::new(store.clone(), notifier.clone(), clock.clone());
        Harness {
            store,
            notifier,
            clock,
            worker,
        }
    }

    impl Harness {
        fn seed_subscription(&self, user: i64) -> Subscription {
            let sub = Subscription::start(
                SubscriptionId::new(),
                UserId::new(user).unwrap(),
                PlanId::new(7).unwrap(),
                Some(format!("user{}@example.com", user)),
                start(),
            );
            self.store.seed_subscription(sub.clone());
            sub
        }

        fn seed_pending_payment(&self, sub: &Subscription, txn: &str, due: Timestamp) -> Payment {
            let payment = Payment::pending(
                PaymentId::new(),
                sub.user_id,
                sub.id,
                txn,
                10_000,
                due,
                due,
            );
            self.store.seed_payment(payment.clone());
            payment
        }
    }

    #[tokio::test]
    async fn applies_reference_penalty_and_demotes() {
        let h = harness();
        let sub = h.seed_subscription(42);
        let payment = h.seed_pending_payment(&sub, "txn-1", start());
        h.clock.set(start().plus_days(7));

        let report = h.worker.run_once().await.unwrap();

        assert_eq!(report.checked, 1);
        assert_eq!(report.applied, 1);

        // 5 billable days at 5% + 5 * 0.5% of 10000 cents.
        let stored = h.store.payment(&payment.id).unwrap();
        assert_eq!(stored.penalty_fee, 750);
        assert_eq!(stored.total_amount, 10_750);

        let stored_sub = h.store.subscription(&sub.id).unwrap();
        assert_eq!(stored_sub.status, SubscriptionStatus::PastDue);
        assert_eq!(
            stored_sub.grace_period_end,
            Some(start().plus_days(7).plus_days(3))
        );

        let sent = h.notifier.delivered_of_kind(NotificationKind::PenaltyApplied);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].metadata["penalty_cents"], 750);
        assert_eq!(sent[0].metadata["days_late"], 5);
    }

    #[tokio::test]
    async fn penalty_is_applied_exactly_once() {
        let h = harness();
        let sub = h.seed_subscription(42);
        let payment = h.seed_pending_payment(&sub, "txn-1", start());
        h.clock.set(start().plus_days(7));

        h.worker.run_once().await.unwrap();
        let second = h.worker.run_once().await.unwrap();

        // Penalized rows drop out of the candidate scan entirely.
        assert_eq!(second.checked, 0);
        assert_eq!(h.store.payment(&payment.id).unwrap().penalty_fee, 750);
        assert_eq!(h.notifier.delivered_count(), 1);
    }

    #[tokio::test]
    async fn rows_inside_grace_window_are_not_candidates() {
        let h = harness();
        let sub = h.seed_subscription(42);
        h.seed_pending_payment(&sub, "txn-1", start());
        h.clock.set(start().plus_days(2));

        let report = h.worker.run_once().await.unwrap();

        assert_eq!(report.checked, 0);
        assert_eq!(
            h.store.subscription(&sub.id).unwrap().status,
            SubscriptionStatus::Active
        );
    }

    #[tokio::test]
    async fn existing_grace_deadline_is_preserved() {
        let h = harness();
        let mut sub = h.seed_subscription(42);
        let anchored = start().plus_days(1);
        sub.mark_past_due(anchored, start()).unwrap();
        h.store.seed_subscription(sub.clone());
        h.seed_pending_payment(&sub, "txn-1", start());
        h.clock.set(start().plus_days(7));

        h.worker.run_once().await.unwrap();

        let stored = h.store.subscription(&sub.id).unwrap();
        assert_eq!(stored.status, SubscriptionStatus::PastDue);
        assert_eq!(stored.grace_period_end, Some(anchored));
    }

    #[tokio::test]
    async fn suspended_subscription_is_not_demoted() {
        let h = harness();
        let mut sub = h.seed_subscription(42);
        sub.mark_past_due(start().plus_days(3), start()).unwrap();
        sub.suspend(start()).unwrap();
        h.store.seed_subscription(sub.clone());
        let payment = h.seed_pending_payment(&sub, "txn-1", start());
        h.clock.set(start().plus_days(7));

        let report = h.worker.run_once().await.unwrap();

        // The fee lands, the status does not move.
        assert_eq!(report.applied, 1);
        assert_eq!(h.store.payment(&payment.id).unwrap().penalty_fee, 750);
        let stored = h.store.subscription(&sub.id).unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Suspended);
        assert!(stored.grace_period_end.is_none());
    }

    #[tokio::test]
    async fn failed_row_does_not_block_the_rest() {
        let h = harness();
        let sub_a = h.seed_subscription(42);
        let sub_b = h.seed_subscription(43);
        let poisoned = h.seed_pending_payment(&sub_a, "txn-a", start());
        let healthy = h.seed_pending_payment(&sub_b, "txn-b", start());
        h.store.fail_payment_updates_for(poisoned.id);
        h.clock.set(start().plus_days(7));

        let report = h.worker.run_once().await.unwrap();

        assert_eq!(report.checked, 2);
        assert_eq!(report.applied, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(h.store.payment(&healthy.id).unwrap().penalty_fee, 750);
        // The poisoned row rolled back and stays eligible.
        assert_eq!(h.store.payment(&poisoned.id).unwrap().penalty_fee, 0);
    }

    #[tokio::test]
    async fn first_billable_day_charges_base_plus_daily() {
        let h = harness();
        let sub = h.seed_subscription(42);
        let payment = h.seed_pending_payment(&sub, "txn-1", start());
        h.clock.set(start().plus_days(3));

        let report = h.worker.run_once().await.unwrap();

        assert_eq!(report.applied, 1);
        // 1 billable day: 5.5% of 10000.
        assert_eq!(h.store.payment(&payment.id).unwrap().penalty_fee, 550);
    }
}
