//! Subscription aggregate entity.
//!
//! One subscription per user; users without one have no booking access.
//! The aggregate is mutated only through the state-machine methods below
//! (driven by webhooks and workers) and by explicit user actions
//! (cancel/reactivate), all of which take `now` from the caller's clock.
//!
//! # Design Decisions
//!
//! - **One per user**: Unique constraint on user_id enforced at database level
//! - **Money in cents**: All monetary values stored as i64 cents (not floats)
//! - **Injected time**: Mutators take `now` so billing math is deterministic
//! - **Grace invariant**: `grace_period_end` is set only while past_due

use crate::domain::foundation::{
    DomainError, ErrorCode, PlanId, SubscriptionId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use super::{EscalationStep, SubscriptionStatus};

/// Subscription aggregate - represents a user's billing relationship.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `user_id` is unique (one subscription per user)
/// - Status transitions follow state machine rules
/// - `grace_period_end` is non-null only while `status = PastDue`
/// - Period dates: `current_period_start <= current_period_end`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription.
    pub id: SubscriptionId,

    /// User who owns this subscription.
    pub user_id: UserId,

    /// Plan being billed.
    pub plan_id: PlanId,

    /// Where to send billing notifications; captured at checkout.
    /// Absent means this user gets no notifications, never an error.
    pub notify_email: Option<String>,

    /// Current status in the billing lifecycle.
    pub status: SubscriptionStatus,

    /// Dunning deadline; set on the first consecutive failure, cleared on
    /// recovery or suspension.
    pub grace_period_end: Option<Timestamp>,

    /// Start of current billing period.
    pub current_period_start: Timestamp,

    /// End of current billing period.
    pub current_period_end: Timestamp,

    /// When the next charge is due.
    pub next_billing_date: Timestamp,

    /// When the user cancelled (if cancelled).
    pub cancelled_at: Option<Timestamp>,

    /// When the subscription was created.
    pub created_at: Timestamp,

    /// When the subscription was last updated.
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates an active subscription starting its first period at `now`.
    ///
    /// Row creation belongs to checkout, outside this core; this exists
    /// for that caller and for test fixtures.
    pub fn start(
        id: SubscriptionId,
        user_id: UserId,
        plan_id: PlanId,
        notify_email: Option<String>,
        now: Timestamp,
    ) -> Self {
        let period_end = now.add_months(1);
        Self {
            id,
            user_id,
            plan_id,
            notify_email,
            status: SubscriptionStatus::Active,
            grace_period_end: None,
            current_period_start: now,
            current_period_end: period_end,
            next_billing_date: period_end,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this subscription currently grants booking access.
    ///
    /// Returns true if status allows access AND, for cancelled
    /// subscriptions, the paid period has not ended yet.
    pub fn has_access(&self, now: Timestamp) -> bool {
        if !self.status.has_access() {
            return false;
        }

        if self.status == SubscriptionStatus::Cancelled {
            return now <= self.current_period_end;
        }

        true
    }

    /// Activate after an approved payment.
    ///
    /// Restarts the billing period at `now`, pushes `next_billing_date`
    /// one calendar month out, and clears both the dunning deadline and
    /// any pending cancellation. Valid from every state (recovery from
    /// suspended and reactivation from cancelled included).
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn activate(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        self.current_period_start = now;
        self.current_period_end = now.add_months(1);
        self.next_billing_date = now.add_months(1);
        self.grace_period_end = None;
        self.cancelled_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Apply a dunning escalation decided by `DunningPolicy::escalate`.
    ///
    /// Demotion writes past_due with the step's deadline; suspension
    /// clears the deadline. Callers re-read status in-transaction first
    /// and skip the call entirely for already-suspended rows.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed
    /// (e.g. demoting a suspended subscription).
    pub fn apply_escalation(
        &mut self,
        step: EscalationStep,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        match step {
            EscalationStep::Demote { grace_period_end } => {
                self.transition_to(SubscriptionStatus::PastDue)?;
                self.grace_period_end = Some(grace_period_end);
            }
            EscalationStep::Suspend => {
                self.transition_to(SubscriptionStatus::Suspended)?;
                self.grace_period_end = None;
            }
        }
        self.updated_at = now;
        Ok(())
    }

    /// Mark past_due from the penalty worker, keeping an already-set
    /// deadline (the webhook path may have anchored an earlier one).
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn mark_past_due(&mut self, deadline: Timestamp, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::PastDue)?;
        if self.grace_period_end.is_none() {
            self.grace_period_end = Some(deadline);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Suspend after the grace period ran out (or dunning exhausted).
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn suspend(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Suspended)?;
        self.grace_period_end = None;
        self.updated_at = now;
        Ok(())
    }

    /// Cancel at the user's request (access runs until period end).
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.grace_period_end = None;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Days from `now` until the next charge; negative when overdue.
    pub fn days_until_next_billing(&self, now: Timestamp) -> i64 {
        self.next_billing_date.whole_days_since(&now)
    }

    /// True when the grace period exists and has passed.
    pub fn grace_expired(&self, now: Timestamp) -> bool {
        match self.grace_period_end {
            Some(deadline) => deadline <= now,
            None => false,
        }
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        use crate::domain::foundation::StateMachine;

        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
