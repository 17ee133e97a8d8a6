//! Subscription status state machine.
//!
//! Defines all possible subscription states and valid transitions
//! according to the billing lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Subscription status.
///
/// Represents the current state of a user's subscription in the
/// payment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid up. Full access to booking.
    Active,

    /// Payment failed but within the dunning grace period.
    /// User retains access while retries run.
    PastDue,

    /// Grace period exhausted or repeated failures.
    /// No access until a payment recovers the subscription.
    Suspended,

    /// User requested cancellation.
    /// Access continues until period end; an approved payment reactivates.
    Cancelled,
}

impl SubscriptionStatus {
    /// Returns true if this status grants access to studio booking.
    ///
    /// Access is granted for:
    /// - Active: Fully paid
    /// - PastDue: Grace period during payment retry
    /// - Cancelled: Until period end
    ///
    /// Access is denied for:
    /// - Suspended: Dunning exhausted
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active
                | SubscriptionStatus::PastDue
                | SubscriptionStatus::Cancelled
        )
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From ACTIVE
            (Active, Active) // Renewal
                | (Active, PastDue)
                | (Active, Suspended)
                | (Active, Cancelled)
            // From PAST_DUE
                | (PastDue, Active) // Recovery
                | (PastDue, PastDue) // Repeated failure, grace unchanged
                | (PastDue, Suspended)
                | (PastDue, Cancelled)
            // From SUSPENDED
            // Never back to PastDue: suspension is not resurrectable
            // into the grace window, only a real payment reactivates.
                | (Suspended, Active)
                | (Suspended, Cancelled)
            // From CANCELLED
                | (Cancelled, Active) // Reactivation
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![Active, PastDue, Suspended, Cancelled],
            PastDue => vec![Active, PastDue, Suspended, Cancelled],
            Suspended => vec![Active, Cancelled],
            Cancelled => vec![Active],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit Tests - State Transitions

    #[test]
    fn active_can_renew_to_active() {
        let status = SubscriptionStatus::Active;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));

        let result = status.transition_to(SubscriptionStatus::Active);
        assert_eq!(result, Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn active_can_transition_to_past_due() {
        let status = SubscriptionStatus::Active;
        assert!(status.can_transition_to(&SubscriptionStatus::PastDue));

        let result = status.transition_to(SubscriptionStatus::PastDue);
        assert_eq!(result, Ok(SubscriptionStatus::PastDue));
    }

    #[test]
    fn active_can_transition_to_suspended() {
        // Three rejections can arrive while the row still says active.
        let status = SubscriptionStatus::Active;
        assert!(status.can_transition_to(&SubscriptionStatus::Suspended));
    }

    #[test]
    fn active_can_transition_to_cancelled() {
        let status = SubscriptionStatus::Active;
        assert!(status.can_transition_to(&SubscriptionStatus::Cancelled));
    }

    #[test]
    fn past_due_can_recover_to_active() {
        let status = SubscriptionStatus::PastDue;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));

        let result = status.transition_to(SubscriptionStatus::Active);
        assert_eq!(result, Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn past_due_can_stay_past_due_on_repeat_failure() {
        let status = SubscriptionStatus::PastDue;
        assert!(status.can_transition_to(&SubscriptionStatus::PastDue));
    }

    #[test]
    fn past_due_can_transition_to_suspended() {
        let status = SubscriptionStatus::PastDue;
        assert!(status.can_transition_to(&SubscriptionStatus::Suspended));
    }

    #[test]
    fn suspended_cannot_return_to_past_due() {
        let status = SubscriptionStatus::Suspended;
        assert!(!status.can_transition_to(&SubscriptionStatus::PastDue));

        let result = status.transition_to(SubscriptionStatus::PastDue);
        assert!(result.is_err());
    }

    #[test]
    fn suspended_can_recover_to_active() {
        let status = SubscriptionStatus::Suspended;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn suspended_can_be_cancelled() {
        let status = SubscriptionStatus::Suspended;
        assert!(status.can_transition_to(&SubscriptionStatus::Cancelled));
    }

    #[test]
    fn cancelled_can_reactivate_to_active() {
        let status = SubscriptionStatus::Cancelled;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));

        let result = status.transition_to(SubscriptionStatus::Active);
        assert_eq!(result, Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn cancelled_cannot_transition_to_past_due_or_suspended() {
        let status = SubscriptionStatus::Cancelled;
        assert!(!status.can_transition_to(&SubscriptionStatus::PastDue));
        assert!(!status.can_transition_to(&SubscriptionStatus::Suspended));
    }

    // Unit Tests - has_access

    #[test]
    fn has_access_true_for_active() {
        assert!(SubscriptionStatus::Active.has_access());
    }

    #[test]
    fn has_access_true_for_past_due_in_grace() {
        assert!(SubscriptionStatus::PastDue.has_access());
    }

    #[test]
    fn has_access_true_for_cancelled_before_period_end() {
        assert!(SubscriptionStatus::Cancelled.has_access());
    }

    #[test]
    fn has_access_false_for_suspended() {
        assert!(!SubscriptionStatus::Suspended.has_access());
    }

    // Additional validation tests

    #[test]
    fn valid_transitions_are_consistent_with_can_transition_to() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Suspended,
            SubscriptionStatus::Cancelled,
        ] {
            for valid_target in status.valid_transitions() {
                assert!(
                    status.can_transition_to(&valid_target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    status,
                    valid_target
                );
            }
        }
    }

    #[test]
    fn no_state_is_terminal() {
        // Even cancelled subscriptions can reactivate on payment.
        assert!(!SubscriptionStatus::Cancelled.is_terminal());
        assert!(!SubscriptionStatus::Suspended.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }
}
