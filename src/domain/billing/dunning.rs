//! Consecutive-failure counting and the dunning escalation policy.
//!
//! Both halves are pure: the counter walks payment statuses newest-first
//! and the policy maps a failure count onto the next subscription state.
//! The persistence layer supplies the history; the webhook handler and
//! workers apply the result inside their own transactions.

use serde::{Deserialize, Serialize};

use super::PaymentStatus;
use crate::domain::foundation::Timestamp;

/// Counts rejections in a row since the last approved payment.
///
/// Walks statuses newest-first: increments on `Rejected`, stops at the
/// first `Approved`, and skips over `Pending`/`Refunded` without breaking
/// the streak. Callers pass a bounded window of recent rows
/// ([`DunningPolicy::scan_window`]); a streak longer than the window
/// under-counts, which the policy accepts as a capacity bound.
pub fn consecutive_failures<I>(statuses_newest_first: I) -> u32
where
    I: IntoIterator<Item = PaymentStatus>,
{
    let mut count = 0;
    for status in statuses_newest_first {
        match status {
            PaymentStatus::Rejected => count += 1,
            PaymentStatus::Approved => break,
            PaymentStatus::Pending | PaymentStatus::Refunded => continue,
        }
    }
    count
}

/// Dunning escalation policy.
///
/// Reference values: a 3-day grace window anchored to the first failure
/// and a 10-row history scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DunningPolicy {
    /// Grace window granted on the first consecutive failure, in days.
    pub grace_days: i64,

    /// How many recent payments the failure counter walks.
    pub scan_window: u32,
}

impl Default for DunningPolicy {
    fn default() -> Self {
        Self {
            grace_days: 3,
            scan_window: 10,
        }
    }
}

/// Outcome of applying the escalation table to a failure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationStep {
    /// Move (or keep) the subscription in past_due with this deadline.
    Demote { grace_period_end: Timestamp },

    /// Failures exhausted the dunning window; suspend and clear grace.
    Suspend,
}

impl DunningPolicy {
    /// Applies the escalation table.
    ///
    /// 1 failure starts the grace window at `now + grace_days`; a 2nd
    /// failure keeps the existing deadline (the window is anchored to the
    /// first failure, never extended by retries); 3 or more suspend.
    ///
    /// A zero count can only mean the scan window missed the rejection
    /// that triggered this call; it is treated as the first failure. A
    /// missing deadline on the 2nd failure is restarted rather than left
    /// unset, so a past_due row always carries an expiry.
    pub fn escalate(
        &self,
        failures: u32,
        current_grace: Option<Timestamp>,
        now: Timestamp,
    ) -> EscalationStep {
        match failures {
            0 | 1 => EscalationStep::Demote {
                grace_period_end: now.plus_days(self.grace_days),
            },
            2 => EscalationStep::Demote {
                grace_period_end: current_grace
                    .unwrap_or_else(|| now.plus_days(self.grace_days)),
            },
            _ => EscalationStep::Suspend,
        }
    }
}
