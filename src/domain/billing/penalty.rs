//! Late-payment penalty calculation.
//!
//! Pure arithmetic over integer cents and basis points. The penalty
//! grace window here (days past due before fees accrue) is a separate
//! concept from the dunning grace period in `dunning.rs`, which is keyed
//! to consecutive payment failures rather than due-date lateness.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Penalty accrual policy.
///
/// Reference values: 2 days grace, 5% base rate, 0.5% per day late.
/// Rates are basis points so the whole calculation stays in integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyPolicy {
    /// Whole days past the due date before any penalty accrues.
    pub grace_days: i64,

    /// Flat penalty rate once late, in basis points.
    pub base_rate_bps: u32,

    /// Additional rate per day late, in basis points.
    pub daily_rate_bps: u32,
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self {
            grace_days: 2,
            base_rate_bps: 500,
            daily_rate_bps: 50,
        }
    }
}

/// Result of a penalty calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyBreakdown {
    /// Billable late days (whole days past due minus the grace window).
    pub days_late: i64,

    /// Effective penalty rate in basis points.
    pub rate_bps: u32,

    /// Penalty amount in cents, rounded half-up.
    pub amount: i64,
}

impl PenaltyPolicy {
    /// Calculates the penalty for a payment of `base_amount` cents due at
    /// `due_date` as seen at `now`.
    ///
    /// `days_late = max(0, whole_days(due_date -> now) - grace_days)`,
    /// `rate = base + days_late * daily`, `amount = round(base * rate)`.
    /// A payment inside the grace window yields a zero breakdown.
    pub fn calculate(
        &self,
        base_amount: i64,
        due_date: Timestamp,
        now: Timestamp,
    ) -> PenaltyBreakdown {
        let days_past_due = now.whole_days_since(&due_date);
        let days_late = (days_past_due - self.grace_days).max(0);

        if days_late == 0 {
            return PenaltyBreakdown {
                days_late: 0,
                rate_bps: 0,
                amount: 0,
            };
        }

        let rate_bps = self.base_rate_bps as i64 + days_late * self.daily_rate_bps as i64;
        // Clamp is for pathological day counts; real rows are days late,
        // not centuries.
        let rate_bps = rate_bps.min(u32::MAX as i64) as u32;

        PenaltyBreakdown {
            days_late,
            rate_bps,
            amount: apply_bps(base_amount, rate_bps),
        }
    }
}

/// Applies a basis-point rate to an amount in cents, rounding half-up.
fn apply_bps(amount: i64, rate_bps: u32) -> i64 {
    (amount * rate_bps as i64 + 5_000) / 10_000
}
