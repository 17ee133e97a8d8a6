//! Billing policy configuration
//!
//! Knobs for the dunning and penalty policies. The defaults are the
//! production policy; overriding them is for staging environments that
//! want faster escalation.

use serde::Deserialize;

use super::error::ValidationError;

/// Billing policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Dunning grace window granted on the first payment failure, in days
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: i64,

    /// How many recent payments the consecutive-failure counter scans
    #[serde(default = "default_failure_scan_window")]
    pub failure_scan_window: u32,

    /// Days past due before late penalties start accruing
    #[serde(default = "default_penalty_grace_days")]
    pub penalty_grace_days: i64,

    /// Flat penalty rate once late, in basis points
    #[serde(default = "default_penalty_base_rate_bps")]
    pub penalty_base_rate_bps: u32,

    /// Additional penalty rate per day late, in basis points
    #[serde(default = "default_penalty_daily_rate_bps")]
    pub penalty_daily_rate_bps: u32,
}

impl BillingConfig {
    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.grace_period_days < 1 {
            return Err(ValidationError::InvalidGraceWindow);
        }
        if self.penalty_grace_days < 0 {
            return Err(ValidationError::InvalidGraceWindow);
        }
        if self.failure_scan_window == 0 {
            return Err(ValidationError::InvalidScanWindow);
        }
        if self.penalty_base_rate_bps > 10_000 || self.penalty_daily_rate_bps > 10_000 {
            return Err(ValidationError::InvalidPenaltyRate);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            grace_period_days: default_grace_period_days(),
            failure_scan_window: default_failure_scan_window(),
            penalty_grace_days: default_penalty_grace_days(),
            penalty_base_rate_bps: default_penalty_base_rate_bps(),
            penalty_daily_rate_bps: default_penalty_daily_rate_bps(),
        }
    }
}

fn default_grace_period_days() -> i64 {
    3
}

fn default_failure_scan_window() -> u32 {
    10
}

fn default_penalty_grace_days() -> i64 {
    2
}

fn default_penalty_base_rate_bps() -> u32 {
    500
}

fn default_penalty_daily_rate_bps() -> u32 {
    50
}
