//! Background worker configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Background worker configuration
///
/// Tick intervals for the periodic billing sweeps and retention windows
/// for the pruning pass.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersConfig {
    /// How often the payment reminder sweep runs, in seconds
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_secs: u64,

    /// How often the penalty sweep runs, in seconds
    #[serde(default = "default_penalty_interval")]
    pub penalty_interval_secs: u64,

    /// How often the grace-expiry sweep runs, in seconds
    #[serde(default = "default_grace_interval")]
    pub grace_interval_secs: u64,

    /// How often retention pruning runs, in seconds
    #[serde(default = "default_prune_interval")]
    pub prune_interval_secs: u64,

    /// Days to keep processed webhook ledger rows
    #[serde(default = "default_ledger_retention_days")]
    pub ledger_retention_days: i64,

    /// Days to keep reminder log entries
    #[serde(default = "default_reminder_retention_days")]
    pub reminder_retention_days: i64,
}

impl WorkersConfig {
    /// Get the reminder sweep interval as Duration
    pub fn reminder_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_interval_secs)
    }

    /// Get the penalty sweep interval as Duration
    pub fn penalty_interval(&self) -> Duration {
        Duration::from_secs(self.penalty_interval_secs)
    }

    /// Get the grace-expiry sweep interval as Duration
    pub fn grace_interval(&self) -> Duration {
        Duration::from_secs(self.grace_interval_secs)
    }

    /// Get the pruning interval as Duration
    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }

    /// Validate worker configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reminder_interval_secs == 0
            || self.penalty_interval_secs == 0
            || self.grace_interval_secs == 0
            || self.prune_interval_secs == 0
        {
            return Err(ValidationError::InvalidInterval);
        }
        if self.ledger_retention_days < 1 || self.reminder_retention_days < 1 {
            return Err(ValidationError::InvalidRetention);
        }
        Ok(())
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            reminder_interval_secs: default_reminder_interval(),
            penalty_interval_secs: default_penalty_interval(),
            grace_interval_secs: default_grace_interval(),
            prune_interval_secs: default_prune_interval(),
            ledger_retention_days: default_ledger_retention_days(),
            reminder_retention_days: default_reminder_retention_days(),
        }
    }
}

fn default_reminder_interval() -> u64 {
    6 * 60 * 60
}

fn default_penalty_interval() -> u64 {
    60 * 60
}

fn default_grace_interval() -> u64 {
    10 * 60
}

fn default_prune_interval() -> u64 {
    24 * 60 * 60
}

fn default_ledger_retention_days() -> i64 {
    90
}

fn default_reminder_retention_days() -> i64 {
    30
}
