//! Worker scheduler - one loop driving every periodic billing sweep.
//!
//! Owns the tick intervals for the reminder, penalty and grace-expiry
//! workers plus the retention pruning of the webhook ledger and the
//! reminder log. Sweep outcomes are logged, never propagated: a failing
//! sweep waits for its next tick instead of taking the scheduler down.
//!
//! ## Graceful Shutdown
//!
//! The loop listens on a watch channel and returns once shutdown is
//! signalled; in-flight sweeps complete first because select arms are
//! only taken between them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use super::{GraceExpiryWorker, PenaltyWorker, ReminderWorker, WorkerReport};
use crate::domain::foundation::{Clock, DomainError};
use crate::ports::{ReminderLog, WebhookLedger};

/// Tick intervals and retention windows for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the reminder sweep runs.
    pub reminder_interval: Duration,

    /// How often the penalty sweep runs.
    pub penalty_interval: Duration,

    /// How often the grace-expiry sweep runs.
    pub grace_interval: Duration,

    /// How often retention pruning runs.
    pub prune_interval: Duration,

    /// Processed webhook ledger rows older than this are pruned.
    pub ledger_retention_days: i64,

    /// Reminder log entries older than this are pruned.
    pub reminder_retention_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reminder_interval: Duration::from_secs(6 * 60 * 60),
            penalty_interval: Duration::from_secs(60 * 60),
            grace_interval: Duration::from_secs(10 * 60),
            prune_interval: Duration::from_secs(24 * 60 * 60),
            ledger_retention_days: 90,
            reminder_retention_days: 30,
        }
    }
}

impl SchedulerConfig {
    /// Create config with a custom reminder interval.
    pub fn with_reminder_interval(mut self, interval: Duration) -> Self {
        self.reminder_interval = interval;
        self
    }

    /// Create config with a custom penalty interval.
    pub fn with_penalty_interval(mut self, interval: Duration) -> Self {
        self.penalty_interval = interval;
        self
    }

    /// Create config with a custom grace-expiry interval.
    pub fn with_grace_interval(mut self, interval: Duration) -> Self {
        self.grace_interval = interval;
        self
    }

    /// Create config with a custom prune interval.
    pub fn with_prune_interval(mut self, interval: Duration) -> Self {
        self.prune_interval = interval;
        self
    }

    /// Create config with custom retention windows.
    pub fn with_retention_days(mut self, ledger: i64, reminder: i64) -> Self {
        self.ledger_retention_days = ledger;
        self.reminder_retention_days = reminder;
        self
    }
}

/// Background service running the billing sweeps on their intervals.
pub struct WorkerScheduler {
    reminder: ReminderWorker,
    penalty: PenaltyWorker,
    grace_expiry: GraceExpiryWorker,
    ledger: Arc<dyn WebhookLedger>,
    reminder_log: Arc<dyn ReminderLog>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl WorkerScheduler {
    /// Create a scheduler with default intervals.
    pub fn new(
        reminder: ReminderWorker,
        penalty: PenaltyWorker,
        grace_expiry: GraceExpiryWorker,
        ledger: Arc<dyn WebhookLedger>,
        reminder_log: Arc<dyn ReminderLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reminder,
            penalty,
            grace_expiry,
            ledger,
            reminder_log,
            clock,
            config: SchedulerConfig::default(),
        }
    }

    /// Overrides the scheduler configuration.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the scheduler loop until shutdown is signalled.
    ///
    /// Every interval fires immediately on start, so a restart catches up
    /// on overdue sweeps right away.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), DomainError> {
        let mut reminder_tick = time::interval(self.config.reminder_interval);
        let mut penalty_tick = time::interval(self.config.penalty_interval);
        let mut grace_tick = time::interval(self.config.grace_interval);
        let mut prune_tick = time::interval(self.config.prune_interval);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("worker scheduler stopping");
                        return Ok(());
                    }
                }

                _ = reminder_tick.tick() => {
                    match self.reminder.run_once().await {
                        Ok(report) => log_report("reminder", report),
                        Err(err) => tracing::error!(error = %err, "reminder sweep failed"),
                    }
                }

                _ = penalty_tick.tick() => {
                    match self.penalty.run_once().await {
                        Ok(report) => log_report("penalty", report),
                        Err(err) => tracing::error!(error = %err, "penalty sweep failed"),
                    }
                }

                _ = grace_tick.tick() => {
                    match self.grace_expiry.run_once().await {
                        Ok(report) => log_report("grace_expiry", report),
                        Err(err) => tracing::error!(error = %err, "grace-expiry sweep failed"),
                    }
                }

                _ = prune_tick.tick() => {
                    self.prune().await;
                }
            }
        }
    }

    /// Delete ledger rows and reminder entries past retention.
    async fn prune(&self) {
        let now = self.clock.now();

        let ledger_cutoff = now.minus_days(self.config.ledger_retention_days);
        match self.ledger.delete_processed_before(ledger_cutoff).await {
            Ok(deleted) if deleted > 0 => {
                tracing::info!(deleted, "pruned processed webhook events");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "webhook ledger prune failed"),
        }

        let reminder_cutoff = now
            .minus_days(self.config.reminder_retention_days)
            .date_naive();
        match self.reminder_log.delete_before(reminder_cutoff).await {
            Ok(deleted) if deleted > 0 => {
                tracing::info!(deleted, "pruned reminder log entries");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "reminder log prune failed"),
        }
    }
}

fn log_report(worker: &str, report: WorkerReport) {
    if report.applied > 0 || report.failed > 0 {
        tracing::info!(
            worker,
            checked = report.checked,
            applied = report.applied,
            failed = report.failed,
            "sweep complete"
        );
    } else {
        tracing::debug!(worker, checked = report.checked, "sweep complete");
    }
}
