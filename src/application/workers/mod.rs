//! Scheduled billing workers.
//!
//! Three sweeps over billing state, each driven by the injected clock
//! and isolated per row so one bad row never blocks the rest of a batch:
//!
//! - `reminder` - Upcoming-billing reminders at fixed day windows
//! - `penalty` - Late fees on overdue pending payments
//! - `grace_expiry` - Suspension of past-due subscriptions whose grace lapsed
//!
//! `scheduler` owns the run loop: per-worker intervals, retention
//! pruning, and graceful shutdown.

mod grace_expiry;
mod penalty;
mod reminder;
mod scheduler;

pub use grace_expiry::GraceExpiryWorker;
pub use penalty::PenaltyWorker;
pub use reminder::ReminderWorker;
pub use scheduler::{SchedulerConfig, WorkerScheduler};

/// Outcome counts for one worker sweep.
///
/// `checked` counts scan candidates, `applied` the rows whose change
/// (or send) landed, `failed` the rows that errored and stay eligible
/// for the next sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub checked: u32,
    pub applied: u32,
    pub failed: u32,
}
