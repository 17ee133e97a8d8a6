//! Application layer - Webhook ingestion and background workers.
//!
//! Orchestrates domain operations across the ports: the webhook ingestor
//! is the event-driven write path, the workers are the scheduled one.
//! Neither layer talks to concrete adapters.

pub mod webhook;
pub mod workers;

pub use webhook::{IngestOutcome, SkipReason, WebhookError, WebhookIngestor, WebhookVerifier};
pub use workers::{
    GraceExpiryWorker, PenaltyWorker, ReminderWorker, SchedulerConfig, WorkerReport,
    WorkerScheduler,
};
