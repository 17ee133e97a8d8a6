//! PostgreSQL adapters - Database implementations for the storage ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresBillingStore` - Transactional subscriptions + payments store
//! - `PostgresWebhookLedger` - Inbound-event idempotency ledger
//! - `PostgresReminderLog` - Reminder dedup log

mod billing_store;
mod reminder_log;
mod webhook_ledger;

pub use billing_store::PostgresBillingStore;
pub use reminder_log::PostgresReminderLog;
pub use webhook_ledger::PostgresWebhookLedger;
