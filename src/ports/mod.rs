//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Billing Ports
//!
//! - `BillingStore` / `BillingTxn` - Transactional subscription + payment persistence
//! - `WebhookLedger` - Webhook event idempotency tracking
//! - `ReminderLog` - Per-day dedup record for payment reminders
//!
//! ## Outbound Ports
//!
//! - `PaymentGateway` - Authoritative payment detail lookup
//! - `Notifier` - Best-effort user notifications

mod billing_store;
mod notifier;
mod payment_gateway;
mod reminder_log;
mod webhook_ledger;

pub use billing_store::{BillingStore, BillingTxn};
pub use notifier::{NotificationKind, NotificationRequest, Notifier};
pub use payment_gateway::{GatewayError, GatewayErrorCode, PaymentDetail, PaymentGateway};
pub use reminder_log::ReminderLog;
pub use webhook_ledger::{ClaimOutcome, LedgerEntry, WebhookLedger};
