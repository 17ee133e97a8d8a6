//! In-memory adapters for tests.
//!
//! Deterministic implementations of the billing ports, shared by unit
//! tests and the integration suite. They honor the same contracts as
//! the Postgres adapters (staged transactional writes, idempotent
//! ledger claims) without a database.

mod billing_store;
mod notifier;
mod payment_gateway;
mod reminder_log;
mod webhook_ledger;

pub use billing_store::InMemoryBillingStore;
pub use notifier::InMemoryNotifier;
pub use payment_gateway::StubPaymentGateway;
pub use reminder_log::InMemoryReminderLog;
pub use webhook_ledger::InMemoryWebhookLedger;
