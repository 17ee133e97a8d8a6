//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - sqlx-backed billing store, webhook ledger and reminder log
//! - `mercadopago` - Payment gateway REST client
//! - `http` - Inbound webhook endpoint and server assembly
//! - `notify` - Notification service client and delivery dispatcher
//! - `memory` - Deterministic in-memory ports for tests

pub mod http;
pub mod memory;
pub mod mercadopago;
pub mod notify;
pub mod postgres;

pub use mercadopago::{MercadoPagoConfig, MercadoPagoGateway};
pub use notify::{NotificationDispatcher, NotifierConfig};
pub use postgres::{PostgresBillingStore, PostgresReminderLog, PostgresWebhookLedger};
