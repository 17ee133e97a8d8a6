//! HTTP adapter for gateway webhook delivery.
//!
//! Exposes the billing engine's single inbound surface:
//! - `POST /webhooks/mercadopago` - Ingest a signed gateway event
//!
//! Authentication is the signature header itself; these routes mount
//! outside user-auth middleware.

mod dto;
mod handlers;
mod routes;

pub use dto::ErrorResponse;
pub use handlers::{handle_gateway_webhook, BillingAppState, SIGNATURE_HEADER};
pub use routes::webhook_routes;
