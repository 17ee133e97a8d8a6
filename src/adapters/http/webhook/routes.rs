//! Axum router configuration for the gateway webhook endpoint.
//!
//! Webhooks authenticate with the signature header instead of a user
//! session, so this router mounts outside any auth middleware.

use axum::routing::post;
use axum::Router;

use super::handlers::{handle_gateway_webhook, BillingAppState};

/// Create the webhook router.
///
/// # Routes
/// - `POST /mercadopago` - Ingest a signed gateway delivery
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/mercadopago", post(handle_gateway_webhook))
}
