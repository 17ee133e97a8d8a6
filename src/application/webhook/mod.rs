//! Webhook processing pipeline.
//!
//! - `signature` - HMAC-SHA256 verification of the gateway's signature header
//! - `ingest` - The idempotent event handler (ledger claim, routing, billing writes)
//! - `errors` - Pipeline errors and their HTTP mapping

mod errors;
mod ingest;
mod signature;

pub use errors::WebhookError;
pub use ingest::{IngestOutcome, SkipReason, WebhookIngestor};
pub use signature::WebhookVerifier;

#[cfg(test)]
pub use signature::compute_test_signature;
