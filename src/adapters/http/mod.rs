//! HTTP adapters - inbound REST surface.
//!
//! The billing engine exposes one inbound route (the signed gateway
//! webhook) plus a health probe; `server` assembles and runs them.

pub mod server;
pub mod webhook;

// Re-export key types for convenience
pub use server::{app_router, serve};
pub use webhook::{webhook_routes, BillingAppState};
