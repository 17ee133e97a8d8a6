//! MercadoPago adapters - Payment gateway integration.
//!
//! This module provides the outbound client for the MercadoPago API:
//! - `MercadoPagoGateway` - Authoritative payment lookups with a bounded deadline

mod gateway;

pub use gateway::{MercadoPagoConfig, MercadoPagoGateway};
