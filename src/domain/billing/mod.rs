//! Billing domain module.
//!
//! Handles the subscription lifecycle, payment tracking, dunning
//! escalation and penalty accrual.
//!
//! # Module Structure
//!
//! - `subscription` - Subscription aggregate entity
//! - `status` - SubscriptionStatus state machine
//! - `payment` - Payment entity
//! - `payment_status` - PaymentStatus as reported by the gateway
//! - `penalty` - Late-fee policy and calculation
//! - `dunning` - Consecutive-failure counter and escalation policy
//! - `external_reference` - `"{userId}-{planId}"` correlation value
//! - `gateway_event` - Inbound webhook event shapes and routing

mod dunning;
mod external_reference;
mod gateway_event;
mod payment;
mod payment_status;
mod penalty;
mod status;
mod subscription;

pub use dunning::{consecutive_failures, DunningPolicy, EscalationStep};
pub use external_reference::ExternalReference;
pub use gateway_event::{GatewayEvent, GatewayEventData, GatewayEventKind};
pub use payment::Payment;
pub use payment_status::PaymentStatus;
pub use penalty::{PenaltyBreakdown, PenaltyPolicy};
pub use status::SubscriptionStatus;
pub use subscription::Subscription;

#[cfg(test)]
pub use gateway_event::GatewayEventBuilder;
