//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, clock, errors)
//! - `billing` - Subscription lifecycle, payments, dunning and penalties

pub mod billing;
pub mod foundation;
