//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the clock seam, and error types
//! that form the vocabulary of the Backline billing domain.

mod clock;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{PaymentId, PlanId, SubscriptionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
