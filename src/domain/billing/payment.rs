//! Payment entity.
//!
//! One row per charge attempt against a subscription. Rows are created
//! by the billing cycle ahead of their due date (pending) or by the
//! webhook path on first sight of a gateway transaction id, and are
//! never deleted.
//!
//! # Invariants
//!
//! - `gateway_transaction_id` is unique (upserts key on it)
//! - `total_amount = amount + penalty_fee` at all times
//! - `penalty_fee` is written at most once (never recalculated)

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, SubscriptionId, Timestamp, UserId,
};

use super::PaymentStatus;

/// A single payment attempt. Money is integer cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier for this payment row.
    pub id: PaymentId,

    /// User the charge belongs to.
    pub user_id: UserId,

    /// Subscription the charge belongs to.
    pub subscription_id: SubscriptionId,

    /// Gateway transaction id; unique, the upsert key for webhooks.
    pub gateway_transaction_id: String,

    /// Base amount in cents.
    pub amount: i64,

    /// Late fee in cents; zero until the penalty worker writes it once.
    pub penalty_fee: i64,

    /// `amount + penalty_fee`.
    pub total_amount: i64,

    /// Current status as last reported by the gateway.
    pub status: PaymentStatus,

    /// When the charge was (or is) due.
    pub due_date: Timestamp,

    /// When the gateway approved the charge.
    pub paid_at: Option<Timestamp>,

    /// Opaque gateway payload kept for audit.
    pub gateway_metadata: serde_json::Value,

    /// When the row was created.
    pub created_at: Timestamp,

    /// When the row was last updated.
    pub updated_at: Timestamp,
}

impl Payment {
    /// Creates a pending payment ahead of its due date.
    pub fn pending(
        id: PaymentId,
        user_id: UserId,
        subscription_id: SubscriptionId,
        gateway_transaction_id: impl Into<String>,
        amount: i64,
        due_date: Timestamp,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            subscription_id,
            gateway_transaction_id: gateway_transaction_id.into(),
            amount,
            penalty_fee: 0,
            total_amount: amount,
            status: PaymentStatus::Pending,
            due_date,
            paid_at: None,
            gateway_metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a payment row from an authoritative gateway detail, for
    /// transactions first seen via webhook.
    #[allow(clippy::too_many_arguments)]
    pub fn from_gateway(
        id: PaymentId,
        user_id: UserId,
        subscription_id: SubscriptionId,
        gateway_transaction_id: impl Into<String>,
        amount: i64,
        status: PaymentStatus,
        paid_at: Option<Timestamp>,
        gateway_metadata: serde_json::Value,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            subscription_id,
            gateway_transaction_id: gateway_transaction_id.into(),
            amount,
            penalty_fee: 0,
            total_amount: amount,
            status,
            due_date: now,
            paid_at,
            gateway_metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites status and settlement fields with gateway truth.
    ///
    /// The gateway is authoritative for status, so this is not guarded by
    /// a state machine; redelivered webhooks land on the same values.
    pub fn record_gateway_status(
        &mut self,
        status: PaymentStatus,
        paid_at: Option<Timestamp>,
        gateway_metadata: serde_json::Value,
        now: Timestamp,
    ) {
        self.status = status;
        if paid_at.is_some() {
            self.paid_at = paid_at;
        }
        if !gateway_metadata.is_null() {
            self.gateway_metadata = gateway_metadata;
        }
        self.updated_at = now;
    }

    /// Writes the late fee exactly once.
    ///
    /// # Errors
    ///
    /// Returns `PenaltyAlreadyApplied` if a non-zero fee is already set;
    /// callers treat that as "someone else got here first", not a fault.
    pub fn apply_penalty(&mut self, fee: i64, now: Timestamp) -> Result<(), DomainError> {
        if self.penalty_fee != 0 {
            return Err(DomainError::new(
                ErrorCode::PenaltyAlreadyApplied,
                format!(
                    "Payment {} already carries a penalty of {} cents",
                    self.id, self.penalty_fee
                ),
            ));
        }

        self.penalty_fee = fee;
        self.total_amount = self.amount + fee;
        self.updated_at = now;
        Ok(())
    }

    /// True when the penalty worker should pick this row up: still
    /// pending, past due beyond the grace window, and not yet penalized.
    pub fn is_penalty_candidate(&self, now: Timestamp, grace_days: i64) -> bool {
        self.status == PaymentStatus::Pending
            && self.penalty_fee == 0
            && self.due_date.is_before(&now.minus_days(grace_days))
    }
}
