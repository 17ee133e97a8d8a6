//! Payment status as reported by the gateway.

use serde::{Deserialize, Serialize};

/// Status of a single payment attempt.
///
/// The gateway is authoritative: webhooks overwrite this with whatever
/// `fetch_payment_detail` returns, so unlike the subscription status this
/// is not a guarded state machine. Rows move pending -> approved or
/// pending -> rejected in practice; a rejected row is terminal for
/// dunning purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting settlement; the row exists before its due date.
    Pending,

    /// Gateway confirmed the charge.
    Approved,

    /// Gateway declined the charge.
    Rejected,

    /// Charge reversed after approval.
    Refunded,
}

impl PaymentStatus {
    /// Parses a gateway status string. Unknown values come back as None
    /// so callers decide whether that is a skip or an error.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "approved" => Some(PaymentStatus::Approved),
            "rejected" => Some(PaymentStatus::Rejected),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    /// Canonical wire/storage spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Refunded => "refunded",
        }
    }
}
