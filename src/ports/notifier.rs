//! Notifier port - outbound user notifications.
//!
//! The billing engine never talks to a mail or push provider directly;
//! it hands a [`NotificationRequest`] to this port and moves on.
//! Delivery is best-effort by contract: a lost notification must never
//! fail, retry, or roll back the billing write that triggered it, which
//! is why callers enqueue after commit rather than inside the
//! transaction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, UserId};

/// Port for delivering user notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// - `NotificationError` on provider failure; callers treat this as
    ///   loggable, never as grounds to fail billing work
    async fn notify(&self, request: &NotificationRequest) -> Result<(), DomainError>;
}

/// The catalogue of notifications the billing engine sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A payment was approved and recorded.
    PaymentReceived,

    /// The subscription (re)entered active after an approved payment.
    SubscriptionActivated,

    /// A payment was rejected; metadata carries the attempt count.
    PaymentFailed,

    /// Consecutive failures or an expired grace window suspended access.
    SubscriptionSuspended,

    /// Upcoming billing date; metadata carries days until due.
    PaymentReminder,

    /// A late fee was added to an unpaid payment.
    PenaltyApplied,

    /// The grace window lapsed without payment.
    GraceExpired,
}

impl NotificationKind {
    /// Parse from stored string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "payment_received" => Some(NotificationKind::PaymentReceived),
            "subscription_activated" => Some(NotificationKind::SubscriptionActivated),
            "payment_failed" => Some(NotificationKind::PaymentFailed),
            "subscription_suspended" => Some(NotificationKind::SubscriptionSuspended),
            "payment_reminder" => Some(NotificationKind::PaymentReminder),
            "penalty_applied" => Some(NotificationKind::PenaltyApplied),
            "grace_expired" => Some(NotificationKind::GraceExpired),
            _ => None,
        }
    }

    /// Stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PaymentReceived => "payment_received",
            NotificationKind::SubscriptionActivated => "subscription_activated",
            NotificationKind::PaymentFailed => "payment_failed",
            NotificationKind::SubscriptionSuspended => "subscription_suspended",
            NotificationKind::PaymentReminder => "payment_reminder",
            NotificationKind::PenaltyApplied => "penalty_applied",
            NotificationKind::GraceExpired => "grace_expired",
        }
    }

    /// Default subject line for this kind.
    pub fn default_subject(&self) -> &'static str {
        match self {
            NotificationKind::PaymentReceived => "Payment received",
            NotificationKind::SubscriptionActivated => "Your subscription is active",
            NotificationKind::PaymentFailed => "Payment failed",
            NotificationKind::SubscriptionSuspended => "Subscription suspended",
            NotificationKind::PaymentReminder => "Upcoming payment",
            NotificationKind::PenaltyApplied => "Late fee applied",
            NotificationKind::GraceExpired => "Grace period expired",
        }
    }

    /// Template name the delivery side renders with the metadata.
    pub fn template(&self) -> &'static str {
        match self {
            NotificationKind::PaymentReceived => "billing/payment_received",
            NotificationKind::SubscriptionActivated => "billing/subscription_activated",
            NotificationKind::PaymentFailed => "billing/payment_failed",
            NotificationKind::SubscriptionSuspended => "billing/subscription_suspended",
            NotificationKind::PaymentReminder => "billing/payment_reminder",
            NotificationKind::PenaltyApplied => "billing/penalty_applied",
            NotificationKind::GraceExpired => "billing/grace_expired",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One notification to deliver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// The user this notification concerns.
    pub user_id: UserId,

    /// Which catalogue entry this is.
    pub kind: NotificationKind,

    /// Delivery address (email today; the port doesn't care).
    pub recipient: String,

    /// Subject line.
    pub subject: String,

    /// Template name for the delivery side.
    pub template: String,

    /// Template variables (amounts, dates, attempt counts).
    pub metadata: serde_json::Value,
}

impl NotificationRequest {
    /// Build a request with the kind's default subject and template.
    pub fn new(user_id: UserId, kind: NotificationKind, recipient: impl Into<String>) -> Self {
        Self {
            user_id,
            kind,
            recipient: recipient.into(),
            subject: kind.default_subject().to_string(),
            template: kind.template().to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach template metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Override the default subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }
}
