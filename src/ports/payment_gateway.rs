//! Payment gateway port for fetching authoritative payment state.
//!
//! The inbound webhook is only a pointer; this port is the single source
//! of truth for what a payment actually is. One operation, because the
//! core never creates charges or preferences (checkout lives elsewhere).
//!
//! # Design
//!
//! - **Gateway agnostic**: Interface works with any payment provider
//! - **Injected**: Constructed once at startup, never a global singleton
//! - **Bounded**: Implementations must enforce a request timeout; a slow
//!   gateway fails the event and leaves the ledger retryable

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::PaymentStatus;
use crate::domain::foundation::{DomainError, Timestamp};

/// Port for querying the payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Fetch the authoritative detail for a gateway payment id.
    ///
    /// Called once per payment event; a timeout or transport failure
    /// must surface as a retryable [`GatewayError`] so the whole event
    /// fails and redelivery retries it.
    async fn fetch_payment_detail(&self, payment_id: &str) -> Result<PaymentDetail, GatewayError>;
}

/// Authoritative payment state as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetail {
    /// Gateway transaction id.
    pub id: String,

    /// Raw gateway status string; unknown values are logged, not errors.
    pub status: String,

    /// `"{userId}-{planId}"` correlation set at preference creation.
    /// Absent or malformed references make the event a permanent skip.
    pub external_reference: Option<String>,

    /// Charged amount in cents.
    pub transaction_amount: i64,

    /// ISO currency code.
    pub currency: String,

    /// When the gateway approved the charge, if it did.
    pub date_approved: Option<Timestamp>,
}

impl PaymentDetail {
    /// Parses the raw status into the closed domain set.
    pub fn parsed_status(&self) -> Option<PaymentStatus> {
        PaymentStatus::parse(&self.status)
    }
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    /// Create a new gateway error.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        use crate::domain::foundation::ErrorCode;

        let code = match err.code {
            GatewayErrorCode::Timeout => ErrorCode::GatewayTimeout,
            _ => ErrorCode::GatewayError,
        };

        DomainError::new(code, err.message).with_detail("gateway_code", err.code.to_string())
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Request exceeded the configured deadline.
    Timeout,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Response did not match the expected schema.
    InvalidResponse,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError
                | GatewayErrorCode::Timeout
                | GatewayErrorCode::RateLimitExceeded
                | GatewayErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::InvalidResponse => "invalid_response",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
