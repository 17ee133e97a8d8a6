//! Webhook error types for gateway webhook handling.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics.
//!
//! The status mapping is the contract with gateway redelivery: only
//! signature failures (401) and unparseable bodies (400) surface as HTTP
//! errors. Downstream failures acknowledge with 200 while the ledger row
//! stays unprocessed, so the gateway's redelivery schedule is what
//! retries them.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature header was missing or not in `ts=...,v1=...` form.
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// Webhook timestamp is outside the acceptable window (5 minutes).
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the webhook payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Payment gateway lookup failed; event stays unprocessed.
    #[error("Gateway error: {0}")]
    Gateway(DomainError),

    /// Persistence failed; event stays unprocessed.
    #[error("Database error: {0}")]
    Database(DomainError),
}

impl WebhookError {
    /// Returns true if gateway redelivery can eventually succeed.
    ///
    /// Retryable errors leave the ledger row unprocessed; the next
    /// delivery of the same event id runs the full flow again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Gateway(_) | WebhookError::Database(_))
    }

    /// Maps the error to the HTTP status the webhook endpoint returns.
    ///
    /// Status codes determine the gateway's retry behavior:
    /// - 2xx: Event acknowledged; redelivery of unprocessed events still happens
    /// - 401: Signature rejected, delivery dropped
    /// - 400: Malformed body, delivery dropped
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failures, including replay-window violations
            WebhookError::InvalidSignature
            | WebhookError::MalformedHeader(_)
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => StatusCode::UNAUTHORIZED,

            // Body we cannot read
            WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,

            // Acknowledged; the unprocessed ledger row drives the retry
            WebhookError::Gateway(_) | WebhookError::Database(_) => StatusCode::OK,
        }
    }
}
