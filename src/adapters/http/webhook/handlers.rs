//! HTTP handler for the gateway webhook endpoint.
//!
//! Translates an HTTP delivery into a `GatewayEvent` plus its signature
//! header and hands both to the ingestor. The status contract is the
//! gateway's retry protocol: 401 and 400 drop the delivery, 200 (even
//! for downstream failures) keeps redelivery driven by the unprocessed
//! ledger row.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};

use crate::application::webhook::{WebhookError, WebhookIngestor};
use crate::domain::billing::GatewayEvent;

use super::dto::ErrorResponse;

/// Header carrying the `ts=...,v1=...` signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Shared state for the webhook routes.
///
/// Cloned per request; the ingestor is Arc-wrapped so clones are cheap.
#[derive(Clone)]
pub struct BillingAppState {
    pub ingestor: Arc<WebhookIngestor>,
}

/// POST /webhooks/mercadopago - Ingest one signed gateway delivery.
///
/// The raw body is read as bytes so parsing failures map to 400 rather
/// than axum's default rejection, and the signature header is verified
/// by the ingestor before anything touches storage.
pub async fn handle_gateway_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            WebhookError::MalformedHeader(format!("missing {} header", SIGNATURE_HEADER))
        })?;

    let event: GatewayEvent =
        serde_json::from_slice(&body).map_err(|e| WebhookError::ParseError(e.to_string()))?;

    state.ingestor.ingest(event, signature).await?;

    Ok(StatusCode::OK)
}

/// API error wrapper mapping pipeline errors to HTTP responses.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();

        // Retryable failures acknowledge with an empty 200; the ledger
        // row stays unprocessed and the gateway redelivers.
        if status == StatusCode::OK {
            tracing::warn!(error = %self.0, "webhook acknowledged with processing failure");
            return status.into_response();
        }

        let error_code = match &self.0 {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::MalformedHeader(_) => "MALFORMED_SIGNATURE_HEADER",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
            WebhookError::ParseError(_) => "PARSE_ERROR",
            WebhookError::Gateway(_) | WebhookError::Database(_) => "PROCESSING_FAILED",
        };

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
