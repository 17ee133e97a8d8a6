//! MercadoPago payment gateway adapter.
//!
//! Implements the `PaymentGateway` port over the MercadoPago Payments
//! API. The webhook handler calls it once per payment event to fetch
//! the authoritative charge state; the notification body itself is
//! never trusted.
//!
//! # Configuration
//!
//! ```ignore
//! let config = MercadoPagoConfig::new(access_token);
//! let gateway = MercadoPagoGateway::new(config);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::Timestamp;
use crate::ports::{GatewayError, GatewayErrorCode, PaymentDetail, PaymentGateway};

/// Default per-request deadline for payment lookups.
///
/// A slow gateway must fail the webhook event rather than hold the
/// request open; redelivery retries it.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// MercadoPago API configuration.
#[derive(Clone)]
pub struct MercadoPagoConfig {
    /// API access token (APP_USR-... or TEST-...).
    access_token: SecretString,

    /// Base URL for the MercadoPago API.
    api_base_url: String,

    /// Per-request deadline.
    timeout: Duration,
}

impl MercadoPagoConfig {
    /// Create a new MercadoPago configuration.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            api_base_url: "https://api.mercadopago.com".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// MercadoPago implementation of [`PaymentGateway`].
pub struct MercadoPagoGateway {
    config: MercadoPagoConfig,
    http_client: reqwest::Client,
}

impl MercadoPagoGateway {
    /// Create a new gateway adapter with the given configuration.
    pub fn new(config: MercadoPagoConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn fetch_payment_detail(&self, payment_id: &str) -> Result<PaymentDetail, GatewayError> {
        let url = format!("{}/v1/payments/{}", self.config.api_base_url, payment_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::timeout(format!(
                        "Payment lookup exceeded {:?} deadline",
                        self.config.timeout
                    ))
                } else {
                    GatewayError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = map_api_error(status, &body);
            tracing::warn!(
                payment_id,
                status = status.as_u16(),
                code = %err.code,
                "MercadoPago payment lookup failed"
            );
            return Err(err);
        }

        let raw: PaymentResponse = response.json().await.map_err(|e| {
            GatewayError::invalid_response(format!("Failed to parse payment response: {}", e))
        })?;

        Ok(PaymentDetail::from(raw))
    }
}

/// Payment resource as the API returns it.
///
/// Amounts come back in currency units with decimals; the domain works
/// in cents, so the conversion happens here and nowhere else.
#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: i64,
    status: String,
    external_reference: Option<String>,
    transaction_amount: f64,
    currency_id: String,
    date_approved: Option<DateTime<Utc>>,
}

impl From<PaymentResponse> for PaymentDetail {
    fn from(raw: PaymentResponse) -> Self {
        PaymentDetail {
            id: raw.id.to_string(),
            status: raw.status,
            external_reference: raw.external_reference,
            transaction_amount: (raw.transaction_amount * 100.0).round() as i64,
            currency: raw.currency_id,
            date_approved: raw.date_approved.map(Timestamp::from_datetime),
        }
    }
}

/// Error body the API attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn map_api_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    let detail = parsed
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| body.to_string());

    let err = match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            GatewayError::authentication(format!("Gateway rejected credentials: {}", detail))
        }
        reqwest::StatusCode::NOT_FOUND => GatewayError::not_found("Payment"),
        reqwest::StatusCode::TOO_MANY_REQUESTS => GatewayError::new(
            GatewayErrorCode::RateLimitExceeded,
            "Gateway rate limit exceeded",
        ),
        s => GatewayError::new(
            GatewayErrorCode::ProviderError,
            format!("Gateway API error {}: {}", s.as_u16(), detail),
        ),
    };

    match parsed.and_then(|e| e.error) {
        Some(code) => err.with_provider_code(code),
        None => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MercadoPagoConfig {
        MercadoPagoConfig::new("TEST-access-token")
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_new_sets_defaults() {
        let config = test_config();
        assert_eq!(config.api_base_url, "https://api.mercadopago.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_with_base_url() {
        let config = test_config().with_base_url("http://localhost:9000");
        assert_eq!(config.api_base_url, "http://localhost:9000");
    }

    #[test]
    fn config_with_timeout() {
        let config = test_config().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Response Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn payment_response_maps_to_detail() {
        let json = r#"{
            "id": 123456789,
            "status": "approved",
            "status_detail": "accredited",
            "external_reference": "42-7",
            "transaction_amount": 105.5,
            "currency_id": "ARS",
            "date_approved": "2024-01-15T10:00:00.000-04:00",
            "payment_method_id": "master"
        }"#;

        let raw: PaymentResponse = serde_json::from_str(json).unwrap();
        let detail = PaymentDetail::from(raw);

        assert_eq!(detail.id, "123456789");
        assert_eq!(detail.status, "approved");
        assert_eq!(detail.external_reference.as_deref(), Some("42-7"));
        assert_eq!(detail.transaction_amount, 10_550);
        assert_eq!(detail.currency, "ARS");
        // -04:00 offset normalizes to 14:00 UTC.
        assert_eq!(
            detail.date_approved,
            Some(Timestamp::from_unix_secs(1_705_327_200))
        );
    }

    #[test]
    fn payment_response_without_reference_or_approval() {
        let json = r#"{
            "id": 555,
            "status": "pending",
            "external_reference": null,
            "transaction_amount": 100.0,
            "currency_id": "ARS",
            "date_approved": null
        }"#;

        let raw: PaymentResponse = serde_json::from_str(json).unwrap();
        let detail = PaymentDetail::from(raw);

        assert!(detail.external_reference.is_none());
        assert!(detail.date_approved.is_none());
        assert_eq!(detail.transaction_amount, 10_000);
    }

    #[test]
    fn whole_unit_amount_converts_exactly() {
        let raw = PaymentResponse {
            id: 1,
            status: "approved".to_string(),
            external_reference: None,
            transaction_amount: 19.99,
            currency_id: "BRL".to_string(),
            date_approved: None,
        };

        let detail = PaymentDetail::from(raw);
        assert_eq!(detail.transaction_amount, 1_999);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn unauthorized_maps_to_authentication_error() {
        let err = map_api_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"message":"invalid access token","error":"bad_request","status":401}"#,
        );
        assert_eq!(err.code, GatewayErrorCode::AuthenticationError);
        assert!(!err.retryable);
        assert_eq!(err.provider_code.as_deref(), Some("bad_request"));
    }

    #[test]
    fn not_found_maps_to_not_found() {
        let err = map_api_error(reqwest::StatusCode::NOT_FOUND, "");
        assert_eq!(err.code, GatewayErrorCode::NotFound);
        assert!(!err.retryable);
    }

    #[test]
    fn rate_limit_maps_to_retryable() {
        let err = map_api_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.code, GatewayErrorCode::RateLimitExceeded);
        assert!(err.retryable);
    }

    #[test]
    fn server_error_maps_to_retryable_provider_error() {
        let err = map_api_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "upstream down");
        assert_eq!(err.code, GatewayErrorCode::ProviderError);
        assert!(err.retryable);
        assert!(err.message.contains("500"));
    }

    #[test]
    fn non_json_error_body_is_carried_verbatim() {
        let err = map_api_error(reqwest::StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>");
        assert!(err.message.contains("Bad Gateway"));
        assert!(err.provider_code.is_none());
    }
}
