//! Scripted payment gateway for testing.
//!
//! Responses are keyed by payment id so a test can stage approvals,
//! rejections and transport failures before delivering events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{GatewayError, PaymentDetail, PaymentGateway};

/// Payment gateway stub with programmable per-payment responses.
///
/// Unscripted ids come back as `NotFound`, which is how the real API
/// answers for ids it never issued.
#[derive(Default)]
pub struct StubPaymentGateway {
    responses: Mutex<HashMap<String, Result<PaymentDetail, GatewayError>>>,
    calls: AtomicU32,
}

impl StubPaymentGateway {
    /// Creates a stub with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful lookup for a payment id.
    pub fn respond(&self, payment_id: &str, detail: PaymentDetail) {
        self.responses
            .lock()
            .expect("StubPaymentGateway: lock poisoned")
            .insert(payment_id.to_string(), Ok(detail));
    }

    /// Script a failing lookup for a payment id.
    pub fn fail(&self, payment_id: &str, err: GatewayError) {
        self.responses
            .lock()
            .expect("StubPaymentGateway: lock poisoned")
            .insert(payment_id.to_string(), Err(err));
    }

    /// Number of lookups performed (for test assertions).
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for StubPaymentGateway {
    async fn fetch_payment_detail(&self, payment_id: &str) -> Result<PaymentDetail, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .expect("StubPaymentGateway: lock poisoned")
            .get(payment_id)
            .cloned()
            .unwrap_or_else(|| Err(GatewayError::not_found("Payment")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unscripted_id_answers_not_found() {
        let gateway = StubPaymentGateway::new();

        let err = gateway.fetch_payment_detail("pay_unknown").await.unwrap_err();
        assert_eq!(err.code, crate::ports::GatewayErrorCode::NotFound);
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn scripted_response_is_returned() {
        let gateway = StubPaymentGateway::new();
        gateway.respond(
            "pay_1",
            PaymentDetail {
                id: "pay_1".to_string(),
                status: "approved".to_string(),
                external_reference: Some("42-7".to_string()),
                transaction_amount: 10_000,
                currency: "USD".to_string(),
                date_approved: None,
            },
        );

        let detail = gateway.fetch_payment_detail("pay_1").await.unwrap();
        assert_eq!(detail.status, "approved");
    }
}
