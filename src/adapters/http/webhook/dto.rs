//! HTTP DTOs for the webhook endpoint.
//!
//! The webhook surface is deliberately small: inbound bodies are parsed
//! straight into the domain's `GatewayEvent`, so only the error shape
//! lives here.

use serde::Serialize;

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_serializes_code_and_message() {
        let response = ErrorResponse::new("INVALID_SIGNATURE", "Invalid signature");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["error_code"], "INVALID_SIGNATURE");
        assert_eq!(json["message"], "Invalid signature");
    }
}
