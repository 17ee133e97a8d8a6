//! Payment gateway configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment gateway configuration (Mercado Pago)
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Mercado Pago access token
    pub access_token: String,

    /// Webhook signing secret shared with the gateway
    pub webhook_secret: String,

    /// Gateway API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout for gateway lookups, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl GatewayConfig {
    /// Check if using Mercado Pago sandbox credentials
    pub fn is_test_mode(&self) -> bool {
        self.access_token.starts_with("TEST-")
    }

    /// Check if using Mercado Pago production credentials
    pub fn is_live_mode(&self) -> bool {
        self.access_token.starts_with("APP_USR-")
    }

    /// Get the lookup timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.access_token.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__ACCESS_TOKEN"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__WEBHOOK_SECRET"));
        }

        // Verify token prefix for safety
        if !self.is_test_mode() && !self.is_live_mode() {
            return Err(ValidationError::InvalidAccessToken);
        }
        if self.webhook_secret.len() < 16 {
            return Err(ValidationError::WeakWebhookSecret);
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidApiBaseUrl);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout);
        }

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            webhook_secret: String::new(),
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}

fn default_timeout() -> u64 {
    5
}
