//! Notification service configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Notification service configuration
///
/// Points the dispatcher at the HTTP notification service and sizes the
/// in-process delivery queue.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Notification service base URL
    pub service_url: String,

    /// Notification service API key
    pub api_key: String,

    /// In-process queue capacity between webhook handling and delivery
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Delivery attempts per notification before dropping it
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff between delivery retries, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl NotificationsConfig {
    /// Get the initial retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Validate notification configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.service_url.is_empty() {
            return Err(ValidationError::MissingRequired(
                "NOTIFICATIONS__SERVICE_URL",
            ));
        }
        if !self.service_url.starts_with("http://") && !self.service_url.starts_with("https://") {
            return Err(ValidationError::InvalidServiceUrl);
        }
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("NOTIFICATIONS__API_KEY"));
        }
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidRetryPolicy);
        }
        Ok(())
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            service_url: String::new(),
            api_key: String::new(),
            queue_capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> NotificationsConfig {
        NotificationsConfig {
            service_url: "https://notify.internal.example.com".to_string(),
            api_key: "nk_abc123".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn queue_defaults_are_sensible() {
        let config = NotificationsConfig::default();
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_backoff(), Duration::from_millis(500));
    }

    #[test]
    fn missing_service_url_fails_validation() {
        let config = NotificationsConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_http_service_url_fails_validation() {
        let config = NotificationsConfig {
            service_url: "notify.internal.example.com".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_api_key_fails_validation() {
        let config = NotificationsConfig {
            api_key: String::new(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_queue_capacity_fails_validation() {
        let config = NotificationsConfig {
            queue_capacity: 0,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_attempts_fail_validation() {
        let config = NotificationsConfig {
            max_attempts: 0,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }
}
