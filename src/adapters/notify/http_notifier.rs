//! HTTP notifier - client for the notification service.
//!
//! Posts each request to the platform's notification service, which
//! renders the template and handles the actual email/push delivery.
//! The contract is `notify(user, type, recipient, subject, template,
//! metadata) → {success, error?}`; everything that goes wrong maps to
//! `NotificationError` and is the dispatcher's problem to retry.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{NotificationRequest, Notifier};

/// Default per-request deadline for the notification service.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the notification service client.
#[derive(Clone)]
pub struct NotifierConfig {
    /// Bearer token for the notification service.
    api_key: SecretString,

    /// Base URL of the notification service.
    base_url: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl NotifierConfig {
    /// Create config for a service at `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Notifier implementation backed by the notification service's REST API.
pub struct HttpNotifier {
    config: NotifierConfig,
    http_client: reqwest::Client,
}

impl HttpNotifier {
    /// Create a new client.
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, request: &NotificationRequest) -> Result<(), DomainError> {
        let url = format!("{}/notifications", self.config.base_url);
        let body = NotifyBody::from(request);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::NotificationError,
                    format!("Notification request failed: {}", e),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                format!("Notification service error {}: {}", status, detail),
            ));
        }

        let ack: NotifyAck = response.json().await.map_err(|e| {
            DomainError::new(
                ErrorCode::NotificationError,
                format!("Invalid notification service response: {}", e),
            )
        })?;

        if !ack.success {
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                ack.error
                    .unwrap_or_else(|| "delivery refused without detail".to_string()),
            ));
        }

        Ok(())
    }
}

/// Wire body for the notification service.
#[derive(Debug, Serialize)]
struct NotifyBody<'a> {
    user_id: i64,
    #[serde(rename = "type")]
    kind: &'a str,
    recipient: &'a str,
    subject: &'a str,
    template: &'a str,
    metadata: &'a serde_json::Value,
}

impl<'a> From<&'a NotificationRequest> for NotifyBody<'a> {
    fn from(request: &'a NotificationRequest) -> Self {
        Self {
            user_id: request.user_id.as_i64(),
            kind: request.kind.as_str(),
            recipient: &request.recipient,
            subject: &request.subject,
            template: &request.template,
            metadata: &request.metadata,
        }
    }
}

/// Wire response from the notification service.
#[derive(Debug, Deserialize)]
struct NotifyAck {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}
