//! Gateway webhook signature verification.
//!
//! Implements secure verification of webhook signatures using HMAC-SHA256.
//! Includes timestamp validation to prevent replay attacks.
//!
//! The gateway signs a manifest built from the event it delivers, not the
//! raw body bytes: `id=<data.id>&type=<type>&ts=<timestamp>`. Redelivered
//! events are re-signed with a fresh timestamp, so the replay window never
//! blocks a legitimate retry.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;
use crate::domain::billing::GatewayEvent;
use crate::domain::foundation::Timestamp;

/// Maximum allowed age for webhook events (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the X-Webhook-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signature (HMAC-SHA256).
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses an X-Webhook-Signature header string.
    ///
    /// Format: `ts=<timestamp>,v1=<signature>`
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::MalformedHeader` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                WebhookError::MalformedHeader("invalid header format".to_string())
            })?;

            match key {
                "ts" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::MalformedHeader("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex::decode(value).map_err(|_| {
                        WebhookError::MalformedHeader("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| WebhookError::MalformedHeader("missing timestamp".to_string()))?;
        let v1_signature = v1_signature
            .ok_or_else(|| WebhookError::MalformedHeader("missing v1 signature".to_string()))?;

        Ok(SignatureHeader {
            timestamp,
            v1_signature,
        })
    }
}

/// Verifier for gateway webhook signatures.
pub struct WebhookVerifier {
    /// The webhook signing secret shared with the gateway.
    secret: SecretString,
}

impl WebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies the signature header against the delivered event.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate timestamp is within acceptable range of `now`
    /// 3. Compute expected signature over the event manifest
    /// 4. Compare signatures using constant-time comparison
    ///
    /// # Errors
    ///
    /// - `MalformedHeader` - Header missing or not parseable
    /// - `TimestampOutOfRange` - Signature is older than 5 minutes
    /// - `InvalidTimestamp` - Signature timestamp is in the future
    /// - `InvalidSignature` - Signature verification failed
    pub fn verify(
        &self,
        event: &GatewayEvent,
        signature_header: &str,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        // 1. Parse signature header
        let header = SignatureHeader::parse(signature_header)?;

        // 2. Validate timestamp
        self.validate_timestamp(header.timestamp, now)?;

        // 3. Compute expected signature
        let expected_signature =
            self.compute_signature(&event.data.id, &event.event_type, header.timestamp);

        // 4. Compare signatures (constant-time)
        if !constant_time_compare(&expected_signature, &header.v1_signature) {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Validates that the timestamp is within acceptable bounds of `now`.
    fn validate_timestamp(&self, timestamp: i64, now: Timestamp) -> Result<(), WebhookError> {
        let age = now.as_unix_secs().saturating_sub(timestamp);

        // Reject signatures that are too old
        if age > MAX_EVENT_AGE_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }

        // Reject signatures from the future (with clock skew tolerance)
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        Ok(())
    }

    /// Computes the HMAC-SHA256 signature for the event manifest.
    fn compute_signature(&self, resource_id: &str, event_type: &str, timestamp: i64) -> Vec<u8> {
        let manifest = format!("id={}&type={}&ts={}", resource_id, event_type, timestamp);

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key");
        mac.update(manifest.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a hex HMAC-SHA256 signature for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(
    secret: &str,
    resource_id: &str,
    event_type: &str,
    timestamp: i64,
) -> String {
    let manifest = format!("id={}&type={}&ts={}", resource_id, event_type, timestamp);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(manifest.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
