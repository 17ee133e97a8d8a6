//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid timeout value")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Mercado Pago access token must start with TEST- or APP_USR-")]
    InvalidAccessToken,

    #[error("Gateway API base URL must be http(s)")]
    InvalidApiBaseUrl,

    #[error("Webhook secret must be at least 16 characters")]
    WeakWebhookSecret,

    #[error("Notification service URL must be http(s)")]
    InvalidServiceUrl,

    #[error("Notification queue capacity must be positive")]
    InvalidQueueCapacity,

    #[error("Notification retry attempts must be positive")]
    InvalidRetryPolicy,

    #[error("Grace window must be at least one day")]
    InvalidGraceWindow,

    #[error("Failure scan window must be positive")]
    InvalidScanWindow,

    #[error("Penalty rate exceeds 100%")]
    InvalidPenaltyRate,

    #[error("Worker interval must be positive")]
    InvalidInterval,

    #[error("Retention window must be at least one day")]
    InvalidRetention,
}
