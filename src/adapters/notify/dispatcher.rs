//! NotificationDispatcher - Background delivery of queued notifications.
//!
//! Billing writes enqueue notification requests on a bounded channel
//! after their transaction commits; this service drains the channel and
//! talks to the notifier port. Keeping delivery out of the commit path
//! means a slow or dead provider can never fail or roll back billing
//! state.
//!
//! ## Delivery Policy
//!
//! Each request gets a bounded number of attempts with doubling backoff.
//! A request that exhausts its attempts is logged and dropped; the
//! channel is best-effort by contract.
//!
//! ## Graceful Shutdown
//!
//! On shutdown the dispatcher drains what is already queued before
//! returning, so notifications enqueued by the last committed writes
//! still go out.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time;

use crate::domain::foundation::DomainError;
use crate::ports::{NotificationRequest, Notifier};

/// Configuration for the NotificationDispatcher service.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Delivery attempts per notification before dropping it.
    pub max_attempts: u32,

    /// Backoff before the first retry; doubles per attempt.
    pub retry_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl DispatcherConfig {
    /// Create config with custom attempt limit.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Create config with custom initial backoff.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Background service delivering notification requests off the queue.
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    config: DispatcherConfig,
}

impl NotificationDispatcher {
    /// Create a dispatcher with the default delivery policy.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            config: DispatcherConfig::default(),
        }
    }

    /// Overrides the delivery policy.
    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the delivery loop until shutdown or until every sender is gone.
    pub async fn run(
        &self,
        mut queue: mpsc::Receiver<NotificationRequest>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), DomainError> {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        self.drain(&mut queue).await;
                        tracing::info!("notification dispatcher stopping");
                        return Ok(());
                    }
                }

                maybe = queue.recv() => {
                    match maybe {
                        Some(request) => self.deliver(&request).await,
                        // Every sender dropped; nothing more can arrive.
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Deliver already-queued requests without waiting for new ones.
    async fn drain(&self, queue: &mut mpsc::Receiver<NotificationRequest>) {
        while let Ok(request) = queue.try_recv() {
            self.deliver(&request).await;
        }
    }

    /// Attempt delivery with bounded retries, then give up.
    async fn deliver(&self, request: &NotificationRequest) {
        let mut backoff = self.config.retry_backoff;

        for attempt in 1..=self.config.max_attempts {
            match self.notifier.notify(request).await {
                Ok(()) => {
                    tracing::debug!(
                        kind = %request.kind,
                        user_id = %request.user_id,
                        "notification delivered"
                    );
                    return;
                }
                Err(err) if attempt < self.config.max_attempts => {
                    tracing::debug!(
                        kind = %request.kind,
                        user_id = %request.user_id,
                        attempt,
                        error = %err,
                        "notification attempt failed, retrying"
                    );
                    time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => {
                    tracing::warn!(
                        kind = %request.kind,
                        user_id = %request.user_id,
                        attempts = self.config.max_attempts,
                        error = %err,
                        "notification dropped after exhausting retries"
                    );
                }
            }
        }
    }
}
