//! In-memory notifier implementation for testing.
//!
//! Captures every delivered notification for assertions and can be
//! switched into a failing mode to exercise best-effort semantics.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic
//! if locks are poisoned.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{NotificationKind, NotificationRequest, Notifier};

/// In-memory notifier for testing.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
#[derive(Default)]
pub struct InMemoryNotifier {
    delivered: RwLock<Vec<NotificationRequest>>,
    failing: AtomicBool,
}

impl InMemoryNotifier {
    /// Creates a new notifier that accepts every delivery.
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// All delivered notifications (for test assertions).
    pub fn delivered(&self) -> Vec<NotificationRequest> {
        self.delivered
            .read()
            .expect("InMemoryNotifier: lock poisoned")
            .clone()
    }

    /// Delivered notifications of one kind.
    pub fn delivered_of_kind(&self, kind: NotificationKind) -> Vec<NotificationRequest> {
        self.delivered()
            .into_iter()
            .filter(|n| n.kind == kind)
            .collect()
    }

    /// Number of delivered notifications.
    pub fn delivered_count(&self) -> usize {
        self.delivered
            .read()
            .expect("InMemoryNotifier: lock poisoned")
            .len()
    }

    /// Makes every subsequent `notify` fail (for best-effort tests).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, request: &NotificationRequest) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                "injected notifier failure",
            ));
        }
        self.delivered
            .write()
            .expect("InMemoryNotifier: lock poisoned")
            .push(request.clone());
        Ok(())
    }
}
