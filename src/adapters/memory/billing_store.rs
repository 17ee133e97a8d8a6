//! In-memory billing store implementation for testing.
//!
//! Provides deterministic subscription + payment persistence for unit
//! and integration tests, with the same transactional contract as the
//! Postgres adapter: reads inside a transaction see its own staged
//! writes, and nothing is visible to the store until `commit`.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic
//! if locks are poisoned. Production code uses the Postgres adapter.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::domain::billing::{Payment, PaymentStatus, Subscription};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{BillingStore, BillingTxn};

#[derive(Default)]
struct Inner {
    subscriptions: HashMap<SubscriptionId, Subscription>,
    payments: HashMap<PaymentId, Payment>,
    fail_payment_updates: HashSet<PaymentId>,
    fail_subscription_updates: HashSet<SubscriptionId>,
}

/// In-memory billing store for testing.
///
/// Features:
/// - Seeding helpers for fixtures
/// - Snapshot accessors for assertions
/// - Per-row failure injection for partial-batch tests
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
#[derive(Default)]
pub struct InMemoryBillingStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryBillingStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Seeds a subscription row.
    pub fn seed_subscription(&self, subscription: Subscription) {
        self.inner
            .write()
            .expect("InMemoryBillingStore: lock poisoned")
            .subscriptions
            .insert(subscription.id, subscription);
    }

    /// Seeds a payment row.
    pub fn seed_payment(&self, payment: Payment) {
        self.inner
            .write()
            .expect("InMemoryBillingStore: lock poisoned")
            .payments
            .insert(payment.id, payment);
    }

    /// Snapshot of a subscription (for test assertions).
    pub fn subscription(&self, id: &SubscriptionId) -> Option<Subscription> {
        self.inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned")
            .subscriptions
            .get(id)
            .cloned()
    }

    /// Snapshot of a user's subscription (for test assertions).
    pub fn subscription_for_user(&self, user_id: UserId) -> Option<Subscription> {
        self.inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned")
            .subscriptions
            .values()
            .find(|s| s.user_id == user_id)
            .cloned()
    }

    /// Snapshot of a payment (for test assertions).
    pub fn payment(&self, id: &PaymentId) -> Option<Payment> {
        self.inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned")
            .payments
            .get(id)
            .cloned()
    }

    /// Snapshot of a payment by gateway transaction id.
    pub fn payment_by_transaction(&self, gateway_transaction_id: &str) -> Option<Payment> {
        self.inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned")
            .payments
            .values()
            .find(|p| p.gateway_transaction_id == gateway_transaction_id)
            .cloned()
    }

    /// Number of payment rows (for duplicate-write assertions).
    pub fn payment_count(&self) -> usize {
        self.inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned")
            .payments
            .len()
    }

    /// Makes every `update_payment` for this id fail with a database error.
    pub fn fail_payment_updates_for(&self, id: PaymentId) {
        self.inner
            .write()
            .expect("InMemoryBillingStore: lock poisoned")
            .fail_payment_updates
            .insert(id);
    }

    /// Makes every `update_subscription` for this id fail with a database error.
    pub fn fail_subscription_updates_for(&self, id: SubscriptionId) {
        self.inner
            .write()
            .expect("InMemoryBillingStore: lock poisoned")
            .fail_subscription_updates
            .insert(id);
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTxn>, DomainError> {
        let (fail_payments, fail_subscriptions) = {
            let inner = self
                .inner
                .read()
                .expect("InMemoryBillingStore: lock poisoned");
            (
                inner.fail_payment_updates.clone(),
                inner.fail_subscription_updates.clone(),
            )
        };

        Ok(Box::new(InMemoryBillingTxn {
            inner: Arc::clone(&self.inner),
            staged_subscriptions: HashMap::new(),
            staged_payments: HashMap::new(),
            fail_payment_updates: fail_payments,
            fail_subscription_updates: fail_subscriptions,
        }))
    }

    async fn subscriptions_billing_between(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let inner = self
            .inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned");
        Ok(inner
            .subscriptions
            .values()
            .filter(|s| {
                s.status == crate::domain::billing::SubscriptionStatus::Active
                    && s.next_billing_date >= from
                    && s.next_billing_date < to
            })
            .cloned()
            .collect())
    }

    async fn overdue_pending_payments(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Payment>, DomainError> {
        let inner = self
            .inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned");
        Ok(inner
            .payments
            .values()
            .filter(|p| {
                p.status == PaymentStatus::Pending
                    && p.penalty_fee == 0
                    && p.due_date.is_before(&cutoff)
            })
            .cloned()
            .collect())
    }

    async fn subscriptions_with_expired_grace(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let inner = self
            .inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned");
        Ok(inner
            .subscriptions
            .values()
            .filter(|s| {
                s.status == crate::domain::billing::SubscriptionStatus::PastDue
                    && s.grace_period_end.map(|end| end <= now).unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

/// One staged unit of writes against an [`InMemoryBillingStore`].
struct InMemoryBillingTxn {
    inner: Arc<RwLock<Inner>>,
    staged_subscriptions: HashMap<SubscriptionId, Subscription>,
    staged_payments: HashMap<PaymentId, Payment>,
    fail_payment_updates: HashSet<PaymentId>,
    fail_subscription_updates: HashSet<SubscriptionId>,
}

impl InMemoryBillingTxn {
    fn read_subscription(&self, id: &SubscriptionId) -> Option<Subscription> {
        if let Some(staged) = self.staged_subscriptions.get(id) {
            return Some(staged.clone());
        }
        self.inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned")
            .subscriptions
            .get(id)
            .cloned()
    }

    fn read_payment(&self, id: &PaymentId) -> Option<Payment> {
        if let Some(staged) = self.staged_payments.get(id) {
            return Some(staged.clone());
        }
        self.inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned")
            .payments
            .get(id)
            .cloned()
    }

    fn database_error(what: &str) -> DomainError {
        DomainError::new(ErrorCode::DatabaseError, format!("injected failure: {}", what))
    }
}

#[async_trait]
impl BillingTxn for InMemoryBillingTxn {
    async fn find_subscription_for_update(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        if let Some(staged) = self
            .staged_subscriptions
            .values()
            .find(|s| s.user_id == user_id)
        {
            return Ok(Some(staged.clone()));
        }
        Ok(self
            .inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned")
            .subscriptions
            .values()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn find_subscription_by_id_for_update(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.read_subscription(id))
    }

    async fn find_payment_for_update(
        &mut self,
        id: &PaymentId,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self.read_payment(id))
    }

    async fn find_payment_by_transaction(
        &mut self,
        gateway_transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        if let Some(staged) = self
            .staged_payments
            .values()
            .find(|p| p.gateway_transaction_id == gateway_transaction_id)
        {
            return Ok(Some(staged.clone()));
        }
        Ok(self
            .inner
            .read()
            .expect("InMemoryBillingStore: lock poisoned")
            .payments
            .values()
            .find(|p| p.gateway_transaction_id == gateway_transaction_id)
            .cloned())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), DomainError> {
        let duplicate = self
            .find_payment_by_transaction(&payment.gateway_transaction_id)
            .await?
            .is_some();
        if duplicate {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!(
                    "payment with gateway transaction {} already exists",
                    payment.gateway_transaction_id
                ),
            ));
        }
        self.staged_payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<(), DomainError> {
        if self.fail_payment_updates.contains(&payment.id) {
            return Err(Self::database_error("update_payment"));
        }
        if self.read_payment(&payment.id).is_none() {
            return Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("payment {} does not exist", payment.id),
            ));
        }
        self.staged_payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn recent_payment_statuses(
        &mut self,
        subscription_id: &SubscriptionId,
        limit: u32,
    ) -> Result<Vec<PaymentStatus>, DomainError> {
        let mut rows: Vec<Payment> = {
            let inner = self
                .inner
                .read()
                .expect("InMemoryBillingStore: lock poisoned");
            inner
                .payments
                .values()
                .filter(|p| {
                    p.subscription_id == *subscription_id && !self.staged_payments.contains_key(&p.id)
                })
                .cloned()
                .collect()
        };
        rows.extend(
            self.staged_payments
                .values()
                .filter(|p| p.subscription_id == *subscription_id)
                .cloned(),
        );

        // Same ordering as the SQL adapter: newest attempt first.
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(rows
            .into_iter()
            .take(limit as usize)
            .map(|p| p.status)
            .collect())
    }

    async fn update_subscription(
        &mut self,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        if self.fail_subscription_updates.contains(&subscription.id) {
            return Err(Self::database_error("update_subscription"));
        }
        if self.read_subscription(&subscription.id).is_none() {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription {} does not exist", subscription.id),
            ));
        }
        self.staged_subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut inner = self
            .inner
            .write()
            .expect("InMemoryBillingStore: lock poisoned");
        for (id, subscription) in self.staged_subscriptions {
            inner.subscriptions.insert(id, subscription);
        }
        for (id, payment) in self.staged_payments {
            inner.payments.insert(id, payment);
        }
        Ok(())
    }
}
