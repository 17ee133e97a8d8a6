//! Billing store port (subscriptions + payments, write side).
//!
//! Defines the transactional contract the billing engine needs from
//! persistence. Webhook handling and worker row-updates open a
//! [`BillingTxn`] so every write for one event commits atomically;
//! the scan methods on [`BillingStore`] are plain reads used by the
//! background workers to find candidates.
//!
//! # Design
//!
//! - **Row locking**: The `*_for_update` reads must block concurrent
//!   writers of the same row until the transaction ends, so a status
//!   checked inside the transaction cannot go stale before the write
//! - **Rollback on drop**: Dropping a [`BillingTxn`] without calling
//!   `commit` discards every staged write
//! - **Candidate scans**: Return full aggregates; callers re-check the
//!   business predicate under lock before writing
//!
//! # Example
//!
//! ```ignore
//! // One penalty-worker row, isolated in its own transaction:
//! let mut txn = store.begin().await?;
//! let Some(mut payment) = txn.find_payment_for_update(&candidate.id).await? else {
//!     return Ok(());
//! };
//! if !payment.is_penalty_candidate(now, policy.grace_days) {
//!     return Ok(()); // paid or penalized since the scan
//! }
//! payment.apply_penalty(policy.calculate(payment.amount, payment.due_date, now), now)?;
//! txn.update_payment(&payment).await?;
//! txn.commit().await?;
//! ```

use async_trait::async_trait;

use crate::domain::billing::{Payment, PaymentStatus, Subscription};
use crate::domain::foundation::{DomainError, PaymentId, SubscriptionId, Timestamp, UserId};

/// Store port for billing aggregates.
///
/// Implementations must ensure:
/// - `begin` yields a transaction with read-your-writes semantics
/// - Scans never observe uncommitted rows from other transactions
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Open a transaction for an atomic unit of billing writes.
    async fn begin(&self) -> Result<Box<dyn BillingTxn>, DomainError>;

    /// Active subscriptions whose next billing date falls inside `[from, to)`.
    ///
    /// Used by the reminder worker; the exact day-window match happens
    /// in the worker, not in the query.
    async fn subscriptions_billing_between(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Pending payments due strictly before `cutoff` with no penalty yet.
    ///
    /// `cutoff` already has the penalty grace subtracted by the caller.
    async fn overdue_pending_payments(&self, cutoff: Timestamp) -> Result<Vec<Payment>, DomainError>;

    /// Past-due subscriptions whose grace deadline is at or before `now`.
    async fn subscriptions_with_expired_grace(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;
}

/// One atomic unit of billing writes.
///
/// All reads see the transaction's own staged writes. Locked reads
/// serialize concurrent handling of the same subscription, which is
/// what makes the webhook path's status re-check trustworthy.
#[async_trait]
pub trait BillingTxn: Send {
    /// Row-locked read of a user's subscription.
    ///
    /// Returns `None` if the user has no subscription. Each user has at
    /// most one, so this is the webhook path's primary lookup.
    async fn find_subscription_for_update(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Row-locked read of a subscription by id (worker paths).
    async fn find_subscription_by_id_for_update(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Row-locked read of a payment by id (penalty worker).
    async fn find_payment_for_update(
        &mut self,
        id: &PaymentId,
    ) -> Result<Option<Payment>, DomainError>;

    /// Find a payment by its gateway transaction id.
    ///
    /// Redelivered events update the existing row instead of inserting
    /// a duplicate.
    async fn find_payment_by_transaction(
        &mut self,
        gateway_transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Insert a new payment.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the gateway transaction id already exists
    /// - `DatabaseError` on persistence failure
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), DomainError>;

    /// Update an existing payment.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if the payment doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_payment(&mut self, payment: &Payment) -> Result<(), DomainError>;

    /// Newest-first payment statuses for a subscription, at most `limit`.
    ///
    /// Feeds the consecutive-failure counter; ordering is by gateway
    /// event time descending.
    async fn recent_payment_statuses(
        &mut self,
        subscription_id: &SubscriptionId,
        limit: u32,
    ) -> Result<Vec<PaymentStatus>, DomainError>;

    /// Update an existing subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Commit every staged write.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety tests
    #[test]
    fn billing_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn BillingStore) {}
    }

    #[test]
    fn billing_txn_is_object_safe() {
        fn _accepts_dyn(_txn: &mut dyn BillingTxn) {}
    }
}
