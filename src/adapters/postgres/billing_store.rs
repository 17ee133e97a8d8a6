//! PostgreSQL implementation of the billing store.
//!
//! Subscriptions and payments live in their own tables; the webhook
//! handler and the workers mutate them through [`PostgresBillingTxn`],
//! which wraps one `sqlx` transaction so every write for one event
//! commits or rolls back together. `SELECT ... FOR UPDATE` backs the
//! row-locked reads that keep concurrent deliveries of the same
//! subscription serialized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::billing::{Payment, PaymentStatus, Subscription, SubscriptionStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, PlanId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{BillingStore, BillingTxn};

/// PostgreSQL implementation of [`BillingStore`].
#[derive(Clone)]
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    /// Creates a new PostgresBillingStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTxn>, DomainError> {
        let txn = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to begin transaction: {}", e),
            )
        })?;
        Ok(Box::new(PostgresBillingTxn { txn }))
    }

    async fn subscriptions_billing_between(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, plan_id, notify_email, status, grace_period_end,
                   current_period_start, current_period_end, next_billing_date,
                   cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE status = 'active'
              AND next_billing_date >= $1
              AND next_billing_date < $2
            ORDER BY next_billing_date
            "#,
        )
        .bind(from.as_datetime())
        .bind(to.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to scan upcoming billing dates: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn overdue_pending_payments(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, subscription_id, gateway_transaction_id, amount,
                   penalty_fee, total_amount, status, due_date, paid_at,
                   gateway_metadata, created_at, updated_at
            FROM payments
            WHERE status = 'pending'
              AND penalty_fee = 0
              AND due_date < $1
            ORDER BY due_date
            "#,
        )
        .bind(cutoff.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to scan overdue payments: {}", e),
            )
        })?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn subscriptions_with_expired_grace(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, plan_id, notify_email, status, grace_period_end,
                   current_period_start, current_period_end, next_billing_date,
                   cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE status = 'past_due'
              AND grace_period_end IS NOT NULL
              AND grace_period_end <= $1
            ORDER BY grace_period_end
            "#,
        )
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to scan expired grace periods: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}

/// One open billing transaction.
///
/// Dropping without `commit` rolls every staged write back, which is
/// exactly what the webhook handler wants when a later step fails.
pub struct PostgresBillingTxn {
    txn: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillingTxn for PostgresBillingTxn {
    async fn find_subscription_for_update(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, plan_id, notify_email, status, grace_period_end,
                   current_period_start, current_period_end, next_billing_date,
                   cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_optional(&mut *self.txn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to fetch subscription for user {}: {}", user_id, e),
            )
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_subscription_by_id_for_update(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, plan_id, notify_email, status, grace_period_end,
                   current_period_start, current_period_end, next_billing_date,
                   cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.txn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to fetch subscription {}: {}", id, e),
            )
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_payment_for_update(
        &mut self,
        id: &PaymentId,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, subscription_id, gateway_transaction_id, amount,
                   penalty_fee, total_amount, status, due_date, paid_at,
                   gateway_metadata, created_at, updated_at
            FROM payments
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.txn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to fetch payment {}: {}", id, e),
            )
        })?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_payment_by_transaction(
        &mut self,
        gateway_transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        // Locked so a redelivery racing the first handler waits for its
        // commit instead of double-inserting.
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, subscription_id, gateway_transaction_id, amount,
                   penalty_fee, total_amount, status, due_date, paid_at,
                   gateway_metadata, created_at, updated_at
            FROM payments
            WHERE gateway_transaction_id = $1
            FOR UPDATE
            "#,
        )
        .bind(gateway_transaction_id)
        .fetch_optional(&mut *self.txn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!(
                    "Failed to fetch payment for transaction {}: {}",
                    gateway_transaction_id, e
                ),
            )
        })?;

        row.map(Payment::try_from).transpose()
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, user_id, subscription_id, gateway_transaction_id,
                amount, penalty_fee, total_amount, status, due_date,
                paid_at, gateway_metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.user_id.as_i64())
        .bind(payment.subscription_id.as_uuid())
        .bind(&payment.gateway_transaction_id)
        .bind(payment.amount)
        .bind(payment.penalty_fee)
        .bind(payment.total_amount)
        .bind(payment.status.as_str())
        .bind(payment.due_date.as_datetime())
        .bind(payment.paid_at.map(|t| *t.as_datetime()))
        .bind(&payment.gateway_metadata)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&mut *self.txn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payments_gateway_transaction_id_key") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        format!(
                            "Payment already recorded for transaction {}",
                            payment.gateway_transaction_id
                        ),
                    );
                }
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert payment: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $2,
                penalty_fee = $3,
                total_amount = $4,
                paid_at = $5,
                gateway_metadata = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(payment.penalty_fee)
        .bind(payment.total_amount)
        .bind(payment.paid_at.map(|t| *t.as_datetime()))
        .bind(&payment.gateway_metadata)
        .bind(payment.updated_at.as_datetime())
        .execute(&mut *self.txn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update payment: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment not found: {}", payment.id),
            ));
        }

        Ok(())
    }

    async fn recent_payment_statuses(
        &mut self,
        subscription_id: &SubscriptionId,
        limit: u32,
    ) -> Result<Vec<PaymentStatus>, DomainError> {
        // created_at tracks when the gateway first reported the charge,
        // so descending order is newest attempt first.
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT status
            FROM payments
            WHERE subscription_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(subscription_id.as_uuid())
        .bind(limit as i64)
        .fetch_all(&mut *self.txn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to fetch payment history: {}", e),
            )
        })?;

        rows.iter().map(|(s,)| parse_payment_status(s)).collect()
    }

    async fn update_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                grace_period_end = $3,
                current_period_start = $4,
                current_period_end = $5,
                next_billing_date = $6,
                cancelled_at = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription_status_to_string(&subscription.status))
        .bind(subscription.grace_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_start.as_datetime())
        .bind(subscription.current_period_end.as_datetime())
        .bind(subscription.next_billing_date.as_datetime())
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *self.txn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update subscription: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription not found: {}", subscription.id),
            ));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.txn.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit transaction: {}", e),
            )
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: i64,
    plan_id: i64,
    notify_email: Option<String>,
    status: String,
    grace_period_end: Option<DateTime<Utc>>,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    next_billing_date: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid user id in subscription row: {}", e),
                )
            })?,
            plan_id: PlanId::new(row.plan_id).map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid plan id in subscription row: {}", e),
                )
            })?,
            notify_email: row.notify_email,
            status: parse_subscription_status(&row.status)?,
            grace_period_end: row.grace_period_end.map(Timestamp::from_datetime),
            current_period_start: Timestamp::from_datetime(row.current_period_start),
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            next_billing_date: Timestamp::from_datetime(row.next_billing_date),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: i64,
    subscription_id: Uuid,
    gateway_transaction_id: String,
    amount: i64,
    penalty_fee: i64,
    total_amount: i64,
    status: String,
    due_date: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    gateway_metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid user id in payment row: {}", e),
                )
            })?,
            subscription_id: SubscriptionId::from_uuid(row.subscription_id),
            gateway_transaction_id: row.gateway_transaction_id,
            amount: row.amount,
            penalty_fee: row.penalty_fee,
            total_amount: row.total_amount,
            status: parse_payment_status(&row.status)?,
            due_date: Timestamp::from_datetime(row.due_date),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            gateway_metadata: row.gateway_metadata,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_subscription_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "active" => Ok(SubscriptionStatus::Active),
        "past_due" => Ok(SubscriptionStatus::PastDue),
        "suspended" => Ok(SubscriptionStatus::Suspended),
        "cancelled" => Ok(SubscriptionStatus::Cancelled),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid subscription status value: {}", s),
        )),
    }
}

fn subscription_status_to_string(status: &SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::PastDue => "past_due",
        SubscriptionStatus::Suspended => "suspended",
        SubscriptionStatus::Cancelled => "cancelled",
    }
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus, DomainError> {
    PaymentStatus::parse(&s.to_lowercase()).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment status value: {}", s),
        )
    })
}
