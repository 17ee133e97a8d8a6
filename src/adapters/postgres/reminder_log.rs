//! PostgreSQL implementation of the reminder dedup log.
//!
//! The composite primary key `(user_id, days_before, reminder_date)`
//! carries the dedup guarantee; `record` inserts with `ON CONFLICT DO
//! NOTHING` so replaying a send is harmless.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::ReminderLog;

/// PostgreSQL implementation of [`ReminderLog`].
#[derive(Clone)]
pub struct PostgresReminderLog {
    pool: PgPool,
}

impl PostgresReminderLog {
    /// Creates a new PostgresReminderLog.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderLog for PostgresReminderLog {
    async fn already_sent(
        &self,
        user_id: UserId,
        days_before: u32,
        on: NaiveDate,
    ) -> Result<bool, DomainError> {
        let result: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM reminder_log
            WHERE user_id = $1 AND days_before = $2 AND reminder_date = $3
            "#,
        )
        .bind(user_id.as_i64())
        .bind(days_before as i32)
        .bind(on)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to check reminder log: {}", e),
            )
        })?;

        Ok(result.0 > 0)
    }

    async fn record(
        &self,
        user_id: UserId,
        days_before: u32,
        on: NaiveDate,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO reminder_log (user_id, days_before, reminder_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, days_before, reminder_date) DO NOTHING
            "#,
        )
        .bind(user_id.as_i64())
        .bind(days_before as i32)
        .bind(on)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record reminder: {}", e),
            )
        })?;

        Ok(())
    }

    async fn delete_before(&self, cutoff: NaiveDate) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM reminder_log WHERE reminder_date < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to prune reminder log: {}", e),
                )
            })?;

        Ok(result.rows_affected())
    }
}
