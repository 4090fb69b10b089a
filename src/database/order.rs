//! Order admission and the storage-facing half of the processing pipeline.
//!
//! This module is deliberately split from `crate::pipeline`: everything here is a
//! Postgres operation with no knowledge of queues, workers, or the accrual provider.
//! The pipeline composes these into the algorithm described for the worker pool.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::database::{DatabaseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Processing,
    Processed,
    Invalid,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Model {
    pub number: i64,
    pub user_id: i32,
    pub status: OrderStatus,
    pub accrual: Decimal,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Outcome of [`submit`], matching the Admission Interface contract one for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Accepted,
    AlreadyYours,
    ConflictOtherUser,
}

/// Admit an order number for `user_id`. Implements the insert-then-recover-on-race
/// dance: a unique-violation on the insert means someone else won the race, so we
/// just re-read and recompute the answer rather than treating it as an error.
pub async fn submit(pool: &PgPool, user_id: i32, number: i64) -> Result<AdmissionOutcome> {
    loop {
        if let Some(owner) = fetch_owner(pool, number).await? {
            return Ok(if owner == user_id {
                AdmissionOutcome::AlreadyYours
            } else {
                AdmissionOutcome::ConflictOtherUser
            });
        }

        let inserted = sqlx::query(
            "INSERT INTO orders (user_id, number, status) VALUES ($1, $2, 'NEW')",
        )
        .bind(user_id)
        .bind(number)
        .execute(pool)
        .await;

        match inserted {
            Ok(_) => return Ok(AdmissionOutcome::Accepted),
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(DatabaseError::Sqlx(e)),
        }
    }
}

async fn fetch_owner(pool: &PgPool, number: i64) -> Result<Option<i32>> {
    sqlx::query_scalar("SELECT user_id FROM orders WHERE number = $1")
        .bind(number)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::Sqlx)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|d| d.is_unique_violation())
}

pub async fn list_by_user(pool: &PgPool, user_id: i32) -> Result<Vec<Model>> {
    sqlx::query_as(
        "SELECT number, user_id, status, accrual, uploaded_at, updated_at
         FROM orders WHERE user_id = $1 ORDER BY uploaded_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::Sqlx)
}

/// Sweeper query: pending orders, oldest first, filtered to the ones this replica can
/// take the transaction-scoped advisory lock on. The lock is released the instant this
/// transaction commits; it only exists to stop two replicas re-enqueueing the same
/// order in the same sweep.
pub async fn get_pending_locked(pool: &PgPool, limit: i64) -> Result<Vec<i64>> {
    let mut tx = pool.begin().await?;

    let numbers: Vec<i64> = sqlx::query_scalar(
        "SELECT number FROM orders
         WHERE status IN ('NEW', 'PROCESSING') AND pg_try_advisory_xact_lock(number)
         ORDER BY uploaded_at ASC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(numbers)
}

/// Worker step 2: acquire the row lock and read the current status. `None` covers both
/// "order absent" and "row locked by another replica"; the caller treats them
/// identically (discard, let the sweeper retry later).
pub async fn lock_and_get_status(pool: &PgPool, number: i64) -> Result<Option<OrderStatus>> {
    let mut tx = pool.begin().await?;

    let status: Option<OrderStatus> = sqlx::query_scalar(
        "SELECT status FROM orders WHERE number = $1 FOR UPDATE SKIP LOCKED",
    )
    .bind(number)
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(status)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// `pg_try_advisory_xact_lock` did not acquire; caller should abort cleanly.
    LockNotAcquired,
    /// The order no longer exists, or already reached a terminal status; nothing to
    /// reconcile.
    NotFound,
    Committed,
}

/// Worker step 5: atomically write the new status (and, for a `PROCESSED` report with
/// positive accrual, credit the owner's balance). Runs at serializable isolation,
/// guarded end to end by `pg_try_advisory_xact_lock(number)`.
///
/// The `UPDATE` is itself guarded by `status NOT IN ('PROCESSED', 'INVALID')`: the
/// advisory lock only serializes concurrent reconcilers against each other, it is
/// released the instant the winner commits, so a second reconciler racing the same
/// order number still acquires it afterwards and must be stopped by the row no longer
/// matching, not by the lock.
pub async fn reconcile(
    pool: &PgPool,
    number: i64,
    status: OrderStatus,
    accrual: Decimal,
) -> Result<ReconcileOutcome> {
    let mut tx: Transaction<'_, Postgres> = pool.begin().await?;

    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
        .bind(number)
        .fetch_one(&mut *tx)
        .await?;

    if !locked {
        tx.rollback().await?;
        return Ok(ReconcileOutcome::LockNotAcquired);
    }

    let owner: Option<i32> = sqlx::query_scalar(
        "UPDATE orders SET status = $2, accrual = $3, updated_at = now()
         WHERE number = $1 AND status NOT IN ('PROCESSED', 'INVALID') RETURNING user_id",
    )
    .bind(number)
    .bind(status)
    .bind(accrual)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(owner) = owner else {
        tx.rollback().await?;
        return Ok(ReconcileOutcome::NotFound);
    };

    if status == OrderStatus::Processed && accrual > Decimal::ZERO {
        sqlx::query(
            "INSERT INTO balance (user_id, current, withdrawn) VALUES ($1, 0, 0)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE balance SET current = current + $2 WHERE user_id = $1")
            .bind(owner)
            .bind(accrual)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(ReconcileOutcome::Committed)
}

/// True for the Postgres serialization-failure error class (`40001`) and the
/// deadlock-detected class (`40P01`), the only errors the worker retries in place.
pub fn is_serialization_failure(err: &DatabaseError) -> bool {
    let DatabaseError::Sqlx(err) = err;
    err.as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == "40001" || code == "40P01")
}
