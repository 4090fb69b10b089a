//! Balance bookkeeping. The row is lazily created on first read or first credit and
//! never deleted, per the invariant in the data model.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::database::{DatabaseError, Result};
use crate::errors::balance::BalanceError;

#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct Model {
    pub user_id: i32,
    pub current: Decimal,
    pub withdrawn: Decimal,
}

/// Fetch the caller's balance, creating a zero row if none exists yet.
pub async fn fetch_or_create(pool: &PgPool, user_id: i32) -> Result<Model> {
    if let Some(model) = fetch(pool, user_id).await? {
        return Ok(model);
    }

    sqlx::query(
        "INSERT INTO balance (user_id, current, withdrawn) VALUES ($1, 0, 0)
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    fetch(pool, user_id)
        .await?
        .ok_or(DatabaseError::Sqlx(sqlx::Error::RowNotFound))
}

async fn fetch(pool: &PgPool, user_id: i32) -> Result<Option<Model>> {
    sqlx::query_as("SELECT user_id, current, withdrawn FROM balance WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::Sqlx)
}

/// Debit `sum` from the caller's balance and record the withdrawal, in one
/// transaction. Returns [`BalanceError::InsufficientFunds`] rather than going negative.
pub async fn withdraw(
    pool: &PgPool,
    user_id: i32,
    order_number: i64,
    sum: Decimal,
) -> std::result::Result<(), BalanceError> {
    let mut tx = pool.begin().await.map_err(DatabaseError::Sqlx)?;

    sqlx::query(
        "INSERT INTO balance (user_id, current, withdrawn) VALUES ($1, 0, 0)
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await
    .map_err(DatabaseError::Sqlx)?;

    let current: Decimal = sqlx::query_scalar("SELECT current FROM balance WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::Sqlx)?;

    if current < sum {
        return Err(BalanceError::InsufficientFunds);
    }

    sqlx::query(
        "UPDATE balance SET current = current - $2, withdrawn = withdrawn + $2 WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(sum)
    .execute(&mut *tx)
    .await
    .map_err(DatabaseError::Sqlx)?;

    sqlx::query("INSERT INTO withdrawals (user_id, order_number, sum) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(order_number)
        .bind(sum)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::Sqlx)?;

    tx.commit().await.map_err(DatabaseError::Sqlx)?;

    Ok(())
}
