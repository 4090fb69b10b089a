use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::database::{DatabaseError, Result};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Model {
    pub order_number: i64,
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}

pub async fn list_by_user(pool: &PgPool, user_id: i32) -> Result<Vec<Model>> {
    sqlx::query_as(
        "SELECT order_number, sum, processed_at FROM withdrawals
         WHERE user_id = $1 ORDER BY processed_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::Sqlx)
}
