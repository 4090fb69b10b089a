//! The capability set the pipeline depends on, abstracted so a real Postgres pool and
//! an in-memory double are equally valid backends. Notification/listen plumbing is
//! Postgres-specific enough (LISTEN/NOTIFY, advisory locks) that it stays concrete in
//! `listener.rs`/`sweeper.rs`; this trait covers the per-order read/write path the
//! worker drives, which is what unit tests exercise against [`FakeStore`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::database::order::{self, OrderStatus, ReconcileOutcome};
use crate::database::DatabaseError;

#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn lock_and_get_status(&self, number: i64) -> Result<Option<OrderStatus>, DatabaseError>;

    async fn reconcile(
        &self,
        number: i64,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<ReconcileOutcome, DatabaseError>;

    async fn get_pending(&self, limit: i64) -> Result<Vec<i64>, DatabaseError>;

    /// Whether a failed `reconcile` call belongs to the narrow retry-in-place class
    /// (serialization failure / deadlock). Anything else is left for the sweeper.
    fn is_retryable(&self, err: &DatabaseError) -> bool {
        order::is_serialization_failure(err)
    }
}

#[async_trait]
impl PipelineStore for PgPool {
    async fn lock_and_get_status(&self, number: i64) -> Result<Option<OrderStatus>, DatabaseError> {
        order::lock_and_get_status(self, number).await
    }

    async fn reconcile(
        &self,
        number: i64,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<ReconcileOutcome, DatabaseError> {
        order::reconcile(self, number, status, accrual).await
    }

    async fn get_pending(&self, limit: i64) -> Result<Vec<i64>, DatabaseError> {
        order::get_pending_locked(self, limit).await
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct FakeOrder {
        pub user_id: i32,
        pub status: OrderStatus,
        pub accrual: Decimal,
    }

    /// In-memory double for [`PipelineStore`]. Does not model cross-replica advisory
    /// locks (there is only ever one replica in a unit test) but does model the
    /// terminal-state and not-found semantics the worker depends on.
    #[derive(Default)]
    pub struct FakeStore {
        pub orders: Mutex<HashMap<i64, FakeOrder>>,
        pub fail_next_reconcile: Mutex<u32>,
    }

    impl FakeStore {
        pub fn insert(&self, number: i64, user_id: i32, status: OrderStatus) {
            self.orders.lock().unwrap().insert(
                number,
                FakeOrder {
                    user_id,
                    status,
                    accrual: Decimal::ZERO,
                },
            );
        }
    }

    #[async_trait]
    impl PipelineStore for FakeStore {
        async fn lock_and_get_status(
            &self,
            number: i64,
        ) -> Result<Option<OrderStatus>, DatabaseError> {
            Ok(self.orders.lock().unwrap().get(&number).map(|o| o.status))
        }

        async fn reconcile(
            &self,
            number: i64,
            status: OrderStatus,
            accrual: Decimal,
        ) -> Result<ReconcileOutcome, DatabaseError> {
            {
                let mut fail = self.fail_next_reconcile.lock().unwrap();
                if *fail > 0 {
                    *fail -= 1;
                    return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
                }
            }

            let mut orders = self.orders.lock().unwrap();
            let Some(order) = orders.get_mut(&number) else {
                return Ok(ReconcileOutcome::NotFound);
            };

            order.status = status;
            order.accrual = accrual;

            Ok(ReconcileOutcome::Committed)
        }

        async fn get_pending(&self, limit: i64) -> Result<Vec<i64>, DatabaseError> {
            let orders = self.orders.lock().unwrap();
            let mut pending: Vec<i64> = orders
                .iter()
                .filter(|(_, o)| !o.status.is_terminal())
                .map(|(n, _)| *n)
                .collect();
            pending.sort_unstable();
            pending.truncate(limit as usize);
            Ok(pending)
        }

        fn is_retryable(&self, _err: &DatabaseError) -> bool {
            true
        }
    }
}
