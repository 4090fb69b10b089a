//! Worker pool: drains the dispatch queue and drives each order through the
//! lock → probe → reconcile algorithm in §4.4.

use dashmap::DashSet;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_retry2::{Retry, RetryError};
use tokio_util::sync::CancellationToken;

use crate::database::order::OrderStatus;
use crate::database::DatabaseError;
use crate::pipeline::accrual::{AccrualProvider, ProbeOutcome};
use crate::pipeline::store::PipelineStore;

const RETRY_BACKOFF_MS: [u64; 3] = [100, 200, 300];

pub struct WorkerContext {
    pub store: Arc<dyn PipelineStore>,
    pub accrual: Arc<dyn AccrualProvider>,
    pub lock_set: Arc<DashSet<i64>>,
}

/// One worker task. Multiple workers share the same `rx` (wrapped in a mutex) so they
/// all drain the same bounded queue; FIFO within a worker, no ordering across workers.
pub async fn run(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<i64>>>,
    ctx: Arc<WorkerContext>,
    cancel: CancellationToken,
) {
    loop {
        let number = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                item = rx.recv() => item,
            }
        };

        let Some(number) = number else {
            return;
        };

        process_order(&ctx, number).await;
        tracing::debug!(worker = id, order = number, "processed dispatch item");
    }
}

async fn process_order(ctx: &WorkerContext, number: i64) {
    if !ctx.lock_set.insert(number) {
        return;
    }

    if let Err(err) = process_order_inner(ctx, number).await {
        tracing::warn!(order = number, error = %err, "order left for the sweeper");
    }

    ctx.lock_set.remove(&number);
}

#[derive(Debug, thiserror::Error)]
enum ProcessError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

async fn process_order_inner(ctx: &WorkerContext, number: i64) -> Result<(), ProcessError> {
    let Some(status) = ctx.store.lock_and_get_status(number).await? else {
        return Ok(());
    };

    if status.is_terminal() {
        return Ok(());
    }

    let outcome = match ctx.accrual.probe(number).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(order = number, error = %err, "accrual probe failed");
            return Ok(());
        }
    };

    let report = match outcome {
        ProbeOutcome::NotRegistered => return Ok(()),
        ProbeOutcome::Report(report) => report,
    };

    reconcile_with_retry(ctx, number, report.status, report.accrual).await
}

async fn reconcile_with_retry(
    ctx: &WorkerContext,
    number: i64,
    status: OrderStatus,
    accrual: Decimal,
) -> Result<(), ProcessError> {
    let action = || {
        let store = Arc::clone(&ctx.store);
        async move {
            match store.reconcile(number, status, accrual).await {
                Ok(_outcome) => Ok(()),
                Err(err) if store.is_retryable(&err) => Err(RetryError::transient(err)),
                Err(err) => Err(RetryError::permanent(err)),
            }
        }
    };

    let backoff = RETRY_BACKOFF_MS.into_iter().map(Duration::from_millis);

    match Retry::spawn(backoff, action).await {
        Ok(()) => Ok(()),
        Err(err) => Err(ProcessError::Database(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::accrual::fake::FakeAccrual;
    use crate::pipeline::accrual::AccrualReport;
    use crate::pipeline::store::fake::FakeStore;

    fn ctx(store: FakeStore, accrual: FakeAccrual) -> WorkerContext {
        WorkerContext {
            store: Arc::new(store),
            accrual: Arc::new(accrual),
            lock_set: Arc::new(DashSet::new()),
        }
    }

    #[tokio::test]
    async fn terminal_orders_are_left_alone() {
        let store = FakeStore::default();
        store.insert(1, 7, OrderStatus::Processed);
        let ctx = ctx(store, FakeAccrual::sequence(vec![]));

        process_order(&ctx, 1).await;
        assert!(ctx.lock_set.is_empty());
    }

    #[tokio::test]
    async fn processed_report_commits_and_releases_the_lock() {
        let store = FakeStore::default();
        store.insert(42, 7, OrderStatus::New);
        let accrual = FakeAccrual::sequence(vec![Ok(ProbeOutcome::Report(AccrualReport {
            status: OrderStatus::Processed,
            accrual: Decimal::new(425, 1),
        }))]);
        let ctx = ctx(store, accrual);

        process_order(&ctx, 42).await;

        assert!(ctx.lock_set.is_empty());
        let orders = ctx.store.get_pending(10).await.unwrap();
        assert!(!orders.contains(&42));
    }

    #[tokio::test]
    async fn not_registered_is_not_an_error_and_leaves_order_pending() {
        let store = FakeStore::default();
        store.insert(9, 1, OrderStatus::New);
        let accrual = FakeAccrual::sequence(vec![Ok(ProbeOutcome::NotRegistered)]);
        let ctx = ctx(store, accrual);

        process_order(&ctx, 9).await;

        let pending = ctx.store.get_pending(10).await.unwrap();
        assert_eq!(pending, vec![9]);
    }

    #[tokio::test]
    async fn duplicate_local_dispatch_is_deduped() {
        let store = FakeStore::default();
        store.insert(5, 1, OrderStatus::New);
        let ctx = Arc::new(ctx(
            store,
            FakeAccrual::sequence(vec![Ok(ProbeOutcome::NotRegistered)]),
        ));

        ctx.lock_set.insert(5);
        process_order(&ctx, 5).await;

        assert!(ctx.lock_set.contains(&5), "pre-existing lock must survive");
    }

    #[tokio::test]
    async fn serialization_failures_retry_then_succeed() {
        let store = FakeStore::default();
        store.insert(11, 3, OrderStatus::New);
        *store.fail_next_reconcile.lock().unwrap() = 2;
        let accrual = FakeAccrual::sequence(vec![Ok(ProbeOutcome::Report(AccrualReport {
            status: OrderStatus::Processed,
            accrual: Decimal::new(50, 1),
        }))]);
        let ctx = ctx(store, accrual);

        process_order(&ctx, 11).await;

        let pending = ctx.store.get_pending(10).await.unwrap();
        assert!(!pending.contains(&11));
    }
}
