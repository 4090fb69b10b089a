//! The asynchronous order processing pipeline (§4).
//!
//! Three producers feed one bounded dispatch queue: the HTTP admission handler (a new
//! order should be probed right away), the Postgres `LISTEN/NOTIFY` channel (another
//! replica admitted one), and a periodic sweeper (the safety net for anything dropped
//! or missed). A fixed pool of workers drains the queue; an in-process lock set plus
//! two layers of Postgres locking keep two workers, on this replica or another, from
//! reconciling the same order twice.

pub mod accrual;
pub mod listener;
pub mod store;
pub mod sweeper;
pub mod worker;

use dashmap::DashSet;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use accrual::{AccrualClient, AccrualProvider};
use store::PipelineStore;
use worker::WorkerContext;

const DISPATCH_QUEUE_CAPACITY: usize = 1000;

pub struct OrderPipeline {
    dispatch_tx: mpsc::Sender<i64>,
    cancel: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl OrderPipeline {
    /// Wires up the dispatch queue and spawns the listener, sweeper, and worker tasks.
    /// Must be called from within a Tokio runtime (the `HttpServer` startup path).
    pub fn start(
        pool: PgPool,
        database_uri: String,
        accrual_address: String,
        workers: usize,
    ) -> Self {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(DISPATCH_QUEUE_CAPACITY);
        let cancel = CancellationToken::new();

        let ctx = Arc::new(WorkerContext {
            store: Arc::new(pool) as Arc<dyn PipelineStore>,
            accrual: Arc::new(AccrualClient::new(accrual_address)) as Arc<dyn AccrualProvider>,
            lock_set: Arc::new(DashSet::new()),
        });

        let mut handles = Vec::with_capacity(workers + 2);

        handles.push(tokio::spawn(listener::run(
            database_uri,
            dispatch_tx.clone(),
            cancel.clone(),
        )));

        handles.push(tokio::spawn(sweeper::run(
            Arc::clone(&ctx.store),
            dispatch_tx.clone(),
            cancel.clone(),
        )));

        let dispatch_rx = Arc::new(Mutex::new(dispatch_rx));
        for id in 0..workers.max(1) {
            handles.push(tokio::spawn(worker::run(
                id,
                Arc::clone(&dispatch_rx),
                Arc::clone(&ctx),
                cancel.clone(),
            )));
        }

        Self {
            dispatch_tx,
            cancel,
            handles: Mutex::new(handles),
        }
    }

    /// Submit an order number for processing. Used by the HTTP admission handler right
    /// after a successful insert. Silently drops the item if the queue is full; the
    /// sweeper will pick it up on its next pass, per the bounded-queue/backpressure
    /// design in §4.3.
    pub fn enqueue(&self, number: i64) {
        if self.dispatch_tx.try_send(number).is_err() {
            tracing::warn!(order = number, "dispatch queue full, dropping; sweeper will retry");
        }
    }

    /// Cancels every background task and waits for them to finish their current unit
    /// of work before returning.
    pub async fn stop(&self) {
        self.cancel.cancel();

        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
    }
}
