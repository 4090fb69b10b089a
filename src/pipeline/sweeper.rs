//! Periodic reconciliation safety net (§4.3). Catches orders the dispatch queue
//! dropped under backpressure, orders whose `NOTIFY` was missed during a listener
//! reconnect, and orders left `PROCESSING` by a worker that never got to finish.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::pipeline::store::PipelineStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);
const SWEEP_BATCH_SIZE: i64 = 100;

pub async fn run(
    store: std::sync::Arc<dyn PipelineStore>,
    dispatch_tx: mpsc::Sender<i64>,
    cancel: CancellationToken,
) {
    let mut tick = tokio::time::interval(SWEEP_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tick.tick() => {}
        }

        let pending = match store.get_pending(SWEEP_BATCH_SIZE).await {
            Ok(pending) => pending,
            Err(err) => {
                tracing::warn!(error = %err, "sweeper failed to list pending orders");
                continue;
            }
        };

        for number in pending {
            if dispatch_tx.try_send(number).is_err() {
                tracing::debug!(order = number, "dispatch queue full, dropping; will retry next pass");
            }
        }
    }
}
