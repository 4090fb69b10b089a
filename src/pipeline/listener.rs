//! Wakes the pipeline the instant any replica admits an order, instead of waiting for
//! the sweeper's next pass. A `orders_notify` trigger (see migrations) calls
//! `pg_notify` on insert; we `LISTEN` here and forward the payload straight to the
//! dispatch queue.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const CHANNEL: &str = "order_notifications";
const RECONNECT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn run(database_uri: String, dispatch_tx: mpsc::Sender<i64>, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        if let Err(err) = listen_until_error(&database_uri, &dispatch_tx, &cancel).await {
            tracing::warn!(error = %err, "order notification listener disconnected, retrying");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(RECONNECT_BACKOFF) => {}
            }
        }
    }
}

async fn listen_until_error(
    database_uri: &str,
    dispatch_tx: &mpsc::Sender<i64>,
    cancel: &CancellationToken,
) -> Result<(), sqlx::Error> {
    let mut listener = sqlx::postgres::PgListener::connect(database_uri).await?;
    listener.listen(CHANNEL).await?;

    loop {
        let notification = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            notification = listener.recv() => notification?,
        };

        match notification.payload().parse::<i64>() {
            Ok(number) => {
                if dispatch_tx.try_send(number).is_err() {
                    tracing::debug!(order = number, "dispatch queue full, sweeper will retry");
                }
            }
            Err(_) => tracing::warn!(payload = notification.payload(), "unparseable notification"),
        }
    }
}
