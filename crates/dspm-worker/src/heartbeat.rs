//! Heartbeat loop — reports this worker alive to the queue every
//! `heartbeat_interval` until cancelled.

use std::sync::Arc;
use std::time::Duration;

use dspm_queue::QueueClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub async fn run_heartbeat_loop(worker_id: String, queue: Arc<QueueClient>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match queue.heartbeat(&worker_id).await {
                    Ok(()) => debug!(worker_id = %worker_id, "heartbeat sent"),
                    Err(e) => warn!(worker_id = %worker_id, error = %e, "heartbeat failed"),
                }
            }
            _ = cancel.cancelled() => {
                debug!(worker_id = %worker_id, "heartbeat loop stopping");
                break;
            }
        }
    }
}
