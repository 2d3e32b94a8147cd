//! Janitor loop — every `janitor_interval`, reclaims LEASED jobs whose
//! lease has gone stale (heartbeat-independent; driven by
//! `progress.updated_at` age per the stale-lease policy).

use std::sync::Arc;
use std::time::Duration;

use dspm_queue::QueueClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::metrics::WorkerMetrics;

pub async fn run_janitor_loop(
    queue: Arc<QueueClient>,
    metrics: WorkerMetrics,
    interval: Duration,
    stale_timeout: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match queue.cleanup_stale_jobs(stale_timeout.as_secs() as i64).await {
                    Ok(count) => {
                        if count > 0 {
                            info!(count, "janitor reclaimed stale leases");
                        }
                        metrics.janitor_reclaimed.inc_by(count);
                    }
                    Err(e) => warn!(error = %e, "janitor cleanup failed"),
                }
            }
            _ = cancel.cancelled() => {
                info!("janitor loop stopping");
                break;
            }
        }
    }
}
