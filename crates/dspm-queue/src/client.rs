//! Redis-backed implementation of the queue contract.
//!
//! Logical layout (see the external interfaces section of the
//! specification this crate realizes):
//!   - sorted set `jobs:scan` — PENDING, member = job id, score as defined
//!   - set `jobs:processing` — LEASED, member = job id
//!   - sets `jobs:completed` / `jobs:failed` — TERMINAL
//!   - hash `jobs:payload` — job id -> canonical JSON `Job`
//!   - hash `workers:heartbeat` — worker id -> last-seen unix seconds
//!   - key `job:progress:{id}` — JSON `JobProgress`, TTL 24h
//!
//! Storing the canonical job JSON in a side hash (rather than as the
//! sorted-set/set member itself) means moving a job between PENDING,
//! LEASED and TERMINAL never depends on reproducing a byte-identical
//! member string — only the job id needs to match.

use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::QueueError;
use crate::types::{Job, JobProgress, JobStatus, QueueStats, ATTEMPT_CAP, PROGRESS_TTL_SECS, REQUEUE_BACKOFF_UNIT_SECS};

const PENDING_KEY: &str = "jobs:scan";
const LEASED_KEY: &str = "jobs:processing";
const COMPLETED_KEY: &str = "jobs:completed";
const FAILED_KEY: &str = "jobs:failed";
const PAYLOAD_KEY: &str = "jobs:payload";
const HEARTBEAT_KEY: &str = "workers:heartbeat";

fn progress_key(job_id: Uuid) -> String {
    format!("job:progress:{job_id}")
}

/// score = enqueue_time(unix) − priority·1000; lower dequeues first.
pub fn score_for(enqueue_unix: i64, priority: i64) -> f64 {
    (enqueue_unix - priority * 1000) as f64
}

#[derive(Clone)]
pub struct QueueClient {
    conn: ConnectionManager,
}

impl QueueClient {
    pub async fn connect(addr: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(addr)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    pub async fn enqueue(&self, mut job: Job) -> Result<Job, QueueError> {
        if job.id.is_nil() {
            job.id = Uuid::new_v4();
        }
        job.created_at = Utc::now();

        let payload = serde_json::to_string(&job)?;
        let score = score_for(job.created_at.timestamp(), job.priority);

        let mut conn = self.conn.clone();
        let _: () = conn.hset(PAYLOAD_KEY, job.id.to_string(), &payload).await?;
        let _: () = conn.zadd(PENDING_KEY, job.id.to_string(), score).await?;

        let progress = JobProgress::pending_for(job.id);
        self.update_progress(&progress).await?;

        debug!(job_id = %job.id, score, "enqueued job");
        Ok(job)
    }

    pub async fn dequeue(&self, worker_id: &str) -> Result<Option<Job>, QueueError> {
        let mut conn = self.conn.clone();

        let popped: Vec<(String, f64)> = conn.zpopmin(PENDING_KEY, 1).await?;
        let Some((job_id_str, score)) = popped.into_iter().next() else {
            return Ok(None);
        };

        let payload: Option<String> = conn.hget(PAYLOAD_KEY, &job_id_str).await?;
        let Some(payload) = payload else {
            // Payload vanished under us; drop the dangling pointer rather than
            // wedging the queue on an unrecoverable id.
            warn!(job_id = %job_id_str, "dequeued id with no payload, discarding");
            return Ok(None);
        };

        let job: Job = serde_json::from_str(&payload)?;

        let leased: i64 = conn.sadd(LEASED_KEY, &job_id_str).await?;
        if leased == 0 {
            // SADD returns 0 both on transport no-ops and on "already a
            // member"; either way we didn't acquire a fresh lease, so put
            // the job back where we found it.
            let _: () = conn.zadd(PENDING_KEY, &job_id_str, score).await?;
            return Err(QueueError::LeaseNotFound(job.id));
        }

        let mut progress = self
            .get_progress(job.id)
            .await?
            .unwrap_or_else(|| JobProgress::pending_for(job.id));
        progress.status = JobStatus::Running;
        progress.started_at = Some(Utc::now());
        progress.worker_id = Some(worker_id.to_string());
        progress.updated_at = Utc::now();
        self.update_progress(&progress).await?;

        Ok(Some(job))
    }

    pub async fn complete(&self, job: &Job, success: bool) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let id = job.id.to_string();

        let _: () = conn.srem(LEASED_KEY, &id).await?;
        let terminal_key = if success { COMPLETED_KEY } else { FAILED_KEY };
        let _: () = conn.sadd(terminal_key, &id).await?;

        let mut progress = self
            .get_progress(job.id)
            .await?
            .unwrap_or_else(|| JobProgress::pending_for(job.id));
        progress.status = if success { JobStatus::Completed } else { JobStatus::Failed };
        progress.completed_at = Some(Utc::now());
        progress.updated_at = Utc::now();
        self.update_progress(&progress).await
    }

    pub async fn requeue(&self, job: &mut Job, error_msg: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let id = job.id.to_string();

        let _: () = conn.srem(LEASED_KEY, &id).await?;
        job.attempts += 1;

        if job.attempts >= ATTEMPT_CAP {
            return self.complete(job, false).await;
        }

        let payload = serde_json::to_string(job)?;
        let _: () = conn.hset(PAYLOAD_KEY, &id, &payload).await?;

        let score = (Utc::now().timestamp() + REQUEUE_BACKOFF_UNIT_SECS * job.attempts as i64) as f64;
        let _: () = conn.zadd(PENDING_KEY, &id, score).await?;

        let mut progress = self
            .get_progress(job.id)
            .await?
            .unwrap_or_else(|| JobProgress::pending_for(job.id));
        progress.status = JobStatus::Pending;
        progress.errors.push(error_msg.to_string());
        progress.updated_at = Utc::now();
        self.update_progress(&progress).await
    }

    pub async fn update_progress(&self, progress: &JobProgress) -> Result<(), QueueError> {
        let mut progress = progress.clone();
        progress.updated_at = Utc::now();
        let payload = serde_json::to_string(&progress)?;

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(progress_key(progress.job_id), payload, PROGRESS_TTL_SECS as u64)
            .await?;
        Ok(())
    }

    pub async fn get_progress(&self, job_id: Uuid) -> Result<Option<JobProgress>, QueueError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(progress_key(job_id)).await?;
        Ok(match payload {
            Some(p) => Some(serde_json::from_str(&p)?),
            None => None,
        })
    }

    pub async fn queue_stats(&self) -> Result<QueueStats, QueueError> {
        let mut conn = self.conn.clone();
        let pending: u64 = conn.zcard(PENDING_KEY).await?;
        let processing: u64 = conn.scard(LEASED_KEY).await?;
        let completed: u64 = conn.scard(COMPLETED_KEY).await?;
        let failed: u64 = conn.scard(FAILED_KEY).await?;
        Ok(QueueStats {
            pending,
            processing,
            completed,
            failed,
        })
    }

    pub async fn heartbeat(&self, worker_id: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(HEARTBEAT_KEY, worker_id, Utc::now().timestamp()).await?;
        Ok(())
    }

    pub async fn active_workers(&self, timeout_secs: i64) -> Result<Vec<String>, QueueError> {
        let mut conn = self.conn.clone();
        let all: std::collections::HashMap<String, i64> = conn.hgetall(HEARTBEAT_KEY).await?;
        let now = Utc::now().timestamp();
        Ok(all
            .into_iter()
            .filter(|(_, last_seen)| *last_seen > now - timeout_secs)
            .map(|(worker_id, _)| worker_id)
            .collect())
    }

    /// Reclaims LEASED jobs whose progress hasn't been updated in
    /// `timeout_secs`. Returns the number of jobs moved.
    pub async fn cleanup_stale_jobs(&self, timeout_secs: i64) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let leased: Vec<String> = conn.smembers(LEASED_KEY).await?;
        let now = Utc::now();
        let mut cleaned = 0u64;

        for id_str in leased {
            let Ok(job_id) = Uuid::parse_str(&id_str) else {
                continue;
            };
            let Some(progress) = self.get_progress(job_id).await? else {
                continue;
            };
            let age_secs = (now - progress.updated_at).num_seconds();
            if age_secs <= timeout_secs {
                continue;
            }

            let _: () = conn.srem(LEASED_KEY, &id_str).await?;

            let payload: Option<String> = conn.hget(PAYLOAD_KEY, &id_str).await?;
            let Some(payload) = payload else { continue };
            let mut job: Job = serde_json::from_str(&payload)?;
            job.attempts += 1;

            if job.attempts < ATTEMPT_CAP {
                let updated_payload = serde_json::to_string(&job)?;
                let _: () = conn.hset(PAYLOAD_KEY, &id_str, &updated_payload).await?;
                let _: () = conn.zadd(PENDING_KEY, &id_str, now.timestamp() as f64).await?;

                let mut progress = progress;
                progress.status = JobStatus::Pending;
                self.update_progress(&progress).await?;
            } else {
                let _: () = conn.sadd(FAILED_KEY, &id_str).await?;

                let mut progress = progress;
                progress.status = JobStatus::Failed;
                progress.completed_at = Some(now);
                self.update_progress(&progress).await?;
            }

            cleaned += 1;
        }

        debug!(cleaned, "janitor reclaimed stale leases");
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_orders_by_enqueue_time_minus_priority_bonus() {
        let now = 1_700_000_000;
        let low_priority = score_for(now, 0);
        let high_priority = score_for(now, 10);
        assert!(high_priority < low_priority);
    }

    #[test]
    fn equal_priority_orders_by_enqueue_time() {
        let earlier = score_for(1_700_000_000, 5);
        let later = score_for(1_700_000_100, 5);
        assert!(earlier < later);
    }
}
