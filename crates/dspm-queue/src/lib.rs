//! Durable, prioritized, leased job queue backed by Redis.
//!
//! Realizes the queue contract: at-least-once delivery, exponential
//! backoff via a score bump, worker heartbeats, and stale-lease
//! reclamation — all against sorted sets, sets, a hash and TTL'd keys
//! rather than a FIFO transport.

pub mod client;
pub mod error;
pub mod types;

pub use client::{score_for, QueueClient};
pub use error::QueueError;
pub use types::{Job, JobProgress, JobScope, JobStatus, QueueStats, ScanType, ATTEMPT_CAP, REQUEUE_BACKOFF_UNIT_SECS};
