//! Wire types for the job queue: stable JSON schemas per the external
//! interfaces contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanType {
    Full,
    AssetDiscovery,
    Classification,
    AccessAnalysis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobScope {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buckets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub job_type: String,
    pub account_id: String,
    pub scan_type: ScanType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<JobScope>,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
}

impl Job {
    /// Builds a new job with `id` unset (assigned by `enqueue`) and
    /// `created_at`/`attempts` at their initial values.
    pub fn new(job_type: impl Into<String>, account_id: impl Into<String>, scan_type: ScanType, priority: i64) -> Self {
        Self {
            id: Uuid::nil(),
            job_type: job_type.into(),
            account_id: account_id.into(),
            scan_type,
            scope: None,
            priority,
            created_at: Utc::now(),
            attempts: 0,
        }
    }

    pub fn with_scope(mut self, scope: JobScope) -> Self {
        self.scope = Some(scope);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub total_assets: u64,
    pub scanned_assets: u64,
    pub total_objects: u64,
    pub scanned_objects: u64,
    pub classifications_found: u64,
    pub findings_found: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
}

impl JobProgress {
    pub fn pending_for(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            total_assets: 0,
            scanned_assets: 0,
            total_objects: 0,
            scanned_objects: 0,
            classifications_found: 0,
            findings_found: 0,
            errors: Vec::new(),
            started_at: None,
            updated_at: Utc::now(),
            completed_at: None,
            worker_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Queue-tuned constants, fixed as literal numbers rather than
/// runtime-configurable.
pub const ATTEMPT_CAP: u32 = 3;
pub const REQUEUE_BACKOFF_UNIT_SECS: i64 = 30;
pub const PROGRESS_TTL_SECS: i64 = 24 * 60 * 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_new_has_zero_attempts_and_nil_id() {
        let job = Job::new("scan", "acct-1", ScanType::Full, 5);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.id, Uuid::nil());
    }

    #[test]
    fn job_progress_pending_for_starts_with_zeroed_counters() {
        let progress = JobProgress::pending_for(Uuid::new_v4());
        assert_eq!(progress.status, JobStatus::Pending);
        assert_eq!(progress.scanned_assets, 0);
        assert!(progress.errors.is_empty());
    }
}
