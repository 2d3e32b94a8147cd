//! Worker configuration from environment variables.

use std::time::Duration;

use anyhow::{Context, Result};

/// Every worker tunable, with defaults applied when the corresponding
/// environment variable is unset.
#[derive(Debug, Clone)]
pub struct DspmConfig {
    pub worker_id: String,
    pub bucket_workers: usize,
    pub max_file_size_bytes: u64,
    pub sample_size_bytes: u64,
    pub files_per_bucket: usize,
    pub scan_timeout: Duration,
    pub queue_addr: String,
    pub queue_password: Option<String>,
    pub queue_db: u8,
    pub heartbeat_interval: Duration,
    pub stale_timeout: Duration,
    pub attempt_cap: u32,
    pub requeue_backoff_unit: Duration,
    pub database_url: String,
    pub metrics_port: u16,
    pub janitor_interval: Duration,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(v) => v.parse().map_err(|_| anyhow::anyhow!("invalid {key}")),
        Err(_) => Ok(default),
    }
}

impl DspmConfig {
    /// Builds the pipeline's per-scan tunables from the worker-wide config.
    pub fn to_pipeline_config(&self) -> dspm_pipeline::PipelineConfig {
        dspm_pipeline::PipelineConfig {
            bucket_workers: self.bucket_workers,
            max_file_size_bytes: self.max_file_size_bytes,
            sample_size_bytes: self.sample_size_bytes,
            files_per_bucket: self.files_per_bucket,
            scan_timeout: self.scan_timeout,
        }
    }

    /// Folds `queue_password`/`queue_db` into a single `redis://` URL when
    /// `queue_addr` doesn't already carry connection parameters.
    pub fn redis_url(&self) -> String {
        if self.queue_password.is_none() || self.queue_addr.contains('@') {
            return self.queue_addr.clone();
        }
        let Some(rest) = self.queue_addr.strip_prefix("redis://") else {
            return self.queue_addr.clone();
        };
        format!(
            "redis://:{}@{}/{}",
            self.queue_password.as_deref().unwrap_or_default(),
            rest,
            self.queue_db
        )
    }

    pub fn from_env() -> Result<Self> {
        let worker_id = std::env::var("WORKER_ID").unwrap_or_else(|_| generate_worker_id());

        Ok(Self {
            worker_id,
            bucket_workers: env_or("WORKERS", 10usize)?,
            max_file_size_bytes: env_or("MAX_FILE_SIZE_BYTES", 100 * 1024 * 1024u64)?,
            sample_size_bytes: env_or("SAMPLE_SIZE_BYTES", 1024 * 1024u64)?,
            files_per_bucket: env_or("FILES_PER_BUCKET", 1000usize)?,
            scan_timeout: Duration::from_secs(env_or("SCAN_TIMEOUT_SECS", 300u64)?),
            queue_addr: std::env::var("QUEUE_ADDR").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            queue_password: std::env::var("QUEUE_PASSWORD").ok(),
            queue_db: env_or("QUEUE_DB", 0u8)?,
            heartbeat_interval: Duration::from_secs(env_or("HEARTBEAT_INTERVAL_SECS", 10u64)?),
            stale_timeout: Duration::from_secs(env_or("STALE_TIMEOUT_SECS", 30 * 60u64)?),
            attempt_cap: env_or("ATTEMPT_CAP", 3u32)?,
            requeue_backoff_unit: Duration::from_secs(env_or("REQUEUE_BACKOFF_UNIT_SECS", 30u64)?),
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL required")?,
            metrics_port: env_or("METRICS_PORT", 9090u16)?,
            janitor_interval: Duration::from_secs(env_or("JANITOR_INTERVAL_SECS", 5 * 60u64)?),
        })
    }
}

/// `hostname + short random suffix`, per the worker runtime's id contract.
fn generate_worker_id() -> String {
    use rand::Rng;
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "worker".to_string());
    let suffix: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{host}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_worker_id_has_hostname_and_suffix() {
        let id = generate_worker_id();
        assert!(id.contains('-'));
        let suffix = id.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 6);
    }

    fn base_config() -> DspmConfig {
        DspmConfig {
            worker_id: "w-1".to_string(),
            bucket_workers: 10,
            max_file_size_bytes: 100 * 1024 * 1024,
            sample_size_bytes: 1024 * 1024,
            files_per_bucket: 1000,
            scan_timeout: Duration::from_secs(300),
            queue_addr: "redis://127.0.0.1:6379".to_string(),
            queue_password: None,
            queue_db: 0,
            heartbeat_interval: Duration::from_secs(10),
            stale_timeout: Duration::from_secs(1800),
            attempt_cap: 3,
            requeue_backoff_unit: Duration::from_secs(30),
            database_url: "postgres://localhost/dspm".to_string(),
            metrics_port: 9090,
            janitor_interval: Duration::from_secs(300),
        }
    }

    #[test]
    fn redis_url_passes_through_without_password() {
        let config = base_config();
        assert_eq!(config.redis_url(), "redis://127.0.0.1:6379");
    }

    #[test]
    fn redis_url_folds_in_password_and_db() {
        let mut config = base_config();
        config.queue_password = Some("hunter2".to_string());
        config.queue_db = 2;
        assert_eq!(config.redis_url(), "redis://:hunter2@127.0.0.1:6379/2");
    }

    #[test]
    fn to_pipeline_config_carries_over_tunables() {
        let config = base_config();
        let pipeline = config.to_pipeline_config();
        assert_eq!(pipeline.bucket_workers, config.bucket_workers);
        assert_eq!(pipeline.sample_size_bytes, config.sample_size_bytes);
    }
}
