//! Tunables for a single scan run. Defaults mirror the external interfaces
//! "Configuration" table.

use std::time::Duration;

use crate::sampling::{DEFAULT_FILES_PER_BUCKET, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_SAMPLE_SIZE_BYTES};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub bucket_workers: usize,
    pub max_file_size_bytes: u64,
    pub sample_size_bytes: u64,
    pub files_per_bucket: usize,
    pub scan_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket_workers: 10,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            sample_size_bytes: DEFAULT_SAMPLE_SIZE_BYTES,
            files_per_bucket: DEFAULT_FILES_PER_BUCKET,
            scan_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl PipelineConfig {
    /// Object workers per bucket: half the bucket pool, floored at 1.
    pub fn object_workers(&self) -> usize {
        (self.bucket_workers / 2).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_workers_is_half_bucket_workers() {
        let config = PipelineConfig {
            bucket_workers: 10,
            ..PipelineConfig::default()
        };
        assert_eq!(config.object_workers(), 5);
    }

    #[test]
    fn object_workers_floors_at_one() {
        let config = PipelineConfig {
            bucket_workers: 1,
            ..PipelineConfig::default()
        };
        assert_eq!(config.object_workers(), 1);
    }
}
