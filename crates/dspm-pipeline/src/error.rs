//! Typed errors for the pipeline crate.

use thiserror::Error;

/// Orchestration-layer failures — the scanner never returns an error for
/// per-asset/per-object failures, only for bucket-enumeration-level
/// problems.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to list buckets: {0}")]
    ListBucketsFailed(String),

    #[error("scan cancelled")]
    Cancelled,

    #[error(transparent)]
    Connector(#[from] dspm_connectors::ConnectorError),
}
