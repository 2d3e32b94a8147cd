//! Worker-level error type, wrapping the lower layers via `#[from]` per the
//! error-taxonomy's layering (`thiserror` per crate boundary, `anyhow` only
//! at binary entry points).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Queue(#[from] dspm_queue::QueueError),

    #[error(transparent)]
    Connector(#[from] dspm_connectors::ConnectorError),

    #[error(transparent)]
    Persistence(#[from] dspm_persistence::PersistenceError),

    #[error(transparent)]
    Pipeline(#[from] dspm_pipeline::PipelineError),
}
