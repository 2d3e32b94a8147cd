//! Typed errors for the queue crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(#[from] redis::RedisError),

    #[error("failed to (de)serialize queue payload: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("job {0} not found in LEASED set")]
    LeaseNotFound(uuid::Uuid),
}
