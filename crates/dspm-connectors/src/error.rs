//! Typed errors for the connectors crate.

use thiserror::Error;

/// Errors that can occur talking to a cloud provider capability.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("unsupported provider or capability: {0}")]
    Unsupported(String),

    #[error("request to provider failed: {0}")]
    RequestFailed(String),

    #[error("invalid or missing configuration: {0}")]
    ConfigError(String),

    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),
}

impl From<url::ParseError> for ConnectorError {
    fn from(e: url::ParseError) -> Self {
        ConnectorError::MalformedIdentifier(e.to_string())
    }
}
