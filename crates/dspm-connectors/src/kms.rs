//! The KMS capability port: key inventory for the encryption posture check.

use async_trait::async_trait;

use crate::error::ConnectorError;
use crate::types::KeyDescription;

#[async_trait]
pub trait KmsCapability: Send + Sync {
    async fn describe_key(&self, key_ref: &str) -> Result<KeyDescription, ConnectorError>;
}
