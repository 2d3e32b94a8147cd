//! The serverless capability port: function inventory for posture scans.

use async_trait::async_trait;

use crate::error::ConnectorError;
use crate::types::FunctionSummary;

#[async_trait]
pub trait ServerlessCapability: Send + Sync {
    async fn list_functions(&self) -> Result<Vec<FunctionSummary>, ConnectorError>;
}
