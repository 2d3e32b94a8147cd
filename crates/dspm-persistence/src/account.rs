//! The account record the worker runtime resolves a job against before it
//! can construct a provider connector.
//!
//! Schema ownership belongs to the relational store (per the design notes
//! on "JSONB columns"); this crate only reads the one column the worker
//! needs to build a `ConnectorConfig`.

use dspm_connectors::ConnectorConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub connector_config: ConnectorConfig,
}
