//! The `Connector` sum type: one concrete capability bundle per provider,
//! dispatched by tag rather than reflection (see the design notes on
//! duck-typed connectors).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aws::{AwsConfig, AwsIamCapability, AwsKmsCapability, AwsStorageCapability};
use crate::error::ConnectorError;
use crate::iam::IamCapability;
use crate::kms::KmsCapability;
use crate::storage::StorageCapability;
use crate::types::Provider;

/// Serialized per-account connector configuration (`account.connectorConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub provider: Provider,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

impl ConnectorConfig {
    /// Checks the configuration is internally consistent without making any
    /// network calls: region set, and either both or neither of the
    /// (access key, secret key) pair provided.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.region.trim().is_empty() {
            return Err(ConnectorError::ConfigError("region must not be empty".to_string()));
        }
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(_), None) | (None, Some(_)) => Err(ConnectorError::ConfigError(
                "access_key_id and secret_access_key must be provided together".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// A constructed, capability-bearing connector for one provider.
pub enum Connector {
    Aws {
        storage: Arc<dyn StorageCapability>,
        iam: Arc<dyn IamCapability>,
        #[allow(dead_code)]
        kms: Arc<dyn KmsCapability>,
    },
}

impl Connector {
    /// Constructs a `Connector` from an account's connector configuration,
    /// per the worker runtime's "construct a provider Connector... validate()
    /// it" contract.
    pub async fn from_config(config: &ConnectorConfig) -> Result<Self, ConnectorError> {
        config.validate()?;

        match config.provider {
            Provider::Aws => {
                let aws_config = AwsConfig {
                    region: config.region.clone(),
                    access_key_id: config.access_key_id.clone(),
                    secret_access_key: config.secret_access_key.clone(),
                    endpoint_url: config.endpoint_url.clone(),
                };

                Ok(Connector::Aws {
                    storage: Arc::new(AwsStorageCapability::new(&aws_config).await),
                    iam: Arc::new(AwsIamCapability::new(&aws_config).await),
                    kms: Arc::new(AwsKmsCapability::new(&aws_config).await),
                })
            }
            other => Err(ConnectorError::Unsupported(format!("{other:?}"))),
        }
    }

    pub fn storage(&self) -> Arc<dyn StorageCapability> {
        match self {
            Connector::Aws { storage, .. } => storage.clone(),
        }
    }

    pub fn iam(&self) -> Arc<dyn IamCapability> {
        match self {
            Connector::Aws { iam, .. } => iam.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_region_fails_validation() {
        let config = ConnectorConfig {
            provider: Provider::Aws,
            region: "".to_string(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn mismatched_credential_pair_fails_validation() {
        let config = ConnectorConfig {
            provider: Provider::Aws,
            region: "us-east-1".to_string(),
            access_key_id: Some("ak".to_string()),
            secret_access_key: None,
            endpoint_url: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn complete_config_validates() {
        let config = ConnectorConfig {
            provider: Provider::Aws,
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
        };
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn unsupported_provider_is_rejected() {
        let config = ConnectorConfig {
            provider: Provider::Gcp,
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
        };
        let result = Connector::from_config(&config).await;
        assert!(matches!(result, Err(ConnectorError::Unsupported(_))));
    }
}
