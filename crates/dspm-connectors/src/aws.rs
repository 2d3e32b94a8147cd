//! AWS SDK-backed capability implementations.
//!
//! Unlike a data-plane-only client, these implementations issue the control
//! plane calls the posture scan needs (bucket ACLs, policies, public access
//! block, versioning, role policies) directly against `aws-sdk-s3` /
//! `aws-sdk-iam` / `aws-sdk-kms`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use tracing::debug;

use crate::error::ConnectorError;
use crate::iam::IamCapability;
use crate::kms::KmsCapability;
use crate::region_cache::RegionClientCache;
use crate::storage::StorageCapability;
use crate::types::{
    AclGrant, AclGrants, BucketMetadata, BucketSummary, ByteRange, EncryptionStatus, KeyDescription,
    ObjectSummary, PublicAccessBlock,
};

/// Connection configuration for the AWS-backed capabilities.
#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    /// Builds an [`AwsConfig`] from environment variables:
    /// `AWS_REGION`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_ENDPOINT_URL`.
    ///
    /// Explicit credentials are optional — when absent the SDK falls back to
    /// its normal provider chain (profile, instance metadata, web identity).
    pub fn from_env() -> Result<Self, ConnectorError> {
        Ok(Self {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
        })
    }

    async fn sdk_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));

        if let (Some(ak), Some(sk)) = (&self.access_key_id, &self.secret_access_key) {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                ak.clone(),
                sk.clone(),
                None,
                None,
                "dspm-static",
            ));
        }
        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }

        loader.load().await
    }
}

pub struct AwsStorageCapability {
    home_client: aws_sdk_s3::Client,
    base_config: AwsConfig,
    region_clients: RegionClientCache<aws_sdk_s3::Client>,
}

impl AwsStorageCapability {
    pub async fn new(config: &AwsConfig) -> Self {
        let sdk_config = config.sdk_config().await;
        Self {
            home_client: aws_sdk_s3::Client::new(&sdk_config),
            base_config: config.clone(),
            region_clients: RegionClientCache::new(),
        }
    }

    /// Resolves the region a bucket actually lives in. `GetBucketLocation`
    /// reports the empty constraint for `us-east-1`.
    async fn resolve_bucket_region(&self, bucket: &str) -> Result<String, ConnectorError> {
        let resp = self
            .home_client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

        let region = resp
            .location_constraint()
            .map(|c| c.as_str().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "us-east-1".to_string());

        Ok(region)
    }

    /// Resolves `bucket`'s region and returns the memoized client for that
    /// region, building a fresh one on a cache miss (§4.2.1: "resolve region
    /// via a location lookup; cache a client per region").
    async fn regional_client(&self, bucket: &str) -> Result<Arc<aws_sdk_s3::Client>, ConnectorError> {
        let region = self.resolve_bucket_region(bucket).await?;
        let base_config = self.base_config.clone();
        let region_for_build = region.clone();

        let client = self
            .region_clients
            .get_or_insert_with(&region, move || async move {
                let mut cfg = base_config;
                cfg.region = region_for_build;
                aws_sdk_s3::Client::new(&cfg.sdk_config().await)
            })
            .await;

        Ok(client)
    }
}

#[async_trait]
impl StorageCapability for AwsStorageCapability {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, ConnectorError> {
        let resp = self
            .home_client
            .list_buckets()
            .send()
            .await
            .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

        let mut summaries = Vec::new();
        for name in resp.buckets().iter().filter_map(|b| b.name()) {
            let region = self.resolve_bucket_region(name).await.ok();
            summaries.push(BucketSummary {
                name: name.to_string(),
                region,
            });
        }
        Ok(summaries)
    }

    async fn get_bucket_metadata(&self, bucket: &str, region: &str) -> Result<BucketMetadata, ConnectorError> {
        let client = self.regional_client(bucket).await?;

        let encryption = fetch_encryption(&client, bucket).await?;
        let versioning = fetch_versioning(&client, bucket).await?;
        let logging = fetch_logging(&client, bucket).await?;
        let public_access_block = fetch_public_access_block(&client, bucket).await?;
        let policy = fetch_bucket_policy(&client, bucket).await?;
        let acl = fetch_bucket_acl(&client, bucket).await?;

        debug!(bucket, region, "fetched bucket metadata");

        Ok(BucketMetadata {
            encryption,
            versioning,
            logging,
            public_access_block,
            tags: HashMap::new(),
            policy,
            acl,
        })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        max_keys: u32,
    ) -> Result<Vec<ObjectSummary>, ConnectorError> {
        let client = self.regional_client(bucket).await?;
        let mut req = client.list_objects_v2().bucket(bucket).max_keys(max_keys as i32);
        if let Some(p) = prefix {
            req = req.prefix(p);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

        Ok(resp
            .contents()
            .iter()
            .filter_map(|o| o.key().map(|k| (k, o.size().unwrap_or(0))))
            .map(|(key, size)| ObjectSummary {
                key: key.to_string(),
                size: size.max(0) as u64,
            })
            .collect())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<Vec<u8>, ConnectorError> {
        let client = self.regional_client(bucket).await?;
        let mut req = client.get_object().bucket(bucket).key(key);
        if let Some(r) = range {
            req = req.range(format!("bytes={}-{}", r.start, r.end));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

        Ok(bytes.into_bytes().to_vec())
    }

    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, ConnectorError> {
        let client = self.regional_client(bucket).await?;
        fetch_bucket_policy(&client, bucket).await
    }

    async fn get_bucket_acl(&self, bucket: &str) -> Result<AclGrants, ConnectorError> {
        let client = self.regional_client(bucket).await?;
        fetch_bucket_acl(&client, bucket).await
    }
}

async fn fetch_encryption(client: &aws_sdk_s3::Client, bucket: &str) -> Result<EncryptionStatus, ConnectorError> {
    match client.get_bucket_encryption().bucket(bucket).send().await {
        Ok(resp) => {
            let rule = resp
                .server_side_encryption_configuration()
                .and_then(|c| c.rules().first());

            let Some(rule) = rule else {
                return Ok(EncryptionStatus::None);
            };

            let Some(default) = rule.apply_server_side_encryption_by_default() else {
                return Ok(EncryptionStatus::Sse);
            };

            let key_ref = default.kms_master_key_id().map(|k| k.to_string());
            match default.sse_algorithm() {
                aws_sdk_s3::types::ServerSideEncryption::AwsKms => Ok(EncryptionStatus::SseKms { key_ref }),
                aws_sdk_s3::types::ServerSideEncryption::Aes256 => Ok(EncryptionStatus::Sse),
                _ => Ok(EncryptionStatus::Cmk { key_ref }),
            }
        }
        Err(e) => {
            if is_not_found(&e) {
                Ok(EncryptionStatus::None)
            } else {
                Err(ConnectorError::RequestFailed(e.to_string()))
            }
        }
    }
}

async fn fetch_versioning(client: &aws_sdk_s3::Client, bucket: &str) -> Result<bool, ConnectorError> {
    let resp = client
        .get_bucket_versioning()
        .bucket(bucket)
        .send()
        .await
        .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

    Ok(matches!(
        resp.status(),
        Some(aws_sdk_s3::types::BucketVersioningStatus::Enabled)
    ))
}

async fn fetch_logging(client: &aws_sdk_s3::Client, bucket: &str) -> Result<bool, ConnectorError> {
    let resp = client
        .get_bucket_logging()
        .bucket(bucket)
        .send()
        .await
        .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

    Ok(resp.logging_enabled().is_some())
}

async fn fetch_public_access_block(
    client: &aws_sdk_s3::Client,
    bucket: &str,
) -> Result<PublicAccessBlock, ConnectorError> {
    match client.get_public_access_block().bucket(bucket).send().await {
        Ok(resp) => {
            let config = resp.public_access_block_configuration();
            Ok(PublicAccessBlock {
                block_public_acls: config.and_then(|c| c.block_public_acls()).unwrap_or(false),
                block_public_policy: config.and_then(|c| c.block_public_policy()).unwrap_or(false),
            })
        }
        Err(e) => {
            if is_not_found(&e) {
                Ok(PublicAccessBlock::default())
            } else {
                Err(ConnectorError::RequestFailed(e.to_string()))
            }
        }
    }
}

async fn fetch_bucket_policy(client: &aws_sdk_s3::Client, bucket: &str) -> Result<Option<String>, ConnectorError> {
    match client.get_bucket_policy().bucket(bucket).send().await {
        Ok(resp) => Ok(resp.policy().map(|p| p.to_string())),
        Err(e) => {
            if is_not_found(&e) {
                Ok(None)
            } else {
                Err(ConnectorError::RequestFailed(e.to_string()))
            }
        }
    }
}

async fn fetch_bucket_acl(client: &aws_sdk_s3::Client, bucket: &str) -> Result<AclGrants, ConnectorError> {
    let resp = client
        .get_bucket_acl()
        .bucket(bucket)
        .send()
        .await
        .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

    let grants = resp
        .grants()
        .iter()
        .map(|g| AclGrant {
            grantee_uri: g.grantee().and_then(|gr| gr.uri()).map(|u| u.to_string()),
            permission: g.permission().map(|p| p.as_str().to_string()).unwrap_or_default(),
        })
        .collect();

    Ok(AclGrants { grants })
}

fn is_not_found<E: std::fmt::Display>(err: &E) -> bool {
    let msg = err.to_string();
    msg.contains("NoSuchBucketPolicy")
        || msg.contains("ServerSideEncryptionConfigurationNotFoundError")
        || msg.contains("NoSuchPublicAccessBlockConfiguration")
        || msg.contains("NotFound")
}

pub struct AwsIamCapability {
    client: aws_sdk_iam::Client,
}

impl AwsIamCapability {
    pub async fn new(config: &AwsConfig) -> Self {
        let sdk_config = config.sdk_config().await;
        Self {
            client: aws_sdk_iam::Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl IamCapability for AwsIamCapability {
    async fn list_roles(&self) -> Result<Vec<String>, ConnectorError> {
        let resp = self
            .client
            .list_roles()
            .send()
            .await
            .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

        Ok(resp.roles().iter().map(|r| r.role_name().to_string()).collect())
    }

    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<String>, ConnectorError> {
        let role_name = crate::iam::role_name_or_parse(role_name)?;
        let resp = self
            .client
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

        Ok(resp
            .attached_policies()
            .iter()
            .filter_map(|p| p.policy_name())
            .map(|n| n.to_string())
            .collect())
    }
}

pub struct AwsKmsCapability {
    client: aws_sdk_kms::Client,
}

impl AwsKmsCapability {
    pub async fn new(config: &AwsConfig) -> Self {
        let sdk_config = config.sdk_config().await;
        Self {
            client: aws_sdk_kms::Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl KmsCapability for AwsKmsCapability {
    async fn describe_key(&self, key_ref: &str) -> Result<KeyDescription, ConnectorError> {
        let resp = self
            .client
            .describe_key()
            .key_id(key_ref)
            .send()
            .await
            .map_err(|e| ConnectorError::RequestFailed(e.to_string()))?;

        let metadata = resp.key_metadata().ok_or_else(|| {
            ConnectorError::NotFound(format!("no key metadata returned for {key_ref}"))
        })?;

        Ok(KeyDescription {
            key_id: metadata.key_id().to_string(),
            enabled: metadata.enabled(),
            managed_by_customer: matches!(
                metadata.key_manager(),
                Some(aws_sdk_kms::types::KeyManagerType::Customer)
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_defaults_region_without_explicit_credentials() {
        std::env::remove_var("AWS_REGION");
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
        let config = AwsConfig::from_env().unwrap();
        assert_eq!(config.region, "us-east-1");
        assert!(config.access_key_id.is_none());
    }

    #[test]
    fn not_found_heuristic_matches_known_error_strings() {
        assert!(is_not_found(&"NoSuchBucketPolicy: the bucket policy does not exist"));
        assert!(is_not_found(
            &"ServerSideEncryptionConfigurationNotFoundError"
        ));
        assert!(!is_not_found(&"AccessDenied"));
    }
}
