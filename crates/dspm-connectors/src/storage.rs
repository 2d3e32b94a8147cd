//! The storage capability port: bucket/object discovery and posture reads.

use async_trait::async_trait;

use crate::error::ConnectorError;
use crate::types::{AclGrants, BucketMetadata, ByteRange, BucketSummary, ObjectSummary};

#[async_trait]
pub trait StorageCapability: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, ConnectorError>;

    async fn get_bucket_metadata(&self, bucket: &str, region: &str) -> Result<BucketMetadata, ConnectorError>;

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        max_keys: u32,
    ) -> Result<Vec<ObjectSummary>, ConnectorError>;

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<Vec<u8>, ConnectorError>;

    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, ConnectorError>;

    async fn get_bucket_acl(&self, bucket: &str) -> Result<AclGrants, ConnectorError>;
}
