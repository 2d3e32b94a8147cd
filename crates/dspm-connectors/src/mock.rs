//! Deterministic mock capabilities for pipeline scenario tests.
//!
//! Mirrors the shape of the AWS implementation (same trait boundary) but is
//! seeded in-memory so end-to-end scan scenarios don't need real credentials
//! or network access.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ConnectorError;
use crate::iam::IamCapability;
use crate::storage::StorageCapability;
use crate::types::{AclGrants, BucketMetadata, ByteRange, BucketSummary, ObjectSummary};

#[derive(Debug, Clone)]
pub struct MockObject {
    pub key: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MockBucket {
    pub summary: BucketSummary,
    pub metadata: BucketMetadata,
    pub objects: Vec<MockObject>,
}

/// An in-memory storage capability seeded with fixed buckets/objects.
///
/// Calls are recorded so tests can assert on which buckets/objects were
/// actually touched (useful for the scope-filtering scenario).
pub struct MockStorageCapability {
    buckets: HashMap<String, MockBucket>,
    calls: Mutex<Vec<String>>,
}

impl MockStorageCapability {
    pub fn new(buckets: Vec<MockBucket>) -> Self {
        Self {
            buckets: buckets.into_iter().map(|b| (b.summary.name.clone(), b)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("mock call log poisoned").push(call.into());
    }
}

#[async_trait]
impl StorageCapability for MockStorageCapability {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, ConnectorError> {
        self.record("list_buckets");
        let mut names: Vec<&MockBucket> = self.buckets.values().collect();
        names.sort_by(|a, b| a.summary.name.cmp(&b.summary.name));
        Ok(names.into_iter().map(|b| b.summary.clone()).collect())
    }

    async fn get_bucket_metadata(&self, bucket: &str, _region: &str) -> Result<BucketMetadata, ConnectorError> {
        self.record(format!("get_bucket_metadata:{bucket}"));
        self.buckets
            .get(bucket)
            .map(|b| b.metadata.clone())
            .ok_or_else(|| ConnectorError::NotFound(bucket.to_string()))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        max_keys: u32,
    ) -> Result<Vec<ObjectSummary>, ConnectorError> {
        self.record(format!("list_objects:{bucket}"));
        let b = self
            .buckets
            .get(bucket)
            .ok_or_else(|| ConnectorError::NotFound(bucket.to_string()))?;

        Ok(b.objects
            .iter()
            .filter(|o| prefix.map(|p| o.key.starts_with(p)).unwrap_or(true))
            .take(max_keys as usize)
            .map(|o| ObjectSummary {
                key: o.key.clone(),
                size: o.body.len() as u64,
            })
            .collect())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<Vec<u8>, ConnectorError> {
        self.record(format!("get_object:{bucket}/{key}"));
        let b = self
            .buckets
            .get(bucket)
            .ok_or_else(|| ConnectorError::NotFound(bucket.to_string()))?;
        let obj = b
            .objects
            .iter()
            .find(|o| o.key == key)
            .ok_or_else(|| ConnectorError::NotFound(key.to_string()))?;

        match range {
            Some(r) => {
                let start = r.start as usize;
                let end = ((r.end as usize) + 1).min(obj.body.len());
                Ok(obj.body.get(start..end).unwrap_or_default().to_vec())
            }
            None => Ok(obj.body.clone()),
        }
    }

    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, ConnectorError> {
        self.buckets
            .get(bucket)
            .map(|b| b.metadata.policy.clone())
            .ok_or_else(|| ConnectorError::NotFound(bucket.to_string()))
    }

    async fn get_bucket_acl(&self, bucket: &str) -> Result<AclGrants, ConnectorError> {
        self.buckets
            .get(bucket)
            .map(|b| b.metadata.acl.clone())
            .ok_or_else(|| ConnectorError::NotFound(bucket.to_string()))
    }
}

/// An in-memory IAM capability seeded with role -> attached policy names.
pub struct MockIamCapability {
    roles: HashMap<String, Vec<String>>,
}

impl MockIamCapability {
    pub fn new(roles: HashMap<String, Vec<String>>) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl IamCapability for MockIamCapability {
    async fn list_roles(&self) -> Result<Vec<String>, ConnectorError> {
        let mut names: Vec<String> = self.roles.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<String>, ConnectorError> {
        self.roles
            .get(role_name)
            .cloned()
            .ok_or_else(|| ConnectorError::NotFound(role_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EncryptionStatus, PublicAccessBlock};

    fn bucket(name: &str, public: bool, encrypted: bool, versioned: bool, logged: bool) -> MockBucket {
        MockBucket {
            summary: BucketSummary {
                name: name.to_string(),
                region: Some("us-east-1".to_string()),
            },
            metadata: BucketMetadata {
                encryption: if encrypted {
                    EncryptionStatus::Sse
                } else {
                    EncryptionStatus::None
                },
                versioning: versioned,
                logging: logged,
                public_access_block: PublicAccessBlock {
                    block_public_acls: !public,
                    block_public_policy: !public,
                },
                tags: HashMap::new(),
                policy: None,
                acl: AclGrants::default(),
            },
            objects: Vec::new(),
        }
    }

    #[tokio::test]
    async fn s5_scope_filters_to_named_bucket_only() {
        let mock = MockStorageCapability::new(vec![
            bucket("a", false, true, true, true),
            bucket("b", false, true, true, true),
        ]);

        let all = mock.list_buckets().await.unwrap();
        assert_eq!(all.len(), 2);

        let scoped: Vec<_> = all.into_iter().filter(|b| b.name == "a").collect();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name, "a");
    }

    #[tokio::test]
    async fn object_range_read_respects_bounds() {
        let mock = MockStorageCapability::new(vec![MockBucket {
            summary: BucketSummary {
                name: "a".to_string(),
                region: None,
            },
            metadata: bucket("a", false, true, true, true).metadata,
            objects: vec![MockObject {
                key: "file.txt".to_string(),
                body: b"0123456789".to_vec(),
            }],
        }]);

        let bytes = mock
            .get_object("a", "file.txt", Some(ByteRange { start: 2, end: 4 }))
            .await
            .unwrap();
        assert_eq!(bytes, b"234");
    }

    #[tokio::test]
    async fn missing_bucket_is_not_found() {
        let mock = MockStorageCapability::new(vec![]);
        assert!(mock.get_bucket_metadata("ghost", "us-east-1").await.is_err());
    }
}
