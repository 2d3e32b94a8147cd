//! Provider-agnostic cloud capability contracts.
//!
//! Four ports — storage, iam, serverless, kms — each a neutral interface the
//! scan pipeline depends on; cloud-specific field mapping lives entirely in
//! the implementations (`aws`, `mock`), never in the traits themselves.

pub mod aws;
pub mod connector;
pub mod error;
pub mod iam;
pub mod kms;
pub mod mock;
pub mod region_cache;
pub mod serverless;
pub mod storage;
pub mod types;

pub use connector::{Connector, ConnectorConfig};
pub use error::ConnectorError;
pub use iam::{role_name_from_arn, role_name_or_parse, IamCapability};
pub use kms::KmsCapability;
pub use region_cache::RegionClientCache;
pub use serverless::ServerlessCapability;
pub use storage::StorageCapability;
pub use types::{
    AclGrant, AclGrants, BucketMetadata, BucketSummary, ByteRange, EncryptionStatus, FunctionSummary,
    KeyDescription, ObjectSummary, Provider, PublicAccessBlock,
};
