//! Neutral record shapes returned by capability ports.
//!
//! Every cloud-specific field mapping (ARN construction, public-access
//! translation, etc.) is the responsibility of the connector implementation;
//! these types are what the pipeline is allowed to depend on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
}

/// Encryption-at-rest status of a storage bucket/container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncryptionStatus {
    None,
    Sse,
    SseKms { key_ref: Option<String> },
    Cmk { key_ref: Option<String> },
}

impl EncryptionStatus {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, EncryptionStatus::None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclGrant {
    /// URI grantee, e.g. the well-known AllUsers/AuthenticatedUsers groups.
    pub grantee_uri: Option<String>,
    pub permission: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclGrants {
    pub grants: Vec<AclGrant>,
}

pub const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
pub const AUTHENTICATED_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

impl AclGrants {
    /// True if any grant targets the AllUsers or AuthenticatedUsers groups.
    pub fn grants_public_access(&self) -> bool {
        self.grants.iter().any(|g| {
            matches!(
                g.grantee_uri.as_deref(),
                Some(ALL_USERS_URI) | Some(AUTHENTICATED_USERS_URI)
            )
        })
    }
}

#[derive(Debug, Clone)]
pub struct BucketSummary {
    pub name: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BucketMetadata {
    pub encryption: EncryptionStatus,
    pub versioning: bool,
    pub logging: bool,
    pub public_access_block: PublicAccessBlock,
    pub tags: HashMap<String, String>,
    /// Raw bucket policy JSON, if one is attached.
    pub policy: Option<String>,
    pub acl: AclGrants,
}

impl BucketMetadata {
    /// public = !(BlockPublicAcls && BlockPublicPolicy), OR'd with an
    /// explicit policy/ACL grant to the public.
    pub fn is_publicly_accessible(&self) -> bool {
        let block_incomplete = !(self.public_access_block.block_public_acls
            && self.public_access_block.block_public_policy);

        block_incomplete || self.policy_allows_public() || self.acl.grants_public_access()
    }

    fn policy_allows_public(&self) -> bool {
        let Some(policy) = &self.policy else {
            return false;
        };
        policy_grants_wildcard_principal(policy)
    }
}

/// Parses a bucket policy document looking for a statement granting
/// `Principal: "*"` with `Effect: "Allow"`. Deliberately tolerant of
/// malformed JSON — an unparsable policy is treated as not granting public
/// access rather than failing the whole metadata fetch.
pub fn policy_grants_wildcard_principal(policy_json: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(policy_json) else {
        return false;
    };

    let Some(statements) = value.get("Statement").and_then(|s| s.as_array()) else {
        return false;
    };

    statements.iter().any(|stmt| {
        let effect_allow = stmt.get("Effect").and_then(|e| e.as_str()) == Some("Allow");
        let principal_wildcard = match stmt.get("Principal") {
            Some(serde_json::Value::String(s)) => s == "*",
            Some(serde_json::Value::Object(map)) => map
                .get("AWS")
                .map(|aws| aws == "*" || aws.as_array().map(|a| a.iter().any(|v| v == "*")).unwrap_or(false))
                .unwrap_or(false),
            _ => false,
        };
        effect_allow && principal_wildcard
    })
}

#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive end offset.
    pub end: u64,
}

#[derive(Debug, Clone)]
pub struct FunctionSummary {
    pub name: String,
    pub runtime: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KeyDescription {
    pub key_id: String,
    pub enabled: bool,
    pub managed_by_customer: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(uri: &str) -> AclGrant {
        AclGrant {
            grantee_uri: Some(uri.to_string()),
            permission: "READ".to_string(),
        }
    }

    #[test]
    fn public_access_block_true_true_blocks_access() {
        let meta = BucketMetadata {
            encryption: EncryptionStatus::None,
            versioning: false,
            logging: false,
            public_access_block: PublicAccessBlock {
                block_public_acls: true,
                block_public_policy: true,
            },
            tags: HashMap::new(),
            policy: None,
            acl: AclGrants::default(),
        };
        assert!(!meta.is_publicly_accessible());
    }

    #[test]
    fn missing_block_public_policy_makes_bucket_public() {
        let meta = BucketMetadata {
            encryption: EncryptionStatus::None,
            versioning: false,
            logging: false,
            public_access_block: PublicAccessBlock {
                block_public_acls: true,
                block_public_policy: false,
            },
            tags: HashMap::new(),
            policy: None,
            acl: AclGrants::default(),
        };
        assert!(meta.is_publicly_accessible());
    }

    #[test]
    fn acl_grant_to_all_users_makes_bucket_public() {
        let meta = BucketMetadata {
            encryption: EncryptionStatus::None,
            versioning: false,
            logging: false,
            public_access_block: PublicAccessBlock {
                block_public_acls: true,
                block_public_policy: true,
            },
            tags: HashMap::new(),
            policy: None,
            acl: AclGrants {
                grants: vec![grant(ALL_USERS_URI)],
            },
        };
        assert!(meta.is_publicly_accessible());
    }

    #[test]
    fn policy_with_wildcard_principal_allow_is_public() {
        let policy = r#"{"Statement":[{"Effect":"Allow","Principal":"*","Action":"s3:GetObject"}]}"#;
        assert!(policy_grants_wildcard_principal(policy));
    }

    #[test]
    fn policy_with_specific_principal_is_not_public() {
        let policy = r#"{"Statement":[{"Effect":"Allow","Principal":{"AWS":"arn:aws:iam::123:root"}}]}"#;
        assert!(!policy_grants_wildcard_principal(policy));
    }

    #[test]
    fn policy_with_deny_wildcard_is_not_public() {
        let policy = r#"{"Statement":[{"Effect":"Deny","Principal":"*"}]}"#;
        assert!(!policy_grants_wildcard_principal(policy));
    }

    #[test]
    fn malformed_policy_json_is_not_public() {
        assert!(!policy_grants_wildcard_principal("not json"));
    }

    #[test]
    fn encryption_status_is_enabled() {
        assert!(!EncryptionStatus::None.is_enabled());
        assert!(EncryptionStatus::Sse.is_enabled());
        assert!(EncryptionStatus::SseKms { key_ref: None }.is_enabled());
    }
}
