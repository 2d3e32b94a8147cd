//! Flat records the pipeline emits on its four output channels.
//!
//! These are core-owned shapes — the persistence adapter owns the durable
//! schema, but the pipeline must still hand something concrete across the
//! channel boundary.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use dspm_classifier::{Category, Sensitivity};
use dspm_connectors::{EncryptionStatus, Provider};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingType {
    PublicBucket,
    UnencryptedStorage,
    VersioningDisabled,
    LoggingDisabled,
    SensitiveDataExposure,
    OverlyPermissiveRole,
}

impl FindingType {
    pub fn severity(self) -> Sensitivity {
        match self {
            FindingType::PublicBucket => Sensitivity::Critical,
            FindingType::UnencryptedStorage => Sensitivity::High,
            FindingType::VersioningDisabled => Sensitivity::Medium,
            FindingType::LoggingDisabled => Sensitivity::Low,
            FindingType::SensitiveDataExposure => Sensitivity::Critical,
            FindingType::OverlyPermissiveRole => Sensitivity::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceFramework {
    Gdpr,
    Hipaa,
    PciDss,
    Soc2,
}

/// Compliance tags carried by each posture finding type, per the fixture
/// set referenced in the posture-check step.
pub fn compliance_tags_for(finding_type: FindingType) -> Vec<ComplianceFramework> {
    use ComplianceFramework::*;
    match finding_type {
        FindingType::PublicBucket => vec![Gdpr, Hipaa, PciDss, Soc2],
        FindingType::UnencryptedStorage => vec![Gdpr, Hipaa, PciDss],
        FindingType::VersioningDisabled => vec![Soc2],
        FindingType::LoggingDisabled => vec![Soc2],
        FindingType::SensitiveDataExposure => vec![Gdpr, Hipaa, PciDss],
        FindingType::OverlyPermissiveRole => vec![Soc2, PciDss],
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub finding_type: FindingType,
    pub severity: Sensitivity,
    pub compliance_frameworks: Vec<ComplianceFramework>,
    pub evidence: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub account_id: String,
    pub provider: Provider,
    pub resource_type: AssetResourceType,
    pub name: String,
    pub region: Option<String>,
    pub encryption: EncryptionStatus,
    pub versioning: bool,
    pub logging: bool,
    pub public_access: bool,
    pub tags: HashMap<String, String>,
    pub sensitivity: Sensitivity,
    pub categories: HashSet<Category>,
    pub classification_count: u64,
    pub last_scanned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetResourceType {
    Bucket,
    Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub object_key: String,
    pub object_size_bytes: u64,
    pub rule_name: String,
    pub category: Category,
    pub sensitivity: Sensitivity,
    pub redacted_sample: String,
    pub match_count: u32,
    pub line_numbers: Vec<u32>,
    pub scanned_bytes: u64,
    pub detected_at: DateTime<Utc>,
}

/// Phase tag attached to a per-asset/per-object scan error, per the logging
/// contract ("phase tag in {metadata, list_objects, get_object, read_object}").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Metadata,
    ListObjects,
    GetObject,
    ReadObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanError {
    pub asset_identifier: String,
    pub phase: ScanPhase,
    pub message: String,
}

pub type AssetResult = Asset;
pub type FindingResult = Finding;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub asset_id: Uuid,
    pub object_key: String,
    pub object_size_bytes: u64,
    pub matches: Vec<dspm_classifier::Match>,
    pub scanned_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finding_type_severity_matches_posture_rules() {
        assert_eq!(FindingType::PublicBucket.severity(), Sensitivity::Critical);
        assert_eq!(FindingType::UnencryptedStorage.severity(), Sensitivity::High);
        assert_eq!(FindingType::VersioningDisabled.severity(), Sensitivity::Medium);
        assert_eq!(FindingType::LoggingDisabled.severity(), Sensitivity::Low);
    }

    #[test]
    fn compliance_tags_are_non_empty_for_every_finding_type() {
        for ft in [
            FindingType::PublicBucket,
            FindingType::UnencryptedStorage,
            FindingType::VersioningDisabled,
            FindingType::LoggingDisabled,
            FindingType::SensitiveDataExposure,
        ] {
            assert!(!compliance_tags_for(ft).is_empty());
        }
    }
}
