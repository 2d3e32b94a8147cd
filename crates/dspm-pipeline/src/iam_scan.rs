//! The access-analysis scan: role enumeration -> attached-policy posture
//! check -> finding generation. Dispatched for `ScanType::AccessAnalysis`,
//! the IAM counterpart to `scan_storage`'s bucket pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use dspm_connectors::IamCapability;
use dspm_queue::{Job, JobProgress, JobStatus};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::types::{compliance_tags_for, Asset, AssetResourceType, Finding, FindingType};

/// Policy names the posture check treats as administrator-equivalent.
/// AWS-managed `AdministratorAccess` and any customer policy ending in
/// `FullAccess` both grant broad, account-wide permissions.
fn is_overly_permissive(policy_name: &str) -> bool {
    policy_name == "AdministratorAccess" || policy_name.ends_with("FullAccess")
}

/// Runs an access-analysis scan against a single account's IAM capability.
/// Returns the accumulated findings/assets alongside final job progress;
/// unlike `scan_storage` this is small enough to run to completion
/// in-process rather than fanning out over channels, but it obeys the same
/// cancellation and orchestration-error contract.
pub async fn scan_iam(
    cancel: CancellationToken,
    iam: Arc<dyn IamCapability>,
    job: &Job,
) -> Result<(JobProgress, Vec<Asset>, Vec<Finding>), PipelineError> {
    let progress = Arc::new(Mutex::new(JobProgress::pending_for(job.id)));
    {
        let mut p = progress.lock().await;
        p.status = JobStatus::Running;
        p.started_at = Some(Utc::now());
    }

    let roles = iam
        .list_roles()
        .await
        .map_err(|e| PipelineError::ListBucketsFailed(e.to_string()))?;

    {
        let mut p = progress.lock().await;
        p.total_assets = roles.len() as u64;
    }

    let mut assets = Vec::with_capacity(roles.len());
    let mut findings = Vec::new();

    for role_name in roles {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let asset_id = Uuid::new_v4();
        let policies = iam.list_attached_role_policies(&role_name).await.unwrap_or_default();
        let overly_permissive: HashSet<&str> = policies
            .iter()
            .map(String::as_str)
            .filter(|p| is_overly_permissive(p))
            .collect();

        if !overly_permissive.is_empty() {
            findings.push(Finding {
                id: Uuid::new_v4(),
                asset_id,
                finding_type: FindingType::OverlyPermissiveRole,
                severity: FindingType::OverlyPermissiveRole.severity(),
                compliance_frameworks: compliance_tags_for(FindingType::OverlyPermissiveRole),
                evidence: serde_json::json!({
                    "role": role_name,
                    "policies": overly_permissive,
                }),
                created_at: Utc::now(),
            });
        }

        assets.push(Asset {
            id: asset_id,
            account_id: job.account_id.clone(),
            provider: dspm_connectors::Provider::Aws,
            resource_type: AssetResourceType::Role,
            name: role_name,
            region: None,
            encryption: dspm_connectors::EncryptionStatus::None,
            versioning: false,
            logging: false,
            public_access: false,
            tags: Default::default(),
            sensitivity: dspm_classifier::Sensitivity::Unknown,
            categories: Default::default(),
            classification_count: 0,
            last_scanned_at: Some(Utc::now()),
        });

        let mut p = progress.lock().await;
        p.scanned_assets += 1;
        p.findings_found = findings.len() as u64;
        p.updated_at = Utc::now();
    }

    debug!(job_id = %job.id, roles = assets.len(), findings = findings.len(), "access analysis scan complete");

    let mut p = progress.lock().await;
    p.status = JobStatus::Completed;
    p.findings_found = findings.len() as u64;
    p.completed_at = Some(Utc::now());
    p.updated_at = Utc::now();
    let final_progress = p.clone();
    drop(p);

    Ok((final_progress, assets, findings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dspm_connectors::mock::MockIamCapability;
    use dspm_queue::{Job, ScanType};
    use std::collections::HashMap;

    fn job() -> Job {
        Job::new("access_analysis", "acct-1", ScanType::AccessAnalysis, 0)
    }

    #[tokio::test]
    async fn flags_administrator_access_role() {
        let mut roles = HashMap::new();
        roles.insert("Admin".to_string(), vec!["AdministratorAccess".to_string()]);
        roles.insert("ReadOnly".to_string(), vec!["ReadOnlyAccess".to_string()]);
        let iam: Arc<dyn IamCapability> = Arc::new(MockIamCapability::new(roles));

        let (progress, assets, findings) = scan_iam(CancellationToken::new(), iam, &job()).await.unwrap();

        assert_eq!(progress.total_assets, 2);
        assert_eq!(progress.scanned_assets, 2);
        assert_eq!(assets.len(), 2);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].finding_type, FindingType::OverlyPermissiveRole);
    }

    #[tokio::test]
    async fn no_findings_when_all_roles_scoped() {
        let mut roles = HashMap::new();
        roles.insert("ReadOnly".to_string(), vec!["ReadOnlyAccess".to_string()]);
        let iam: Arc<dyn IamCapability> = Arc::new(MockIamCapability::new(roles));

        let (progress, _, findings) = scan_iam(CancellationToken::new(), iam, &job()).await.unwrap();
        assert!(findings.is_empty());
        assert_eq!(progress.status, JobStatus::Completed);
    }

    #[test]
    fn detects_full_access_suffix() {
        assert!(is_overly_permissive("AmazonS3FullAccess"));
        assert!(is_overly_permissive("AdministratorAccess"));
        assert!(!is_overly_permissive("ReadOnlyAccess"));
    }
}
