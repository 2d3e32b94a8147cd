//! The scan pipeline: bucket enumeration -> per-bucket metadata/posture ->
//! object sampling -> classification -> finding generation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use dspm_classifier::Classifier;
use dspm_connectors::{BucketMetadata, BucketSummary, ByteRange, ObjectSummary, Provider, StorageCapability};
use dspm_queue::{Job, JobProgress, JobScope, JobStatus, ScanType};
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::sampling::select_scannable_objects;
use crate::types::{
    compliance_tags_for, Asset, AssetResourceType, Classification, ClassificationResult, Finding, FindingType,
    ScanError, ScanPhase,
};

const CHANNEL_BUFFER: usize = 100;

pub struct ScanOutputs {
    pub assets: mpsc::Receiver<Asset>,
    pub classifications: mpsc::Receiver<ClassificationResult>,
    pub findings: mpsc::Receiver<Finding>,
    pub errors: mpsc::Receiver<ScanError>,
    pub progress: Arc<Mutex<JobProgress>>,
    pub join: tokio::task::JoinHandle<Result<(), PipelineError>>,
}

#[derive(Clone)]
struct Channels {
    assets: mpsc::Sender<Asset>,
    classifications: mpsc::Sender<ClassificationResult>,
    findings: mpsc::Sender<Finding>,
    errors: mpsc::Sender<ScanError>,
}

/// Spawns the scan as a background task and returns the four output
/// channels plus a shared, mutex-guarded progress handle the worker can
/// poll or snapshot while the scan runs.
pub fn scan_storage(
    cancel: CancellationToken,
    storage: Arc<dyn StorageCapability>,
    classifier: Arc<Classifier>,
    job: Job,
    provider: Provider,
    config: PipelineConfig,
) -> ScanOutputs {
    let (asset_tx, asset_rx) = mpsc::channel(CHANNEL_BUFFER);
    let (class_tx, class_rx) = mpsc::channel(CHANNEL_BUFFER);
    let (finding_tx, finding_rx) = mpsc::channel(CHANNEL_BUFFER);
    let (error_tx, error_rx) = mpsc::channel(CHANNEL_BUFFER);

    let progress = Arc::new(Mutex::new(JobProgress::pending_for(job.id)));
    let progress_for_task = progress.clone();

    let channels = Channels {
        assets: asset_tx,
        classifications: class_tx,
        findings: finding_tx,
        errors: error_tx,
    };

    // A child of the caller's cancellation token: cancelling `cancel` (e.g.
    // on worker shutdown) cancels this too, but the deadline watchdog below
    // can also cancel it on its own without affecting the parent.
    let scan_cancel = cancel.child_token();
    let deadline_cancel = scan_cancel.clone();
    let scan_timeout = config.scan_timeout;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(scan_timeout) => deadline_cancel.cancel(),
            _ = deadline_cancel.cancelled() => {}
        }
    });

    let join = tokio::spawn(async move {
        let result = run_scan(
            scan_cancel.clone(),
            storage,
            classifier,
            job,
            provider,
            config,
            channels,
            progress_for_task,
        )
        .await;
        // Stops the watchdog above promptly instead of leaving it asleep
        // until `scan_timeout` elapses on a scan that already finished.
        scan_cancel.cancel();
        result
    });

    ScanOutputs {
        assets: asset_rx,
        classifications: class_rx,
        findings: finding_rx,
        errors: error_rx,
        progress,
        join,
    }
}

async fn run_scan(
    cancel: CancellationToken,
    storage: Arc<dyn StorageCapability>,
    classifier: Arc<Classifier>,
    job: Job,
    provider: Provider,
    config: PipelineConfig,
    channels: Channels,
    progress: Arc<Mutex<JobProgress>>,
) -> Result<(), PipelineError> {
    {
        let mut p = progress.lock().await;
        p.status = JobStatus::Running;
        p.started_at = Some(Utc::now());
    }

    let buckets = storage
        .list_buckets()
        .await
        .map_err(|e| PipelineError::ListBucketsFailed(e.to_string()))?;

    let scope = job.scope.clone().unwrap_or_default();
    let filtered = filter_buckets(buckets, &scope);

    {
        let mut p = progress.lock().await;
        p.total_assets = filtered.len() as u64;
    }

    let sem = Arc::new(Semaphore::new(config.bucket_workers));
    let mut join_set: JoinSet<()> = JoinSet::new();

    for bucket in filtered {
        if cancel.is_cancelled() {
            break;
        }

        let permit = sem.clone().acquire_owned().await.expect("semaphore not closed");
        let storage = storage.clone();
        let classifier = classifier.clone();
        let channels = channels.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        let scope = scope.clone();
        let config = config.clone();
        let job = job.clone();
        let account_id = job.account_id.clone();

        join_set.spawn(async move {
            let _permit = permit;
            scan_bucket(&bucket, &account_id, provider, &scope, &job.scan_type, &storage, &classifier, &config, &cancel, &channels, &progress)
                .await;

            let mut p = progress.lock().await;
            p.scanned_assets += 1;
            p.updated_at = Utc::now();
        });
    }

    while join_set.join_next().await.is_some() {}

    let mut p = progress.lock().await;
    p.status = if cancel.is_cancelled() {
        JobStatus::Failed
    } else {
        JobStatus::Completed
    };
    p.completed_at = Some(Utc::now());
    p.updated_at = Utc::now();

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

fn filter_buckets(buckets: Vec<BucketSummary>, scope: &JobScope) -> Vec<BucketSummary> {
    buckets
        .into_iter()
        .filter(|b| scope.buckets.is_empty() || scope.buckets.iter().any(|n| n == &b.name))
        .filter(|b| {
            scope.regions.is_empty()
                || b.region
                    .as_deref()
                    .map(|r| scope.regions.iter().any(|sr| sr == r))
                    .unwrap_or(false)
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
async fn scan_bucket(
    bucket: &BucketSummary,
    account_id: &str,
    provider: Provider,
    scope: &JobScope,
    scan_type: &ScanType,
    storage: &Arc<dyn StorageCapability>,
    classifier: &Arc<Classifier>,
    config: &PipelineConfig,
    cancel: &CancellationToken,
    channels: &Channels,
    progress: &Arc<Mutex<JobProgress>>,
) {
    let region = bucket.region.clone().unwrap_or_else(|| "us-east-1".to_string());

    let metadata = match storage.get_bucket_metadata(&bucket.name, &region).await {
        Ok(m) => m,
        Err(e) => {
            send_error(channels, &bucket.name, ScanPhase::Metadata, &e.to_string()).await;
            BucketMetadata {
                encryption: dspm_connectors::EncryptionStatus::None,
                versioning: false,
                logging: false,
                public_access_block: Default::default(),
                tags: HashMap::new(),
                policy: None,
                acl: Default::default(),
            }
        }
    };

    let asset_id = Uuid::new_v4();
    let (asset, findings) = build_asset_and_findings(asset_id, account_id, provider, bucket, &region, &metadata);

    if !findings.is_empty() {
        let mut p = progress.lock().await;
        p.findings_found += findings.len() as u64;
    }
    for finding in findings {
        if channels.findings.send(finding).await.is_err() {
            return;
        }
    }

    if channels.assets.send(asset).await.is_err() {
        return;
    }

    if matches!(scan_type, ScanType::Full | ScanType::Classification) {
        scan_objects(asset_id, bucket, scope, storage, classifier, config, cancel, channels, progress).await;
    }
}

fn build_asset_and_findings(
    asset_id: Uuid,
    account_id: &str,
    provider: Provider,
    bucket: &BucketSummary,
    region: &str,
    metadata: &BucketMetadata,
) -> (Asset, Vec<Finding>) {
    let public_access = metadata.is_publicly_accessible();

    let asset = Asset {
        id: asset_id,
        account_id: account_id.to_string(),
        provider,
        resource_type: AssetResourceType::Bucket,
        name: bucket.name.clone(),
        region: Some(region.to_string()),
        encryption: metadata.encryption.clone(),
        versioning: metadata.versioning,
        logging: metadata.logging,
        public_access,
        tags: metadata.tags.clone(),
        sensitivity: dspm_classifier::Sensitivity::Unknown,
        categories: HashSet::new(),
        classification_count: 0,
        last_scanned_at: Some(Utc::now()),
    };

    let mut findings = Vec::new();
    let mut push = |finding_type: FindingType, evidence: serde_json::Value| {
        findings.push(Finding {
            id: Uuid::new_v4(),
            asset_id,
            finding_type,
            severity: finding_type.severity(),
            compliance_frameworks: compliance_tags_for(finding_type),
            evidence,
            created_at: Utc::now(),
        });
    };

    if public_access {
        push(FindingType::PublicBucket, serde_json::json!({"bucket": bucket.name}));
    }
    if !metadata.encryption.is_enabled() {
        push(FindingType::UnencryptedStorage, serde_json::json!({"bucket": bucket.name}));
    }
    if !metadata.versioning {
        push(FindingType::VersioningDisabled, serde_json::json!({"bucket": bucket.name}));
    }
    if !metadata.logging {
        push(FindingType::LoggingDisabled, serde_json::json!({"bucket": bucket.name}));
    }

    (asset, findings)
}

#[allow(clippy::too_many_arguments)]
async fn scan_objects(
    asset_id: Uuid,
    bucket: &BucketSummary,
    scope: &JobScope,
    storage: &Arc<dyn StorageCapability>,
    classifier: &Arc<Classifier>,
    config: &PipelineConfig,
    cancel: &CancellationToken,
    channels: &Channels,
    progress: &Arc<Mutex<JobProgress>>,
) {
    let prefix = scope.prefixes.first().map(|s| s.as_str());

    let listed = match storage
        .list_objects(&bucket.name, prefix, config.files_per_bucket as u32)
        .await
    {
        Ok(objects) => objects,
        Err(e) => {
            send_error(channels, &bucket.name, ScanPhase::ListObjects, &e.to_string()).await;
            return;
        }
    };

    {
        let mut p = progress.lock().await;
        p.total_objects += listed.len() as u64;
    }

    let selected = select_scannable_objects(listed, config.max_file_size_bytes, config.files_per_bucket);

    let sem = Arc::new(Semaphore::new(config.object_workers()));
    let mut join_set: JoinSet<()> = JoinSet::new();

    for object in selected {
        if cancel.is_cancelled() {
            break;
        }
        let permit = sem.clone().acquire_owned().await.expect("semaphore not closed");
        let storage = storage.clone();
        let classifier = classifier.clone();
        let channels = channels.clone();
        let progress = progress.clone();
        let bucket_name = bucket.name.clone();
        let sample_size = config.sample_size_bytes;

        join_set.spawn(async move {
            let _permit = permit;
            scan_object(asset_id, &bucket_name, &object, sample_size, &storage, &classifier, &channels, &progress).await;

            let mut p = progress.lock().await;
            p.scanned_objects += 1;
            p.updated_at = Utc::now();
        });
    }

    while join_set.join_next().await.is_some() {}
}

#[allow(clippy::too_many_arguments)]
async fn scan_object(
    asset_id: Uuid,
    bucket_name: &str,
    object: &ObjectSummary,
    sample_size: u64,
    storage: &Arc<dyn StorageCapability>,
    classifier: &Arc<Classifier>,
    channels: &Channels,
    progress: &Arc<Mutex<JobProgress>>,
) {
    let range = if object.size > sample_size {
        Some(ByteRange {
            start: 0,
            end: sample_size - 1,
        })
    } else {
        None
    };

    let bytes = match storage.get_object(bucket_name, &object.key, range).await {
        Ok(b) => b,
        Err(e) => {
            send_error(channels, &format!("{bucket_name}/{}", object.key), ScanPhase::GetObject, &e.to_string()).await;
            return;
        }
    };

    let truncated_len = (sample_size as usize).min(bytes.len());
    let sample = &bytes[..truncated_len];
    let content = String::from_utf8_lossy(sample);

    let result = classifier.classify(&content);
    if result.is_empty() {
        return;
    }

    debug!(bucket = bucket_name, key = %object.key, matches = result.matches.len(), "classified object");

    {
        let mut p = progress.lock().await;
        p.classifications_found += result.total_findings;
    }

    if matches!(result.max_sensitivity, dspm_classifier::Sensitivity::Critical | dspm_classifier::Sensitivity::High) {
        let finding = sensitive_data_exposure_finding(asset_id, bucket_name, &object.key, &result);
        if channels.findings.send(finding).await.is_ok() {
            let mut p = progress.lock().await;
            p.findings_found += 1;
        }
    }

    let classification_result = ClassificationResult {
        asset_id,
        object_key: object.key.clone(),
        object_size_bytes: object.size,
        matches: result.matches,
        scanned_bytes: truncated_len as u64,
    };

    if channels.classifications.send(classification_result).await.is_err() {
        warn!(bucket = bucket_name, key = %object.key, "classification channel closed");
    }
}

/// A `SensitiveDataExposure` finding for an object whose classification
/// crossed the HIGH/CRITICAL sensitivity threshold — the object-level
/// counterpart to the bucket-level posture findings.
fn sensitive_data_exposure_finding(
    asset_id: Uuid,
    bucket_name: &str,
    object_key: &str,
    result: &dspm_classifier::ClassifyResult,
) -> Finding {
    let rule_names: Vec<&str> = result.matches.iter().map(|m| m.rule_name.as_str()).collect();
    Finding {
        id: Uuid::new_v4(),
        asset_id,
        finding_type: FindingType::SensitiveDataExposure,
        severity: result.max_sensitivity,
        compliance_frameworks: compliance_tags_for(FindingType::SensitiveDataExposure),
        evidence: serde_json::json!({
            "bucket": bucket_name,
            "object_key": object_key,
            "rules": rule_names,
            "total_findings": result.total_findings,
        }),
        created_at: Utc::now(),
    }
}

async fn send_error(channels: &Channels, asset_identifier: &str, phase: ScanPhase, message: &str) {
    let err = ScanError {
        asset_identifier: asset_identifier.to_string(),
        phase,
        message: message.to_string(),
    };
    let _ = channels.errors.send(err).await;
}

/// Converts a `ClassificationResult`'s matches into persistable
/// `Classification` rows, one per `Match`.
pub fn classifications_from_result(result: &ClassificationResult) -> Vec<Classification> {
    result
        .matches
        .iter()
        .map(|m| Classification {
            id: Uuid::new_v4(),
            asset_id: result.asset_id,
            object_key: result.object_key.clone(),
            object_size_bytes: result.object_size_bytes,
            rule_name: m.rule_name.clone(),
            category: m.category,
            sensitivity: m.sensitivity,
            redacted_sample: m.redacted_value.clone(),
            match_count: m.count,
            line_numbers: m.line_numbers.clone(),
            scanned_bytes: result.scanned_bytes,
            detected_at: Utc::now(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dspm_connectors::{AclGrants, EncryptionStatus, PublicAccessBlock};

    fn bucket_summary(name: &str) -> BucketSummary {
        BucketSummary {
            name: name.to_string(),
            region: Some("us-east-1".to_string()),
        }
    }

    #[test]
    fn s5_scope_filters_to_named_bucket() {
        let buckets = vec![bucket_summary("a"), bucket_summary("b")];
        let scope = JobScope {
            buckets: vec!["a".to_string()],
            ..Default::default()
        };
        let filtered = filter_buckets(buckets, &scope);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "a");
    }

    #[test]
    fn empty_scope_keeps_all_buckets() {
        let buckets = vec![bucket_summary("a"), bucket_summary("b")];
        let filtered = filter_buckets(buckets, &JobScope::default());
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn s4_fully_insecure_bucket_emits_four_findings() {
        let metadata = BucketMetadata {
            encryption: EncryptionStatus::None,
            versioning: false,
            logging: false,
            public_access_block: PublicAccessBlock {
                block_public_acls: false,
                block_public_policy: false,
            },
            tags: HashMap::new(),
            policy: None,
            acl: AclGrants::default(),
        };

        let (asset, findings) = build_asset_and_findings(
            Uuid::new_v4(),
            "acct-1",
            Provider::Aws,
            &bucket_summary("insecure"),
            "us-east-1",
            &metadata,
        );

        assert_eq!(findings.len(), 4);
        assert!(findings.iter().all(|f| f.asset_id == asset.id));

        let types: HashSet<_> = findings.iter().map(|f| f.finding_type).collect();
        assert!(types.contains(&FindingType::PublicBucket));
        assert!(types.contains(&FindingType::UnencryptedStorage));
        assert!(types.contains(&FindingType::VersioningDisabled));
        assert!(types.contains(&FindingType::LoggingDisabled));
    }

    #[test]
    fn secure_bucket_emits_no_findings() {
        let metadata = BucketMetadata {
            encryption: EncryptionStatus::Sse,
            versioning: true,
            logging: true,
            public_access_block: PublicAccessBlock {
                block_public_acls: true,
                block_public_policy: true,
            },
            tags: HashMap::new(),
            policy: None,
            acl: AclGrants::default(),
        };

        let (_, findings) = build_asset_and_findings(
            Uuid::new_v4(),
            "acct-1",
            Provider::Aws,
            &bucket_summary("secure"),
            "us-east-1",
            &metadata,
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn critical_classification_yields_sensitive_data_exposure_finding() {
        let classifier = Classifier::default();
        let result = classifier.classify("My SSN is 123-45-6789");
        assert_eq!(result.max_sensitivity, dspm_classifier::Sensitivity::Critical);

        let finding = sensitive_data_exposure_finding(Uuid::new_v4(), "bucket-a", "object.txt", &result);
        assert_eq!(finding.finding_type, FindingType::SensitiveDataExposure);
        assert_eq!(finding.severity, dspm_classifier::Sensitivity::Critical);
        assert_eq!(finding.evidence["bucket"], "bucket-a");
        assert_eq!(finding.evidence["object_key"], "object.txt");
    }

    #[test]
    fn low_sensitivity_content_does_not_cross_finding_threshold() {
        let classifier = Classifier::default();
        let result = classifier.classify("nothing sensitive here");
        assert!(result.is_empty());
        assert!(!matches!(
            result.max_sensitivity,
            dspm_classifier::Sensitivity::Critical | dspm_classifier::Sensitivity::High
        ));
    }
}
