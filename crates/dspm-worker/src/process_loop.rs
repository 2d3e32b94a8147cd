//! Process loop — repeatedly dequeues a job, resolves its account,
//! constructs a provider connector, dispatches to the right scan, and
//! transitions the job to its terminal or requeued state.

use std::sync::Arc;
use std::time::Duration;

use dspm_connectors::{Connector, ConnectorError};
use dspm_persistence::PersistenceAdapter;
use dspm_pipeline::PipelineConfig;
use dspm_queue::{Job, QueueClient, ScanType};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::WorkerError;
use crate::metrics::{ScanTypeLabel, WorkerMetrics};
use crate::result_collector;

pub struct ProcessLoopDeps {
    pub worker_id: String,
    pub queue: Arc<QueueClient>,
    pub persistence: Arc<dyn PersistenceAdapter>,
    pub metrics: WorkerMetrics,
    pub pipeline_config: PipelineConfig,
}

pub async fn run_process_loop(deps: ProcessLoopDeps, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            info!(worker_id = %deps.worker_id, "process loop stopping: cancelled");
            break;
        }

        let job = match deps.queue.dequeue(&deps.worker_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    _ = cancel.cancelled() => break,
                }
                continue;
            }
            Err(e) => {
                warn!(worker_id = %deps.worker_id, error = %e, "dequeue failed");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    _ = cancel.cancelled() => break,
                }
                continue;
            }
        };

        deps.metrics.active_jobs.inc();
        process_one(&deps, job, cancel.clone()).await;
        deps.metrics.active_jobs.dec();
    }
}

async fn process_one(deps: &ProcessLoopDeps, mut job: Job, cancel: CancellationToken) {
    let label = ScanTypeLabel(format!("{:?}", job.scan_type).to_uppercase());
    info!(worker_id = %deps.worker_id, job_id = %job.id, scan_type = ?job.scan_type, "dequeued job");

    let account = match deps.persistence.get_account(&job.account_id).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            error!(worker_id = %deps.worker_id, job_id = %job.id, account_id = %job.account_id, "account not found, failing job permanently");
            let _ = deps.queue.complete(&job, false).await;
            deps.metrics.jobs_failed.get_or_create(&label).inc();
            return;
        }
        Err(e) => {
            warn!(worker_id = %deps.worker_id, job_id = %job.id, error = %e, "account lookup failed, requeuing");
            requeue(deps, &mut job, &WorkerError::from(e).to_string(), &label).await;
            return;
        }
    };

    let connector = match Connector::from_config(&account.connector_config).await {
        Ok(connector) => connector,
        Err(e @ ConnectorError::ConfigError(_)) => {
            error!(worker_id = %deps.worker_id, job_id = %job.id, error = %e, "config error, failing job permanently");
            let _ = deps.queue.complete(&job, false).await;
            deps.metrics.jobs_failed.get_or_create(&label).inc();
            return;
        }
        Err(e) => {
            warn!(worker_id = %deps.worker_id, job_id = %job.id, error = %e, "connector construction failed, requeuing");
            requeue(deps, &mut job, &e.to_string(), &label).await;
            return;
        }
    };

    let provider = account.connector_config.provider;
    let result = match job.scan_type {
        ScanType::Full | ScanType::AssetDiscovery | ScanType::Classification => {
            run_storage_scan(deps, &connector, provider, &job, cancel).await
        }
        ScanType::AccessAnalysis => run_access_scan(deps, &connector, &job, cancel).await,
    };

    match result {
        Ok(()) => {
            if let Err(e) = deps.queue.complete(&job, true).await {
                error!(worker_id = %deps.worker_id, job_id = %job.id, error = %e, "failed to mark job complete");
            }
            deps.metrics.jobs_completed.get_or_create(&label).inc();
            info!(worker_id = %deps.worker_id, job_id = %job.id, "job completed");
        }
        Err(e) => {
            warn!(worker_id = %deps.worker_id, job_id = %job.id, error = %e, "scan failed, requeuing");
            requeue(deps, &mut job, &e.to_string(), &label).await;
        }
    }
}

async fn requeue(deps: &ProcessLoopDeps, job: &mut Job, error_msg: &str, label: &ScanTypeLabel) {
    match deps.queue.requeue(job, error_msg).await {
        Ok(()) => {
            if job.attempts >= dspm_queue::ATTEMPT_CAP {
                deps.metrics.jobs_failed.get_or_create(label).inc();
            }
        }
        Err(e) => error!(worker_id = %deps.worker_id, job_id = %job.id, error = %e, "failed to requeue job"),
    }
}

async fn run_storage_scan(
    deps: &ProcessLoopDeps,
    connector: &Connector,
    provider: dspm_connectors::Provider,
    job: &Job,
    cancel: CancellationToken,
) -> Result<(), WorkerError> {
    let classifier = Arc::new(dspm_classifier::Classifier::new(Arc::new(dspm_classifier::DEFAULT_RULES.clone())));
    let storage = connector.storage();

    let outputs = dspm_pipeline::scan_storage(cancel, storage, classifier, job.clone(), provider, deps.pipeline_config.clone());

    let dspm_pipeline::ScanOutputs {
        assets,
        classifications,
        findings,
        errors,
        progress,
        join,
    } = outputs;

    result_collector::drain(assets, classifications, findings, errors, deps.persistence.clone(), &deps.metrics, &deps.worker_id).await;

    let final_progress = progress.lock().await.clone();
    deps.queue.update_progress(&final_progress).await?;

    match join.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WorkerError::Pipeline(e)),
        Err(join_err) => Err(WorkerError::Pipeline(dspm_pipeline::PipelineError::ListBucketsFailed(
            join_err.to_string(),
        ))),
    }
}

async fn run_access_scan(
    deps: &ProcessLoopDeps,
    connector: &Connector,
    job: &Job,
    cancel: CancellationToken,
) -> Result<(), WorkerError> {
    let iam = connector.iam();
    let (progress, assets, findings) = dspm_pipeline::scan_iam(cancel, iam, job).await?;

    for asset in &assets {
        deps.persistence.upsert_asset(asset).await?;
    }
    for finding in &findings {
        deps.persistence.insert_finding(finding).await?;
    }

    deps.queue.update_progress(&progress).await?;
    Ok(())
}
