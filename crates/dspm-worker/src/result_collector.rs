//! The single consumer task that drains a scan's four output channels
//! concurrently, persisting each record as it arrives and logging
//! per-item errors without ever failing the job for them.

use std::sync::Arc;

use dspm_pipeline::{classifications_from_result, Asset, ClassificationResult, Finding, ScanError};
use dspm_persistence::PersistenceAdapter;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::metrics::WorkerMetrics;

/// Drains a scan's four output channels with a single `tokio::select!`
/// until every sender has dropped, upserting assets, inserting
/// classifications (and recomputing the owning asset's aggregate),
/// inserting findings, and logging scan errors. Returns once every channel
/// is closed; the caller separately awaits the pipeline task's own
/// `JoinHandle` for the orchestration-level result.
pub async fn drain(
    mut assets: mpsc::Receiver<Asset>,
    mut classifications: mpsc::Receiver<ClassificationResult>,
    mut findings: mpsc::Receiver<Finding>,
    mut errors: mpsc::Receiver<ScanError>,
    persistence: Arc<dyn PersistenceAdapter>,
    metrics: &WorkerMetrics,
    worker_id: &str,
) {
    let mut assets_done = false;
    let mut classifications_done = false;
    let mut findings_done = false;
    let mut errors_done = false;

    while !(assets_done && classifications_done && findings_done && errors_done) {
        tokio::select! {
            asset = assets.recv(), if !assets_done => {
                match asset {
                    Some(asset) => {
                        if let Err(e) = persistence.upsert_asset(&asset).await {
                            error!(worker_id, asset_id = %asset.id, error = %e, "failed to upsert asset");
                        }
                    }
                    None => assets_done = true,
                }
            }
            classification_result = classifications.recv(), if !classifications_done => {
                match classification_result {
                    Some(result) => {
                        metrics.classifications_found.inc_by(result.matches.len() as u64);
                        for classification in classifications_from_result(&result) {
                            if let Err(e) = persistence.insert_classification(&classification).await {
                                error!(worker_id, asset_id = %classification.asset_id, error = %e, "failed to insert classification");
                                continue;
                            }
                            if let Err(e) = persistence
                                .recompute_asset_aggregate(
                                    classification.asset_id,
                                    classification.sensitivity,
                                    classification.category,
                                    classification.match_count,
                                )
                                .await
                            {
                                error!(worker_id, asset_id = %classification.asset_id, error = %e, "failed to recompute asset aggregate");
                            }
                        }
                    }
                    None => classifications_done = true,
                }
            }
            finding = findings.recv(), if !findings_done => {
                match finding {
                    Some(finding) => {
                        metrics.findings_found.inc();
                        if let Err(e) = persistence.insert_finding(&finding).await {
                            error!(worker_id, finding_id = %finding.id, error = %e, "failed to insert finding");
                        }
                    }
                    None => findings_done = true,
                }
            }
            scan_error = errors.recv(), if !errors_done => {
                match scan_error {
                    Some(err) => {
                        warn!(
                            worker_id,
                            asset = %err.asset_identifier,
                            phase = ?err.phase,
                            error = %err.message,
                            "partial scan error"
                        );
                    }
                    None => errors_done = true,
                }
            }
        }
    }
}
