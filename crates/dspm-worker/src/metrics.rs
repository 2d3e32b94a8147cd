//! Prometheus metrics for worker observability.

use std::sync::Arc;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ScanTypeLabel(pub String);

impl prometheus_client::encoding::EncodeLabelSet for ScanTypeLabel {
    fn encode(&self, mut encoder: prometheus_client::encoding::LabelSetEncoder) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        ("scan_type", self.0.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct WorkerMetrics {
    pub queue_pending: Gauge,
    pub queue_processing: Gauge,
    pub active_jobs: Gauge,
    pub jobs_completed: Family<ScanTypeLabel, Counter>,
    pub jobs_failed: Family<ScanTypeLabel, Counter>,
    pub janitor_reclaimed: Counter,
    pub classifications_found: Counter,
    pub findings_found: Counter,
    registry: Arc<Registry>,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let queue_pending = Gauge::default();
        registry.register("dspm_queue_pending", "Jobs in PENDING", queue_pending.clone());

        let queue_processing = Gauge::default();
        registry.register("dspm_queue_processing", "Jobs in LEASED", queue_processing.clone());

        let active_jobs = Gauge::default();
        registry.register(
            "dspm_worker_active_jobs",
            "Jobs this worker is currently processing",
            active_jobs.clone(),
        );

        let jobs_completed = Family::<ScanTypeLabel, Counter>::default();
        registry.register(
            "dspm_worker_jobs_completed_total",
            "Jobs completed successfully, by scan type",
            jobs_completed.clone(),
        );

        let jobs_failed = Family::<ScanTypeLabel, Counter>::default();
        registry.register(
            "dspm_worker_jobs_failed_total",
            "Jobs that reached the terminal FAILED state, by scan type",
            jobs_failed.clone(),
        );

        let janitor_reclaimed = Counter::default();
        registry.register(
            "dspm_janitor_jobs_reclaimed_total",
            "Stale leases reclaimed by the janitor loop",
            janitor_reclaimed.clone(),
        );

        let classifications_found = Counter::default();
        registry.register(
            "dspm_classifications_found_total",
            "Classifier matches recorded across all scans",
            classifications_found.clone(),
        );

        let findings_found = Counter::default();
        registry.register(
            "dspm_findings_found_total",
            "Findings recorded across all scans",
            findings_found.clone(),
        );

        Self {
            queue_pending,
            queue_processing,
            active_jobs,
            jobs_completed,
            jobs_failed,
            janitor_reclaimed,
            classifications_found,
            findings_found,
            registry: Arc::new(registry),
        }
    }

    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).unwrap();
        buf
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registers_all_metrics() {
        let metrics = WorkerMetrics::new();
        let output = metrics.encode();
        assert!(output.contains("dspm_queue_pending"));
        assert!(output.contains("dspm_worker_jobs_completed_total"));
        assert!(output.contains("dspm_janitor_jobs_reclaimed_total"));
    }

    #[test]
    fn family_counter_carries_scan_type_label() {
        let metrics = WorkerMetrics::new();
        metrics
            .jobs_completed
            .get_or_create(&ScanTypeLabel("FULL".to_string()))
            .inc();
        let output = metrics.encode();
        assert!(output.contains("scan_type=\"FULL\""));
    }
}
