//! Health, readiness and metrics HTTP endpoints.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::metrics::WorkerMetrics;

pub struct HealthState {
    pub metrics: WorkerMetrics,
    pub ready: Arc<AtomicBool>,
}

pub fn health_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn ready(State(state): State<Arc<HealthState>>) -> Result<&'static str, StatusCode> {
    if state.ready.load(Ordering::Relaxed) {
        Ok("OK")
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn metrics(State(state): State<Arc<HealthState>>) -> String {
    state.metrics.encode()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_always_ok() {
        assert_eq!(health().await, "OK");
    }

    #[tokio::test]
    async fn ready_reflects_atomic_flag() {
        let state = Arc::new(HealthState {
            metrics: WorkerMetrics::new(),
            ready: Arc::new(AtomicBool::new(false)),
        });
        assert!(ready(State(state.clone())).await.is_err());
        state.ready.store(true, Ordering::Relaxed);
        assert!(ready(State(state)).await.is_ok());
    }
}
