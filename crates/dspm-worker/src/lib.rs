//! Worker runtime: three cooperative loops sharing one cancellation
//! signal (heartbeat, process, janitor), plus the health/metrics endpoints
//! and configuration loader `dspmd` wires up.

pub mod config;
pub mod error;
pub mod health;
pub mod heartbeat;
pub mod janitor;
pub mod metrics;
pub mod process_loop;
pub mod result_collector;

pub use config::DspmConfig;
pub use error::WorkerError;
pub use health::{health_router, HealthState};
pub use heartbeat::run_heartbeat_loop;
pub use janitor::run_janitor_loop;
pub use metrics::WorkerMetrics;
pub use process_loop::{run_process_loop, ProcessLoopDeps};
