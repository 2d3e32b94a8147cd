//! dspmd — unified DSPM daemon binary.
//!
//! Exposes a `worker` subcommand that runs the full worker runtime
//! (heartbeat/process/janitor loops plus health+metrics endpoints) and
//! `enqueue`/`stats` subcommands so the queue is operable without the
//! (out-of-scope) HTTP admin API.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dspm_persistence::PostgresPersistenceAdapter;
use dspm_queue::{Job, JobScope, QueueClient, ScanType};
use dspm_worker::{health, DspmConfig, ProcessLoopDeps, WorkerMetrics};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "dspmd", about = "DSPM scan engine daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker runtime: heartbeat, process and janitor loops.
    Worker,

    /// Enqueue a scan job.
    Enqueue {
        #[arg(long)]
        account_id: String,
        #[arg(long, value_enum)]
        scan_type: CliScanType,
        #[arg(long, default_value_t = 0)]
        priority: i64,
        #[arg(long, value_delimiter = ',')]
        buckets: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        regions: Vec<String>,
    },

    /// Print queue depth/processing/completed/failed counts.
    Stats,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliScanType {
    Full,
    AssetDiscovery,
    Classification,
    AccessAnalysis,
}

impl From<CliScanType> for ScanType {
    fn from(value: CliScanType) -> Self {
        match value {
            CliScanType::Full => ScanType::Full,
            CliScanType::AssetDiscovery => ScanType::AssetDiscovery,
            CliScanType::Classification => ScanType::Classification,
            CliScanType::AccessAnalysis => ScanType::AccessAnalysis,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Worker => run_worker().await,
        Commands::Enqueue {
            account_id,
            scan_type,
            priority,
            buckets,
            regions,
        } => run_enqueue(account_id, scan_type.into(), priority, buckets, regions).await,
        Commands::Stats => run_stats().await,
    }
}

async fn run_worker() -> Result<()> {
    let config = DspmConfig::from_env()?;
    info!(worker_id = %config.worker_id, "starting dspmd worker");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("connecting to postgres")?;
    info!("connected to database");

    let queue = Arc::new(QueueClient::connect(&config.redis_url()).await.context("connecting to queue")?);
    info!(addr = %config.queue_addr, "connected to queue");

    let persistence: Arc<dyn dspm_persistence::PersistenceAdapter> = Arc::new(PostgresPersistenceAdapter::new(pool));
    let metrics = WorkerMetrics::new();

    let ready = Arc::new(AtomicBool::new(true));
    let health_state = Arc::new(health::HealthState {
        metrics: metrics.clone(),
        ready: ready.clone(),
    });

    let metrics_port = config.metrics_port;
    let health_router = health::health_router(health_state);
    tokio::spawn(async move {
        let addr = format!("0.0.0.0:{metrics_port}");
        info!(%addr, "health/metrics server listening");
        let listener = tokio::net::TcpListener::bind(&addr).await.expect("bind health listener");
        axum::serve(listener, health_router).await.expect("health server crashed");
    });

    let cancel = CancellationToken::new();

    let heartbeat_handle = tokio::spawn(dspm_worker::run_heartbeat_loop(
        config.worker_id.clone(),
        queue.clone(),
        config.heartbeat_interval,
        cancel.clone(),
    ));

    let janitor_handle = tokio::spawn(dspm_worker::run_janitor_loop(
        queue.clone(),
        metrics.clone(),
        config.janitor_interval,
        config.stale_timeout,
        cancel.clone(),
    ));

    let deps = ProcessLoopDeps {
        worker_id: config.worker_id.clone(),
        queue: queue.clone(),
        persistence,
        metrics,
        pipeline_config: config.to_pipeline_config(),
    };

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        shutdown.cancel();
    });

    dspm_worker::run_process_loop(deps, cancel).await;

    let _ = heartbeat_handle.await;
    let _ = janitor_handle.await;

    Ok(())
}

async fn run_enqueue(
    account_id: String,
    scan_type: ScanType,
    priority: i64,
    buckets: Vec<String>,
    regions: Vec<String>,
) -> Result<()> {
    let config = DspmConfig::from_env()?;
    let queue = QueueClient::connect(&config.redis_url()).await?;

    let mut job = Job::new("scan", account_id, scan_type, priority);
    if !buckets.is_empty() || !regions.is_empty() {
        job = job.with_scope(JobScope {
            buckets,
            regions,
            prefixes: Vec::new(),
        });
    }

    let job = queue.enqueue(job).await?;
    println!("enqueued job {}", job.id);
    Ok(())
}

async fn run_stats() -> Result<()> {
    let config = DspmConfig::from_env()?;
    let queue = QueueClient::connect(&config.redis_url()).await?;
    let stats = queue.queue_stats().await?;
    println!(
        "pending={} processing={} completed={} failed={}",
        stats.pending, stats.processing, stats.completed, stats.failed
    );
    Ok(())
}
