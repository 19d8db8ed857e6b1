//! Robot Master - Main Entry Point
//! Dispatches waiting workflow steps to Resque-style priority queues

mod config;
mod logging;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use colored::Colorize;
use tracing::{error, info};

// Import workspace crates
use robot_master_core::application::{
    shutdown_channel, DispatchConfig, DispatchEngine, DispatchScheduler, Pipeline, QueueGateway,
};
use robot_master_core::port::id_provider::UuidProvider;
use robot_master_core::port::time_provider::SystemTimeProvider;
use robot_master_core::port::{QueueStore, TimeProvider};
use robot_master_infra_http::HttpTrackingService;
use robot_master_infra_redis::RedisQueueStore;
use robot_master_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};
use robot_master_infra_system::FileGraphSource;

use crate::config::{QueueBackend, Settings};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "robot-master")]
#[command(about = "Enqueue waiting workflow steps into priority queues", long_about = None)]
#[command(version)]
struct Cli {
    /// Pipeline namespace (e.g. dor)
    namespace: String,

    /// Pipelines to dispatch (e.g. assemblyWF)
    #[arg(required = true)]
    pipelines: Vec<String>,

    /// Extra configuration file layered over config/robot-master.toml
    #[arg(short, long, env = "ROBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Keep dispatching on an interval until Ctrl+C
    #[arg(short, long)]
    watch: bool,

    /// Seconds between passes in watch mode
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1. Load configuration
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(secs) = cli.interval {
        settings.dispatch.interval_secs = secs;
    }

    // 2. Initialize logging
    let _log_guard = logging::init(&settings.log)?;
    info!("Robot Master v{} starting...", VERSION);

    // 3. Setup dependencies (DI wiring)
    let engine = Arc::new(build_engine(&settings).await?);
    let pipelines: Vec<Pipeline> = cli
        .pipelines
        .iter()
        .map(|p| Pipeline::new(&cli.namespace, p))
        .collect();

    if cli.watch {
        watch(engine, pipelines, settings.dispatch.interval()).await?;
        return Ok(ExitCode::SUCCESS);
    }

    // 4. One pass per pipeline
    let success = dispatch_once(&engine, &pipelines, cli.json).await?;

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// One pass over every pipeline in order
///
/// A pipeline whose graph cannot be loaded is reported and skipped; the
/// remaining pipelines still run. Returns `false` when any pass aborted or
/// had a failed step.
async fn dispatch_once(engine: &DispatchEngine, pipelines: &[Pipeline], json: bool) -> Result<bool> {
    let mut success = true;

    for pipeline in pipelines {
        let report = match engine.run(&pipeline.namespace, &pipeline.pipeline).await {
            Ok(report) => report,
            Err(e) => {
                error!(pipeline = %pipeline, error = %e, "Dispatch pass aborted");
                eprintln!("{} {}: {}", "✗".red().bold(), pipeline, e.to_string().red());
                success = false;
                continue;
            }
        };

        if json {
            println!("{}", report::render_json(&report)?);
        } else {
            println!("{}", report::render_table(&report));
        }
        success &= report.is_success();
    }

    Ok(success)
}

async fn build_engine(settings: &Settings) -> Result<DispatchEngine> {
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);

    let tracking = HttpTrackingService::new(&settings.workflow.url, settings.workflow.timeout())?;
    info!(url = %tracking.base_url(), "Workflow service configured");

    let graphs = FileGraphSource::new(settings.graphs.root());
    info!(root = %graphs.root().display(), "Workflow graphs configured");

    let store = build_queue_store(settings, time_provider.clone()).await?;

    Ok(DispatchEngine::new(
        Arc::new(graphs),
        Arc::new(tracking),
        QueueGateway::new(store),
        time_provider,
        Arc::new(UuidProvider),
        DispatchConfig {
            pending_limit: settings.dispatch.pending_limit,
        },
    ))
}

async fn build_queue_store(
    settings: &Settings,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<Arc<dyn QueueStore>> {
    match settings.queue.backend {
        QueueBackend::Redis => {
            info!(namespace = %settings.queue.redis_namespace, "Connecting to Redis...");
            let store =
                RedisQueueStore::connect(&settings.queue.redis_url, &settings.queue.redis_namespace)
                    .await?;
            Ok(Arc::new(store))
        }
        QueueBackend::Sqlite => {
            let path = settings.queue.sqlite_path();
            info!(path = %path.display(), "Initializing queue database...");

            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Cannot create {}", dir.display()))?;
            }
            let db_path = path.to_str().context("Queue database path is not UTF-8")?;

            let pool = create_pool(db_path).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(SqliteQueueStore::new(pool, time_provider)))
        }
    }
}

async fn watch(engine: Arc<DispatchEngine>, pipelines: Vec<Pipeline>, interval: Duration) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let scheduler = DispatchScheduler::new(engine, pipelines, interval);

    let handle = tokio::spawn(async move {
        if let Err(e) = scheduler.run(shutdown_rx).await {
            error!(error = %e, "Dispatch scheduler failed");
        }
    });

    info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Finishing current pass...");
    shutdown_tx.shutdown();
    handle.await.context("Dispatch scheduler panicked")?;

    info!("Shutdown complete.");
    Ok(())
}
