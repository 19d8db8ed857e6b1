//! Dispatch Scheduler - re-runs dispatch passes on a fixed interval
//!
//! Replaces an external cron trigger: every tick runs one pass per
//! configured pipeline. Pipelines have disjoint step namespaces, so their
//! passes run concurrently. Shutdown is only observed between passes.

use crate::application::constants::MIN_DISPATCH_INTERVAL;
use crate::application::dispatch::{DispatchEngine, DispatchReport};
use crate::application::shutdown::ShutdownToken;
use crate::error::Result;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// A (namespace, pipeline) pair to dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub namespace: String,
    pub pipeline: String,
}

impl Pipeline {
    pub fn new(namespace: impl Into<String>, pipeline: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pipeline: pipeline.into(),
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.pipeline)
    }
}

/// Dispatch scheduler
pub struct DispatchScheduler {
    engine: Arc<DispatchEngine>,
    pipelines: Vec<Pipeline>,
    interval: Duration,
}

impl DispatchScheduler {
    /// Create a new dispatch scheduler
    ///
    /// # Arguments
    /// * `engine` - Engine shared by every pass
    /// * `pipelines` - Pipelines dispatched on each tick
    /// * `interval` - Pause between ticks; zero is raised to one second
    pub fn new(engine: Arc<DispatchEngine>, pipelines: Vec<Pipeline>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            warn!(
                min_secs = MIN_DISPATCH_INTERVAL.as_secs(),
                "Zero dispatch interval raised to the minimum"
            );
            MIN_DISPATCH_INTERVAL
        } else {
            interval
        };

        Self {
            engine,
            pipelines,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run every pipeline once, concurrently
    pub async fn run_once(&self) -> Vec<(Pipeline, Result<DispatchReport>)> {
        let passes = self.pipelines.iter().map(|p| async move {
            let result = self.engine.run(&p.namespace, &p.pipeline).await;
            (p.clone(), result)
        });
        join_all(passes).await
    }

    /// Run passes until shutdown is requested
    ///
    /// A failed pass is logged and retried on the next tick; it never stops
    /// the loop.
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(
            pipelines = self.pipelines.len(),
            interval_secs = self.interval.as_secs(),
            "Dispatch scheduler started"
        );

        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            tokio::select! {
                _ = tick.tick() => {},
                _ = shutdown.wait() => {
                    info!("Dispatch scheduler interrupted while idle");
                    break;
                }
            }

            for (pipeline, result) in self.run_once().await {
                match result {
                    Ok(report) if report.is_success() => info!(
                        pipeline = %pipeline,
                        enqueued = report.total_enqueued(),
                        "Dispatch pass succeeded"
                    ),
                    Ok(report) => warn!(
                        pipeline = %pipeline,
                        enqueued = report.total_enqueued(),
                        failed_steps = report.failures().count(),
                        "Dispatch pass finished with failed steps"
                    ),
                    Err(e) => error!(pipeline = %pipeline, error = %e, "Dispatch pass aborted"),
                }
            }
        }

        info!("Dispatch scheduler stopped");
        Ok(())
    }
}
