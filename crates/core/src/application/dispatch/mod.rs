// Dispatch Engine - mediates between the tracking service and the priority queues

mod report;

pub use report::{DispatchReport, SkipReason, StepOutcome, StepReport};

use crate::application::constants::DEFAULT_PENDING_LIMIT;
use crate::application::queue_gateway::QueueGateway;
use crate::domain::{
    classes_present, classify, dedup_by_object, has_priority_items, EligibleJob, GraphNode,
    QualifiedStep, StepDefinition, StepStatus,
};
use crate::error::{AppError, Result};
use crate::port::{GraphSource, IdProvider, PendingQuery, TimeProvider, TrackingService};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Dispatch policy knobs
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Page size for `find_pending` when the step does not set its own
    pub pending_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pending_limit: DEFAULT_PENDING_LIMIT,
        }
    }
}

/// Dispatch engine
///
/// One `run` is one pass over one pipeline: every step is inspected once,
/// sequentially. Failures inside a step are recorded in the report and the
/// pass moves on; only a graph that cannot be loaded aborts the pass.
///
/// The engine never installs a subscriber. It emits `tracing` events inside a
/// `dispatch` span carrying `run_id`, `namespace` and `pipeline`; where they
/// go is up to the caller.
pub struct DispatchEngine {
    graphs: Arc<dyn GraphSource>,
    tracking: Arc<dyn TrackingService>,
    queues: QueueGateway,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    config: DispatchConfig,
}

impl DispatchEngine {
    /// Create a new dispatch engine
    ///
    /// # Arguments
    /// * `graphs` - Source of process-graph definitions
    /// * `tracking` - Workflow-tracking service
    /// * `queues` - Gateway over the queue store
    /// * `time_provider` - Clock for report timestamps
    /// * `id_provider` - Run ID generator
    /// * `config` - Dispatch policy
    pub fn new(
        graphs: Arc<dyn GraphSource>,
        tracking: Arc<dyn TrackingService>,
        queues: QueueGateway,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            graphs,
            tracking,
            queues,
            time_provider,
            id_provider,
            config,
        }
    }

    /// Run one dispatch pass over `namespace:pipeline`
    ///
    /// # Returns
    /// Per-step outcomes, including a failure for every node that cannot be
    /// qualified. `Err` only when the graph cannot be loaded.
    pub async fn run(&self, namespace: &str, pipeline: &str) -> Result<DispatchReport> {
        let run_id = self.id_provider.generate_id();
        let span = info_span!("dispatch", run_id = %run_id, namespace = %namespace, pipeline = %pipeline);

        self.run_pass(run_id, namespace, pipeline)
            .instrument(span)
            .await
    }

    async fn run_pass(
        &self,
        run_id: String,
        namespace: &str,
        pipeline: &str,
    ) -> Result<DispatchReport> {
        let graph = match self.graphs.load(namespace, pipeline).await {
            Ok(graph) => graph,
            Err(e) => {
                error!(error = %e, "Cannot load workflow graph");
                return Err(e);
            }
        };
        debug!(steps = graph.len(), "Workflow graph loaded");

        let mut report =
            DispatchReport::new(run_id, namespace, pipeline, self.time_provider.now_millis());

        for node in graph.nodes() {
            match node {
                GraphNode::Step(step) => {
                    let outcome = self.perform_step(step).await;
                    report.record(step.name.clone(), outcome);
                }
                GraphNode::Rejected { name, error } => {
                    error!(step = %name, error = %error, "Cannot qualify step");
                    report.record(
                        name.clone(),
                        StepOutcome::Failed {
                            enqueued: 0,
                            error: AppError::Domain(error.clone()),
                        },
                    );
                }
            }
        }

        report.finish(self.time_provider.now_millis());
        info!(
            total_enqueued = report.total_enqueued(),
            failed_steps = report.failures().count(),
            "Dispatch pass complete"
        );
        Ok(report)
    }

    /// Decide and perform the dispatch for a single step
    pub async fn perform_step(&self, step: &StepDefinition) -> StepOutcome {
        if step.skip {
            debug!(step = %step.name, "Skipping step");
            return StepOutcome::Skipped {
                reason: SkipReason::Disabled,
            };
        }

        if step.prerequisites.is_empty() {
            // The tracking service does not return priorities without prerequisites
            warn!(step = %step.name, "Skipping step without prerequisites");
            return StepOutcome::Skipped {
                reason: SkipReason::NoPrerequisites,
            };
        }

        info!(step = %step.name, "Processing step");
        let prerequisites: Vec<&str> = step.prerequisites.iter().map(QualifiedStep::as_str).collect();
        debug!(step = %step.name, depends_on = %prerequisites.join(","), "Step prerequisites");

        let jobs = match self.find_pending(step).await {
            Ok(jobs) => jobs,
            Err(e) => {
                error!(step = %step.name, error = %e, "Cannot query pending objects");
                return StepOutcome::Failed {
                    enqueued: 0,
                    error: e,
                };
            }
        };
        debug!(step = %step.name, found = jobs.len(), "Found pending objects");

        if jobs.is_empty() {
            return StepOutcome::Skipped {
                reason: SkipReason::NoPendingObjects,
            };
        }

        match self.needs_work(&step.name, &jobs).await {
            Ok(true) => {}
            Ok(false) => {
                return StepOutcome::Skipped {
                    reason: SkipReason::QueuesSupplied,
                }
            }
            Err(e) => {
                error!(step = %step.name, error = %e, "Cannot inspect priority queues");
                return StepOutcome::Failed {
                    enqueued: 0,
                    error: e,
                };
            }
        }

        let mut enqueued = 0;
        for job in &jobs {
            if let Err(e) = self.dispatch_job(&step.name, job).await {
                // Anything already pushed stays pushed; see `dispatch_job`
                error!(
                    step = %step.name,
                    object_id = %job.object_id,
                    priority = job.raw_priority,
                    error = %e,
                    "Cannot enqueue job"
                );
                return StepOutcome::Failed { enqueued, error: e };
            }
            enqueued += 1;
        }

        info!(step = %step.name, enqueued = enqueued, "Step dispatched");
        StepOutcome::Enqueued { count: enqueued }
    }

    /// Report an object as queued at `step` to the tracking service
    ///
    /// Fails with `InvalidStepName` when `step` is not fully qualified.
    pub async fn mark_enqueued(&self, step: &str, object_id: &str) -> Result<StepStatus> {
        let step: QualifiedStep = step.parse()?;
        self.report_enqueued(&step, object_id).await
    }

    async fn find_pending(&self, step: &StepDefinition) -> Result<Vec<EligibleJob>> {
        let limit = step.limit.unwrap_or(self.config.pending_limit);
        let query = PendingQuery::new(step.name.clone(), step.prerequisites.clone(), limit);
        let jobs = self.tracking.find_pending(&query).await?;

        let found = jobs.len();
        let jobs = dedup_by_object(jobs);
        if jobs.len() < found {
            warn!(step = %step.name, duplicates = found - jobs.len(), "Collapsed repeated object ids");
        }
        Ok(jobs)
    }

    /// Work is needed when a class present in the batch has an empty queue,
    /// or when any job is above the default tier.
    async fn needs_work(&self, step: &QualifiedStep, jobs: &[EligibleJob]) -> Result<bool> {
        let mut needs_work = false;

        for class in classes_present(jobs) {
            if self.queues.queue_empty(step, class).await? {
                needs_work = true;
            }
        }

        if has_priority_items(jobs) {
            needs_work = true;
        }

        debug!(step = %step, needs_work = needs_work, "Queue demand evaluated");
        Ok(needs_work)
    }

    /// Enqueue then mark. The two calls are not atomic: if the mark fails the
    /// object stays queued but still waiting, and the next pass enqueues it again.
    async fn dispatch_job(&self, step: &QualifiedStep, job: &EligibleJob) -> Result<()> {
        let class = classify(job.raw_priority);

        self.queues
            .enqueue(step, class, &job.object_id)
            .await
            .map_err(|e| AppError::dispatch(step, &job.object_id, e))?;

        self.report_enqueued(step, &job.object_id)
            .await
            .map_err(|e| AppError::dispatch(step, &job.object_id, e))?;

        Ok(())
    }

    async fn report_enqueued(&self, step: &QualifiedStep, object_id: &str) -> Result<StepStatus> {
        debug!(step = %step, object_id = %object_id, "Marking enqueued");

        let status = self.tracking.mark_enqueued(step, object_id).await?;
        if status != StepStatus::Queued {
            warn!(
                step = %step,
                object_id = %object_id,
                status = %status,
                "Tracking service reported unexpected status after enqueue"
            );
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests;
