// Dispatch Report - what one pass did to each step

use crate::error::AppError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Why a step was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Marked `skip-queue` or carrying a non-waiting status in the graph
    Disabled,
    /// The tracking service cannot order work for steps without prerequisites
    NoPrerequisites,
    /// Nothing is waiting at this step
    NoPendingObjects,
    /// Every relevant queue already has work and nothing is urgent
    QueuesSupplied,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::Disabled => "disabled",
            SkipReason::NoPrerequisites => "no prerequisites",
            SkipReason::NoPendingObjects => "no pending objects",
            SkipReason::QueuesSupplied => "queues supplied",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Enqueued {
        count: usize,
    },
    Skipped {
        reason: SkipReason,
    },
    /// `enqueued` jobs were dispatched before the step aborted
    Failed {
        enqueued: usize,
        #[serde(serialize_with = "error_message")]
        error: AppError,
    },
}

impl StepOutcome {
    /// Jobs dispatched for the step (zero when skipped)
    pub fn enqueued(&self) -> usize {
        match self {
            StepOutcome::Enqueued { count } => *count,
            StepOutcome::Skipped { .. } => 0,
            StepOutcome::Failed { enqueued, .. } => *enqueued,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

fn error_message<S: Serializer>(error: &AppError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    /// Qualified step name
    pub step: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Result of one dispatch pass over one pipeline
#[derive(Debug, Serialize)]
pub struct DispatchReport {
    pub run_id: String,
    pub namespace: String,
    pub pipeline: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub steps: Vec<StepReport>,
}

impl DispatchReport {
    pub fn new(
        run_id: impl Into<String>,
        namespace: impl Into<String>,
        pipeline: impl Into<String>,
        started_at: i64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            namespace: namespace.into(),
            pipeline: pipeline.into(),
            started_at,
            finished_at: None,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, step: impl Into<String>, outcome: StepOutcome) {
        self.steps.push(StepReport {
            step: step.into(),
            outcome,
        });
    }

    pub fn finish(&mut self, finished_at: i64) {
        self.finished_at = Some(finished_at);
    }

    /// A pass succeeds when no step failed
    pub fn is_success(&self) -> bool {
        !self.steps.iter().any(|s| s.outcome.is_failure())
    }

    pub fn total_enqueued(&self) -> usize {
        self.steps.iter().map(|s| s.outcome.enqueued()).sum()
    }

    pub fn outcome_for(&self, step: &str) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|s| s.step == step)
            .map(|s| &s.outcome)
    }

    /// Jobs dispatched for `step` (zero when skipped or unknown)
    pub fn enqueued_for(&self, step: &str) -> usize {
        self.outcome_for(step).map_or(0, StepOutcome::enqueued)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.outcome.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QualifiedStep;

    fn step(name: &str) -> QualifiedStep {
        QualifiedStep::qualify(name, "dor", "assemblyWF").unwrap()
    }

    #[test]
    fn test_report_totals() {
        let mut report = DispatchReport::new("run-1", "dor", "assemblyWF", 1000);
        report.record(step("a"), StepOutcome::Enqueued { count: 3 });
        report.record(
            step("b"),
            StepOutcome::Skipped {
                reason: SkipReason::QueuesSupplied,
            },
        );
        report.finish(2000);

        assert!(report.is_success());
        assert_eq!(report.total_enqueued(), 3);
        assert_eq!(report.enqueued_for("dor:assemblyWF:a"), 3);
        assert_eq!(report.enqueued_for("dor:assemblyWF:b"), 0);
        assert_eq!(report.enqueued_for("dor:assemblyWF:missing"), 0);
        assert_eq!(report.finished_at, Some(2000));
    }

    #[test]
    fn test_failed_step_fails_report() {
        let mut report = DispatchReport::new("run-1", "dor", "assemblyWF", 1000);
        report.record(step("a"), StepOutcome::Enqueued { count: 1 });
        report.record(
            step("b"),
            StepOutcome::Failed {
                enqueued: 2,
                error: AppError::QueueUnavailable("connection refused".to_string()),
            },
        );

        assert!(!report.is_success());
        assert_eq!(report.total_enqueued(), 3);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_report_serializes_errors_as_messages() {
        let mut report = DispatchReport::new("run-1", "dor", "assemblyWF", 1000);
        report.record(
            step("b"),
            StepOutcome::Failed {
                enqueued: 0,
                error: AppError::QueueUnavailable("connection refused".to_string()),
            },
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["step"], "dor:assemblyWF:b");
        assert_eq!(json["steps"][0]["outcome"], "failed");
        assert_eq!(
            json["steps"][0]["error"],
            "Queue store unavailable: connection refused"
        );
    }
}
