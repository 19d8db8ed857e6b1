// Tracking Service Port (workflow status of objects per step)

use crate::domain::{EligibleJob, QualifiedStep, StepStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Query for objects waiting at `step` whose prerequisites are all complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub prerequisites: Vec<QualifiedStep>,
    pub step: QualifiedStep,
    pub cursor: Option<String>,
    pub filter: Option<String>,
    pub with_priority: bool,
    /// Maximum number of objects returned
    pub limit: usize,
}

impl PendingQuery {
    pub fn new(step: QualifiedStep, prerequisites: Vec<QualifiedStep>, limit: usize) -> Self {
        Self {
            prerequisites,
            step,
            cursor: None,
            filter: None,
            with_priority: true,
            limit,
        }
    }
}

/// Workflow-tracking service interface
#[async_trait]
pub trait TrackingService: Send + Sync {
    /// Objects eligible for `query.step`, in the order the service returns them
    async fn find_pending(&self, query: &PendingQuery) -> Result<Vec<EligibleJob>>;

    /// Move one object's status at `step` from waiting to queued
    ///
    /// # Returns
    /// The status the service now holds for the object
    async fn mark_enqueued(&self, step: &QualifiedStep, object_id: &str) -> Result<StepStatus>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory tracking service
    ///
    /// Successfully marked objects stop being returned by `find_pending`,
    /// like the real service once the status update is visible.
    #[derive(Default)]
    pub struct MockTrackingService {
        pending: Mutex<HashMap<String, Vec<EligibleJob>>>,
        queries: Mutex<Vec<PendingQuery>>,
        marks: Mutex<Vec<(String, String)>>,
        failing_queries: Mutex<HashSet<String>>,
        failing_marks: Mutex<HashSet<String>>,
    }

    impl MockTrackingService {
        pub fn new() -> Self {
            Self::default()
        }

        /// Replace the objects waiting at `step`
        pub fn set_pending(&self, step: &str, jobs: Vec<EligibleJob>) {
            self.pending.lock().unwrap().insert(step.to_string(), jobs);
        }

        pub fn pending(&self, step: &str) -> Vec<EligibleJob> {
            self.pending
                .lock()
                .unwrap()
                .get(step)
                .cloned()
                .unwrap_or_default()
        }

        /// Make `find_pending` for `step` fail with a transport error
        pub fn fail_query_for(&self, step: &str) {
            self.failing_queries.lock().unwrap().insert(step.to_string());
        }

        /// Make `mark_enqueued` for `object_id` fail with a transport error
        pub fn fail_mark_for(&self, object_id: &str) {
            self.failing_marks
                .lock()
                .unwrap()
                .insert(object_id.to_string());
        }

        pub fn clear_failures(&self) {
            self.failing_queries.lock().unwrap().clear();
            self.failing_marks.lock().unwrap().clear();
        }

        pub fn queries(&self) -> Vec<PendingQuery> {
            self.queries.lock().unwrap().clone()
        }

        /// Successful `(step, object_id)` marks, in call order
        pub fn marks(&self) -> Vec<(String, String)> {
            self.marks.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TrackingService for MockTrackingService {
        async fn find_pending(&self, query: &PendingQuery) -> Result<Vec<EligibleJob>> {
            self.queries.lock().unwrap().push(query.clone());

            if self
                .failing_queries
                .lock()
                .unwrap()
                .contains(query.step.as_str())
            {
                return Err(AppError::TrackingUnavailable(format!(
                    "workflow_queue for {} timed out",
                    query.step
                )));
            }

            Ok(self
                .pending(query.step.as_str())
                .into_iter()
                .take(query.limit)
                .collect())
        }

        async fn mark_enqueued(
            &self,
            step: &QualifiedStep,
            object_id: &str,
        ) -> Result<StepStatus> {
            if self.failing_marks.lock().unwrap().contains(object_id) {
                return Err(AppError::TrackingUnavailable(format!(
                    "cannot update {} for {}",
                    step, object_id
                )));
            }

            if let Some(jobs) = self.pending.lock().unwrap().get_mut(step.as_str()) {
                jobs.retain(|job| job.object_id != object_id);
            }
            self.marks
                .lock()
                .unwrap()
                .push((step.to_string(), object_id.to_string()));
            Ok(StepStatus::Queued)
        }
    }
}
