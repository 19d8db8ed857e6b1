// Queue Gateway - (step, priority class) scoped access to the queue store

use crate::domain::{PriorityClass, QualifiedStep, QueueKey};
use crate::error::{AppError, Result};
use crate::port::QueueStore;
use std::sync::Arc;
use tracing::debug;

/// Queue gateway used by the dispatch engine
///
/// Every store failure comes out as `AppError::QueueUnavailable`. A failed
/// emptiness check is never reported as "empty" or "non-empty".
pub struct QueueGateway {
    store: Arc<dyn QueueStore>,
}

impl QueueGateway {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    /// True if the queue for `(step, class)` holds zero items
    pub async fn queue_empty(&self, step: &QualifiedStep, class: PriorityClass) -> Result<bool> {
        let key = QueueKey::new(step.clone(), class);
        debug!(queue = %key, "Checking priority queue");

        let empty = self.store.is_empty(&key).await.map_err(unavailable)?;
        debug!(queue = %key, empty = empty, "Priority queue checked");
        Ok(empty)
    }

    /// Append `object_id` to the tail of the queue for `(step, class)`
    pub async fn enqueue(
        &self,
        step: &QualifiedStep,
        class: PriorityClass,
        object_id: &str,
    ) -> Result<()> {
        let key = QueueKey::new(step.clone(), class);
        self.store
            .push(&key, object_id)
            .await
            .map_err(unavailable)?;

        debug!(queue = %key, object_id = %object_id, "Enqueued job");
        Ok(())
    }
}

fn unavailable(err: AppError) -> AppError {
    match err {
        AppError::QueueUnavailable(_) => err,
        other => AppError::QueueUnavailable(other.to_string()),
    }
}
