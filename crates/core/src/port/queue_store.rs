// Queue Store Port (key-scoped FIFO queues read by workers)

use crate::domain::QueueKey;
use crate::error::Result;
use async_trait::async_trait;

/// Queue store interface
///
/// Implementations report transport failures as `AppError::QueueUnavailable`.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// True if the queue currently holds zero items
    async fn is_empty(&self, key: &QueueKey) -> Result<bool>;

    /// Append one object at the tail of the queue (no de-duplication)
    async fn push(&self, key: &QueueKey, object_id: &str) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory queue store with failure injection
    #[derive(Default)]
    pub struct InMemoryQueueStore {
        queues: Mutex<HashMap<String, VecDeque<String>>>,
        empty_checks: Mutex<Vec<QueueKey>>,
        pushes: Mutex<Vec<(QueueKey, String)>>,
        unavailable: AtomicBool,
        failing_pushes: Mutex<HashSet<String>>,
    }

    impl InMemoryQueueStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-fill a queue as if workers had not drained it yet
        pub fn seed(&self, key: &QueueKey, object_ids: &[&str]) {
            let mut queues = self.queues.lock().unwrap();
            let queue = queues.entry(key.queue_name()).or_default();
            queue.extend(object_ids.iter().map(|id| id.to_string()));
        }

        pub fn items(&self, key: &QueueKey) -> Vec<String> {
            self.queues
                .lock()
                .unwrap()
                .get(&key.queue_name())
                .map(|q| q.iter().cloned().collect())
                .unwrap_or_default()
        }

        /// Simulate the store being unreachable
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        pub fn fail_push_for(&self, object_id: &str) {
            self.failing_pushes
                .lock()
                .unwrap()
                .insert(object_id.to_string());
        }

        pub fn empty_checks(&self) -> Vec<QueueKey> {
            self.empty_checks.lock().unwrap().clone()
        }

        /// Successful pushes, in call order
        pub fn pushes(&self) -> Vec<(QueueKey, String)> {
            self.pushes.lock().unwrap().clone()
        }

        fn check_available(&self) -> Result<()> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::QueueUnavailable(
                    "connection refused".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl QueueStore for InMemoryQueueStore {
        async fn is_empty(&self, key: &QueueKey) -> Result<bool> {
            self.empty_checks.lock().unwrap().push(key.clone());
            self.check_available()?;
            Ok(self
                .queues
                .lock()
                .unwrap()
                .get(&key.queue_name())
                .map_or(true, |q| q.is_empty()))
        }

        async fn push(&self, key: &QueueKey, object_id: &str) -> Result<()> {
            self.check_available()?;
            if self.failing_pushes.lock().unwrap().contains(object_id) {
                return Err(AppError::QueueUnavailable(format!(
                    "write to {} failed",
                    key
                )));
            }

            self.queues
                .lock()
                .unwrap()
                .entry(key.queue_name())
                .or_default()
                .push_back(object_id.to_string());
            self.pushes
                .lock()
                .unwrap()
                .push((key.clone(), object_id.to_string()));
            Ok(())
        }
    }
}
