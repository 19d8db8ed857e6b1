// Redis QueueStore Implementation

use crate::resque::{queue_list_key, queues_set_key, ResquePayload};
use async_trait::async_trait;
use robot_master_core::domain::QueueKey;
use robot_master_core::error::{AppError, Result};
use robot_master_core::port::QueueStore;
use tracing::debug;

/// Resque-compatible queue store
///
/// `ConnectionManager` multiplexes one connection and reconnects on its own,
/// so the store is cheap to clone and share.
#[derive(Clone)]
pub struct RedisQueueStore {
    connection_manager: redis::aio::ConnectionManager,
    namespace: String,
}

impl std::fmt::Debug for RedisQueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueueStore")
            .field("connection_manager", &"ConnectionManager")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl RedisQueueStore {
    /// Connect to `url` and keep every key under `namespace`
    pub async fn connect(url: &str, namespace: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            AppError::QueueUnavailable(format!("Failed to create Redis client: {}", e))
        })?;

        let connection_manager = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::QueueUnavailable(format!("Failed to connect to Redis: {}", e)))?;

        let namespace = namespace.into();
        debug!(namespace = %namespace, "Redis queue store connected");

        Ok(Self {
            connection_manager,
            namespace,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of jobs currently in the queue
    pub async fn len(&self, key: &QueueKey) -> Result<u64> {
        let mut conn = self.connection_manager.clone();

        redis::cmd("LLEN")
            .arg(queue_list_key(&self.namespace, key))
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::QueueUnavailable(format!("Redis LLEN failed: {}", e)))
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn is_empty(&self, key: &QueueKey) -> Result<bool> {
        Ok(self.len(key).await? == 0)
    }

    async fn push(&self, key: &QueueKey, object_id: &str) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let payload = serde_json::to_string(&ResquePayload::new(&key.step, object_id))?;
        let list_key = queue_list_key(&self.namespace, key);

        // Register the queue and push the job in one MULTI/EXEC
        redis::pipe()
            .atomic()
            .cmd("SADD")
            .arg(queues_set_key(&self.namespace))
            .arg(key.queue_name())
            .ignore()
            .cmd("RPUSH")
            .arg(&list_key)
            .arg(&payload)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| AppError::QueueUnavailable(format!("Redis RPUSH failed: {}", e)))?;

        debug!(queue = %list_key, object_id = %object_id, "Pushed Resque job");
        Ok(())
    }
}
