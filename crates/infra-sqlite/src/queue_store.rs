// SQLite QueueStore Implementation

use async_trait::async_trait;
use robot_master_core::domain::QueueKey;
use robot_master_core::error::{AppError, Result};
use robot_master_core::port::{QueueStore, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

// Helper to convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            match db_err.code().as_deref() {
                Some("5") => AppError::QueueUnavailable(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                Some("13") => {
                    AppError::QueueUnavailable(format!("Database full: {}", db_err.message()))
                }
                Some(code) => AppError::QueueUnavailable(format!(
                    "Database error [{}]: {}",
                    code,
                    db_err.message()
                )),
                None => AppError::QueueUnavailable(format!("Database error: {}", db_err.message())),
            }
        }
        sqlx::Error::PoolTimedOut => {
            AppError::QueueUnavailable("Timed out waiting for a database connection".to_string())
        }
        // Connection, pool, protocol errors
        _ => AppError::QueueUnavailable(err.to_string()),
    }
}

/// Queue store backed by a single SQLite table
///
/// Items are ordered by their autoincrement id, so each queue is FIFO.
pub struct SqliteQueueStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Number of items currently in the queue
    pub async fn len(&self, key: &QueueKey) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM queue_items WHERE queue = ?")
            .bind(key.queue_name())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    /// Remove and return the head of the queue (used by workers)
    pub async fn pop(&self, key: &QueueKey) -> Result<Option<String>> {
        sqlx::query_scalar(
            r#"
            DELETE FROM queue_items
            WHERE id = (
                SELECT id FROM queue_items
                WHERE queue = ?
                ORDER BY id ASC
                LIMIT 1
            )
            RETURNING object_id
            "#,
        )
        .bind(key.queue_name())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    /// Object ids in the queue, head first
    pub async fn items(&self, key: &QueueKey) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT object_id FROM queue_items WHERE queue = ? ORDER BY id ASC")
            .bind(key.queue_name())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn is_empty(&self, key: &QueueKey) -> Result<bool> {
        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM queue_items WHERE queue = ?)")
                .bind(key.queue_name())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(exists == 0)
    }

    async fn push(&self, key: &QueueKey, object_id: &str) -> Result<()> {
        let now = self.time_provider.now_millis();

        sqlx::query("INSERT INTO queue_items (queue, object_id, enqueued_at) VALUES (?, ?, ?)")
            .bind(key.queue_name())
            .bind(object_id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(queue = %key, object_id = %object_id, "Pushed queue item");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use robot_master_core::domain::PriorityClass;
    use robot_master_core::port::time_provider::SystemTimeProvider;

    async fn setup_test_store() -> SqliteQueueStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteQueueStore::new(pool, Arc::new(SystemTimeProvider))
    }

    fn key(class: PriorityClass) -> QueueKey {
        QueueKey::new("dor:assemblyWF:jp2-create".parse().unwrap(), class)
    }

    #[tokio::test]
    async fn test_push_and_is_empty() {
        let store = setup_test_store().await;

        assert!(store.is_empty(&key(PriorityClass::Default)).await.unwrap());

        store
            .push(&key(PriorityClass::Default), "druid:aa111")
            .await
            .unwrap();

        assert!(!store.is_empty(&key(PriorityClass::Default)).await.unwrap());
        assert!(store.is_empty(&key(PriorityClass::High)).await.unwrap());
        assert_eq!(store.len(&key(PriorityClass::Default)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let store = setup_test_store().await;
        let key = key(PriorityClass::High);

        for id in ["druid:aa111", "druid:bb222", "druid:cc333"] {
            store.push(&key, id).await.unwrap();
        }

        assert_eq!(
            store.items(&key).await.unwrap(),
            vec!["druid:aa111", "druid:bb222", "druid:cc333"]
        );
        assert_eq!(store.pop(&key).await.unwrap().as_deref(), Some("druid:aa111"));
        assert_eq!(store.pop(&key).await.unwrap().as_deref(), Some("druid:bb222"));
        assert_eq!(store.len(&key).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pop_empty_queue() {
        let store = setup_test_store().await;
        assert!(store.pop(&key(PriorityClass::Low)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let store = setup_test_store().await;
        let key = key(PriorityClass::Default);

        store.push(&key, "druid:aa111").await.unwrap();
        store.push(&key, "druid:aa111").await.unwrap();

        assert_eq!(store.len(&key).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_schema_is_queue_unavailable() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let store = SqliteQueueStore::new(pool, Arc::new(SystemTimeProvider));

        let err = store
            .is_empty(&key(PriorityClass::Default))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QueueUnavailable(_)));
    }
}
