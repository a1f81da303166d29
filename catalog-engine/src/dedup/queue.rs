//! Dedup task queue.
//!
//! Tasks are keyed by catalog, then by publication id. A generator run replaces
//! the whole queue; the editorial UI pops and deletes single tasks.
//!
//! ```ignore
//! // Development: in-memory queue
//! let queue = QueueSource::memory().into_queue().await?;
//!
//! // Production: PostgreSQL
//! let queue = QueueSource::postgres("postgres://...").into_queue().await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_shared::Catalog;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tokio::sync::RwLock;

use crate::errors::EngineError;

/// Tasks of one generator run: catalog → publication id → payload.
pub type TaskMap = BTreeMap<Catalog, BTreeMap<String, Value>>;

#[derive(Debug, Clone)]
pub enum QueueSource {
    Memory,
    Postgres { database_url: String },
}

impl QueueSource {
    pub fn memory() -> Self {
        Self::Memory
    }

    pub fn postgres(database_url: impl Into<String>) -> Self {
        Self::Postgres {
            database_url: database_url.into(),
        }
    }

    pub async fn into_queue(self) -> Result<Arc<dyn CandidateQueue>, EngineError> {
        match self {
            Self::Memory => Ok(Arc::new(InMemoryQueue::new())),
            Self::Postgres { database_url } => {
                Ok(Arc::new(PostgresQueue::connect(&database_url).await?))
            }
        }
    }
}

#[async_trait]
pub trait CandidateQueue: Send + Sync {
    /// Drop every queued task and store `tasks` in one step.
    async fn replace(&self, tasks: &TaskMap) -> Result<(), EngineError>;

    async fn put(&self, catalog: Catalog, publication_id: &str, payload: &Value)
        -> Result<(), EngineError>;

    /// Remove and return the first task of a catalog.
    async fn pop(&self, catalog: Catalog) -> Result<Option<(String, Value)>, EngineError>;

    /// Returns whether a task was removed.
    async fn delete(&self, catalog: Catalog, publication_id: &str) -> Result<bool, EngineError>;

    async fn len(&self, catalog: Catalog) -> Result<usize, EngineError>;
}

// =============================================================================
// In-memory queue
// =============================================================================

#[derive(Default)]
pub struct InMemoryQueue {
    tasks: RwLock<TaskMap>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandidateQueue for InMemoryQueue {
    async fn replace(&self, tasks: &TaskMap) -> Result<(), EngineError> {
        *self.tasks.write().await = tasks.clone();
        Ok(())
    }

    async fn put(
        &self,
        catalog: Catalog,
        publication_id: &str,
        payload: &Value,
    ) -> Result<(), EngineError> {
        self.tasks
            .write()
            .await
            .entry(catalog)
            .or_default()
            .insert(publication_id.to_string(), payload.clone());
        Ok(())
    }

    async fn pop(&self, catalog: Catalog) -> Result<Option<(String, Value)>, EngineError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.get_mut(&catalog).and_then(|queue| queue.pop_first()))
    }

    async fn delete(&self, catalog: Catalog, publication_id: &str) -> Result<bool, EngineError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks
            .get_mut(&catalog)
            .is_some_and(|queue| queue.remove(publication_id).is_some()))
    }

    async fn len(&self, catalog: Catalog) -> Result<usize, EngineError> {
        Ok(self
            .tasks
            .read()
            .await
            .get(&catalog)
            .map_or(0, BTreeMap::len))
    }
}

// =============================================================================
// PostgreSQL queue
// =============================================================================

pub struct PostgresQueue {
    connection: Pool<Postgres>,
}

impl PostgresQueue {
    pub async fn connect(database_url: &str) -> Result<Self, EngineError> {
        let connection = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS dedup_queue ( \
                catalog TEXT NOT NULL, \
                publication_id TEXT NOT NULL, \
                payload JSONB NOT NULL, \
                PRIMARY KEY (catalog, publication_id))",
        )
        .execute(&connection)
        .await?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl CandidateQueue for PostgresQueue {
    async fn replace(&self, tasks: &TaskMap) -> Result<(), EngineError> {
        let mut tx = self.connection.begin().await?;
        sqlx::query("DELETE FROM dedup_queue")
            .execute(&mut *tx)
            .await?;
        for (catalog, entries) in tasks {
            for (publication_id, payload) in entries {
                sqlx::query(
                    "INSERT INTO dedup_queue (catalog, publication_id, payload) \
                     VALUES ($1, $2, $3)",
                )
                .bind(catalog.as_str())
                .bind(publication_id)
                .bind(payload)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn put(
        &self,
        catalog: Catalog,
        publication_id: &str,
        payload: &Value,
    ) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO dedup_queue (catalog, publication_id, payload) VALUES ($1, $2, $3) \
             ON CONFLICT (catalog, publication_id) DO UPDATE SET payload = $3",
        )
        .bind(catalog.as_str())
        .bind(publication_id)
        .bind(payload)
        .execute(&self.connection)
        .await?;
        Ok(())
    }

    async fn pop(&self, catalog: Catalog) -> Result<Option<(String, Value)>, EngineError> {
        let row: Option<(String, Value)> = sqlx::query_as(
            "DELETE FROM dedup_queue WHERE (catalog, publication_id) = ( \
                SELECT catalog, publication_id FROM dedup_queue WHERE catalog = $1 \
                ORDER BY publication_id LIMIT 1 FOR UPDATE SKIP LOCKED) \
             RETURNING publication_id, payload",
        )
        .bind(catalog.as_str())
        .fetch_optional(&self.connection)
        .await?;
        Ok(row)
    }

    async fn delete(&self, catalog: Catalog, publication_id: &str) -> Result<bool, EngineError> {
        let result =
            sqlx::query("DELETE FROM dedup_queue WHERE catalog = $1 AND publication_id = $2")
                .bind(catalog.as_str())
                .bind(publication_id)
                .execute(&self.connection)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn len(&self, catalog: Catalog) -> Result<usize, EngineError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM dedup_queue WHERE catalog = $1",
        )
        .bind(catalog.as_str())
        .fetch_one(&self.connection)
        .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
