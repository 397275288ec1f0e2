use crate::calendar::DateKey;
use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{NewTaskData, Task};
use async_trait::async_trait;
use uuid::Uuid;

pub mod tasks;

/// Data access the backfill engine consumes. The wider CRM owns the rest of
/// the task surface; the engine only reads recurring rows and appends
/// instances.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks flagged as members of a recurrence series.
    async fn list_recurring_tasks(&self) -> Result<Vec<Task>, CoreError>;

    /// The instance of `series_id` representing `instance_date`, if any.
    async fn find_by_series_key(
        &self,
        series_id: &str,
        instance_date: DateKey,
    ) -> Result<Option<Task>, CoreError>;

    /// Insert a task row. Fails with [`CoreError::DuplicateInstance`] when
    /// the (series id, instance date) pair already exists.
    async fn insert_task(&self, data: NewTaskData) -> Result<Task, CoreError>;

    /// Stamp the series id and instance date onto a legacy row.
    async fn update_task_series_fields(
        &self,
        task_id: Uuid,
        series_id: &str,
        instance_date: DateKey,
    ) -> Result<(), CoreError>;

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError>;

    /// Mark a task completed, setting `completed_at` to now.
    async fn complete_task(&self, id: Uuid) -> Result<Task, CoreError>;
}

/// SQLite implementation of the repository pattern. Cloning shares the
/// underlying connection pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}
