use crate::calendar::DateKey;
use crate::error::CoreError;
use crate::models::{NewTaskData, Task, TaskStatus};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::error::ErrorKind;
use sqlx::types::Json;
use uuid::Uuid;

#[async_trait]
impl super::TaskRepository for SqliteRepository {
    async fn list_recurring_tasks(&self) -> Result<Vec<Task>, CoreError> {
        let tasks = sqlx::query_as("SELECT * FROM tasks WHERE is_recurring = 1")
            .fetch_all(self.pool())
            .await?;
        Ok(tasks)
    }

    async fn find_by_series_key(
        &self,
        series_id: &str,
        instance_date: DateKey,
    ) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as(
            "SELECT * FROM tasks WHERE recurrence_series_id = $1 AND recurrence_instance_date = $2",
        )
        .bind(series_id)
        .bind(instance_date)
        .fetch_optional(self.pool())
        .await?;
        Ok(task)
    }

    async fn insert_task(&self, data: NewTaskData) -> Result<Task, CoreError> {
        let series_id = data.recurrence_series_id.clone();
        let instance_date = data.recurrence_instance_date;

        let result = sqlx::query_as::<_, Task>(
            r#"INSERT INTO tasks (
                id, title, description, assigned_to_id, client_id, space_id,
                campaign_id, status, due_date, completed_at, created_at,
                is_recurring, recurring_pattern, recurring_interval,
                recurring_end_date, schedule_from, checklist,
                recurrence_series_id, recurrence_instance_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *"#,
        )
        .bind(Uuid::now_v7())
        .bind(data.title)
        .bind(data.description)
        .bind(data.assigned_to_id)
        .bind(data.client_id)
        .bind(data.space_id)
        .bind(data.campaign_id)
        .bind(data.status)
        .bind(data.due_date)
        .bind(data.completed_at)
        .bind(Utc::now())
        .bind(data.is_recurring)
        .bind(data.recurring_pattern)
        .bind(data.recurring_interval)
        .bind(data.recurring_end_date)
        .bind(data.schedule_from)
        .bind(Json(data.checklist))
        .bind(data.recurrence_series_id)
        .bind(data.recurrence_instance_date)
        .fetch_one(self.pool())
        .await;

        match result {
            Ok(task) => Ok(task),
            Err(sqlx::Error::Database(db_err))
                if matches!(db_err.kind(), ErrorKind::UniqueViolation) =>
            {
                Err(CoreError::DuplicateInstance {
                    series_id: series_id.unwrap_or_default(),
                    instance_date: instance_date.map(|d| d.to_string()).unwrap_or_default(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_task_series_fields(
        &self,
        task_id: Uuid,
        series_id: &str,
        instance_date: DateKey,
    ) -> Result<(), CoreError> {
        let result = sqlx::query(
            "UPDATE tasks SET recurrence_series_id = $1, recurrence_instance_date = $2 WHERE id = $3",
        )
        .bind(series_id)
        .bind(instance_date)
        .bind(task_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(task_id.to_string()));
        }
        Ok(())
    }

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(task)
    }

    async fn complete_task(&self, id: Uuid) -> Result<Task, CoreError> {
        let task = sqlx::query_as(
            r#"UPDATE tasks
            SET status = $1, completed_at = $2
            WHERE id = $3
            RETURNING *"#,
        )
        .bind(TaskStatus::Completed)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        Ok(task)
    }
}
