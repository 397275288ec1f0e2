use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("An instance already exists for series {series_id} on {instance_date}")]
    DuplicateInstance {
        series_id: String,
        instance_date: String,
    },
}

impl CoreError {
    /// True for the benign insert race: a concurrent run materialized the
    /// same (series, instance date) first.
    pub fn is_duplicate_instance(&self) -> bool {
        matches!(self, CoreError::DuplicateInstance { .. })
    }
}
