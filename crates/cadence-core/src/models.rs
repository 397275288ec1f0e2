use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::calendar::DateKey;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "todo"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task status: {0}")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(ParseTaskStatusError(s.to_string())),
        }
    }
}

/// Recurrence cadence of a series. The interval multiplier on the task row
/// scales each pattern (e.g. weekly with interval 2 = every two weeks).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl std::fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecurrencePattern::Daily => write!(f, "daily"),
            RecurrencePattern::Weekly => write!(f, "weekly"),
            RecurrencePattern::Monthly => write!(f, "monthly"),
            RecurrencePattern::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid recurrence pattern: {0}")]
pub struct ParseRecurrencePatternError(String);

impl FromStr for RecurrencePattern {
    type Err = ParseRecurrencePatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(RecurrencePattern::Daily),
            "weekly" => Ok(RecurrencePattern::Weekly),
            "monthly" => Ok(RecurrencePattern::Monthly),
            "yearly" => Ok(RecurrencePattern::Yearly),
            _ => Err(ParseRecurrencePatternError(s.to_string())),
        }
    }
}

/// Which instant anchors the next-instance computation: the instance's own
/// due date, or the moment the previous instance was completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleAnchor {
    DueDate,
    CompletionDate,
}

impl std::fmt::Display for ScheduleAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleAnchor::DueDate => write!(f, "due_date"),
            ScheduleAnchor::CompletionDate => write!(f, "completion_date"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid schedule anchor: {0}")]
pub struct ParseScheduleAnchorError(String);

impl FromStr for ScheduleAnchor {
    type Err = ParseScheduleAnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "due_date" => Ok(ScheduleAnchor::DueDate),
            "completion_date" => Ok(ScheduleAnchor::CompletionDate),
            _ => Err(ParseScheduleAnchorError(s.to_string())),
        }
    }
}

/// One checklist entry carried on a task. New instances copy the template's
/// checklist with every `completed` flag reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub space_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Marks membership in a recurrence series.
    pub is_recurring: bool,
    pub recurring_pattern: Option<RecurrencePattern>,
    pub recurring_interval: Option<i64>,
    /// Carried onto generated instances; enforcement is a policy toggle.
    pub recurring_end_date: Option<DateTime<Utc>>,
    pub schedule_from: Option<ScheduleAnchor>,
    pub checklist: Json<Vec<ChecklistItem>>,
    /// Stable series identifier. Legacy rows created before this column
    /// existed are grouped by the derived identity instead, and the best
    /// template row gets both fields stamped on the next backfill run.
    pub recurrence_series_id: Option<String>,
    /// Calendar date-key this instance represents, in the series' reference
    /// timezone.
    pub recurrence_instance_date: Option<DateKey>,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7(),
            title: String::new(),
            description: None,
            assigned_to_id: None,
            client_id: None,
            space_id: None,
            campaign_id: None,
            status: TaskStatus::Todo,
            due_date: None,
            completed_at: None,
            created_at: Utc::now(),
            is_recurring: false,
            recurring_pattern: None,
            recurring_interval: None,
            recurring_end_date: None,
            schedule_from: None,
            checklist: Json(Vec::new()),
            recurrence_series_id: None,
            recurrence_instance_date: None,
        }
    }
}

/// Fields for inserting a task row. Storage assigns `id` and `created_at`.
#[derive(Debug, Clone, Default)]
pub struct NewTaskData {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub space_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<RecurrencePattern>,
    pub recurring_interval: Option<i64>,
    pub recurring_end_date: Option<DateTime<Utc>>,
    pub schedule_from: Option<ScheduleAnchor>,
    pub checklist: Vec<ChecklistItem>,
    pub recurrence_series_id: Option<String>,
    pub recurrence_instance_date: Option<DateKey>,
}
