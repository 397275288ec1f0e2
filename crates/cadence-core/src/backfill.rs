//! Backfill engine: ensures exactly one current instance exists per
//! recurrence series.
//!
//! The engine is a sequential loop over series, safe to invoke from the
//! cron tick and the admin trigger at the same time. The existence check
//! before insert is an optimization; the repository's uniqueness
//! constraint on (series id, instance date) is the actual correctness
//! guarantee, and a losing insert surfaces as a benign skip.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calendar::{self, DateKey};
use crate::error::CoreError;
use crate::identity::derive_series_id;
use crate::models::{
    ChecklistItem, NewTaskData, RecurrencePattern, ScheduleAnchor, Task, TaskStatus,
};
use crate::repository::TaskRepository;

/// Source of "now", injected so tests can pin the run to a fixed instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Policy knobs for a backfill run.
#[derive(Debug, Clone)]
pub struct BackfillConfig {
    /// Reference timezone all date-keys are evaluated in.
    pub timezone: Tz,
    /// When set, targets past the series' `recurring_end_date` are skipped
    /// instead of materialized. Off by default; the end date is advisory.
    pub enforce_end_date: bool,
    /// Upper bound on interval steps when walking a dormant series forward
    /// to the first key on or after today.
    pub max_catchup_steps: u32,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            enforce_end_date: false,
            max_catchup_steps: 400,
        }
    }
}

/// Aggregate counts for one backfill run. Serializes to the JSON shape the
/// admin trigger returns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillResult {
    pub today_key: DateKey,
    pub series_processed: usize,
    pub series_updated: usize,
    pub tasks_created: usize,
    pub skipped: usize,
}

impl BackfillResult {
    fn new(today_key: DateKey) -> Self {
        Self {
            today_key,
            series_processed: 0,
            series_updated: 0,
            tasks_created: 0,
            skipped: 0,
        }
    }
}

/// Orchestrator for recurring-task materialization.
///
/// Holds the repository and clock as explicit collaborators; the engine
/// itself keeps no state between runs.
pub struct BackfillEngine<R> {
    repo: R,
    clock: Arc<dyn Clock>,
    config: BackfillConfig,
}

impl<R: TaskRepository> BackfillEngine<R> {
    pub fn new(repo: R, clock: Arc<dyn Clock>, config: BackfillConfig) -> Self {
        Self { repo, clock, config }
    }

    pub fn config(&self) -> &BackfillConfig {
        &self.config
    }

    /// Ensure exactly one current instance exists per recurrence series.
    ///
    /// Loads every task flagged recurring, groups them into series, and
    /// materializes the missing current instance per series. With `dry_run`
    /// all computation and counting happens but no write is issued, so the
    /// returned counts preview what a real run would do.
    pub async fn run_backfill(&self, dry_run: bool) -> Result<BackfillResult, CoreError> {
        let today = calendar::date_key_of(self.clock.now(), self.config.timezone);
        let series = group_into_series(self.repo.list_recurring_tasks().await?);

        let mut result = BackfillResult::new(today);
        result.series_processed = series.len();

        for (series_id, members) in &series {
            match self.process_series(series_id, members, today, dry_run, &mut result).await {
                Ok(()) => {}
                // A concurrent run materialized this instance first.
                Err(err) if err.is_duplicate_instance() => {
                    debug!(series = %series_id, "lost insert race; instance already exists");
                    result.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            today = %result.today_key,
            processed = result.series_processed,
            updated = result.series_updated,
            created = result.tasks_created,
            skipped = result.skipped,
            dry_run,
            "backfill run finished"
        );
        Ok(result)
    }

    async fn process_series(
        &self,
        series_id: &str,
        members: &[Task],
        today: DateKey,
        dry_run: bool,
        result: &mut BackfillResult,
    ) -> Result<(), CoreError> {
        let tz = self.config.timezone;
        let Some(template) = select_template(members) else {
            result.skipped += 1;
            return Ok(());
        };
        let pattern = template.recurring_pattern.unwrap_or(RecurrencePattern::Daily);
        let interval = template.recurring_interval.unwrap_or(1).max(1);
        let anchor = template.schedule_from.unwrap_or(ScheduleAnchor::DueDate);

        let target = match pattern {
            RecurrencePattern::Daily => self.daily_target(members, interval, today)?,
            _ => self.catchup_target(series_id, members, pattern, interval, anchor, today)?,
        };

        let Some(target) = target else {
            result.skipped += 1;
            return Ok(());
        };

        if self.config.enforce_end_date {
            if let Some(end) = template.recurring_end_date {
                if target > calendar::date_key_of(end, tz) {
                    debug!(series = %series_id, %target, "target falls past the series end date");
                    result.skipped += 1;
                    return Ok(());
                }
            }
        }

        if self.repo.find_by_series_key(series_id, target).await?.is_some() {
            debug!(series = %series_id, %target, "instance already exists");
            result.skipped += 1;
            return Ok(());
        }

        // Legacy rows predate the explicit series columns; stamp the
        // template so future runs take the fast id path.
        if template.recurrence_series_id.is_none() || template.recurrence_instance_date.is_none() {
            if !dry_run {
                let template_key = member_instance_key(template, tz);
                self.repo
                    .update_task_series_fields(template.id, series_id, template_key)
                    .await?;
            }
            result.series_updated += 1;
        }

        if !dry_run {
            self.repo
                .insert_task(new_instance(template, series_id, target, pattern, interval, tz))
                .await?;
        }
        result.tasks_created += 1;
        debug!(series = %series_id, %target, dry_run, "materialized instance");
        Ok(())
    }

    /// Target date-key for a daily series, or None when today's instance is
    /// already open.
    fn daily_target(
        &self,
        members: &[Task],
        interval: i64,
        today: DateKey,
    ) -> Result<Option<DateKey>, CoreError> {
        let tz = self.config.timezone;
        let mut today_exists = false;
        for member in members {
            if member_instance_key(member, tz) == today {
                if member.status != TaskStatus::Completed {
                    return Ok(None);
                }
                today_exists = true;
            }
        }

        if today_exists {
            // Today's instance is done; schedule the next one from the end
            // of today.
            let base = calendar::end_of_day_instant(today, tz);
            Ok(Some(calendar::next_date_key(RecurrencePattern::Daily, interval, base, tz)?))
        } else {
            // Catch-up: first run after series creation, or a gap.
            Ok(Some(today))
        }
    }

    /// Target date-key for weekly/monthly/yearly series: walk forward from
    /// the latest known key in whole-interval jumps until reaching today.
    /// Returns None when an open instance already covers today or later, or
    /// when the safety bound trips.
    fn catchup_target(
        &self,
        series_id: &str,
        members: &[Task],
        pattern: RecurrencePattern,
        interval: i64,
        anchor: ScheduleAnchor,
        today: DateKey,
    ) -> Result<Option<DateKey>, CoreError> {
        let tz = self.config.timezone;
        if members
            .iter()
            .any(|m| m.status != TaskStatus::Completed && member_instance_key(m, tz) >= today)
        {
            return Ok(None);
        }

        let completion_base = match anchor {
            ScheduleAnchor::CompletionDate => members
                .iter()
                .filter(|m| m.status == TaskStatus::Completed)
                .filter_map(|m| m.completed_at)
                .max()
                .map(|completed| calendar::date_key_of(completed, tz)),
            ScheduleAnchor::DueDate => None,
        };
        let Some(base) = completion_base
            .or_else(|| members.iter().map(|m| member_instance_key(m, tz)).max())
        else {
            return Ok(None);
        };

        let mut target = base;
        let mut steps = 0;
        while target < today {
            if steps >= self.config.max_catchup_steps {
                warn!(
                    series = %series_id,
                    %base,
                    %pattern,
                    interval,
                    max_steps = self.config.max_catchup_steps,
                    "catch-up walk exceeded the step bound; skipping series this run"
                );
                return Ok(None);
            }
            target = calendar::advance_date_key(target, pattern, interval)?;
            steps += 1;
        }

        Ok(Some(target))
    }
}

/// Group tasks by explicit series id, falling back to the derived identity
/// for legacy rows.
fn group_into_series(tasks: Vec<Task>) -> BTreeMap<String, Vec<Task>> {
    let mut series: BTreeMap<String, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        let id = task
            .recurrence_series_id
            .clone()
            .unwrap_or_else(|| derive_series_id(&task));
        series.entry(id).or_default().push(task);
    }
    series
}

/// The member with the most recent due date (ties broken by creation time)
/// supplies the recurrence policy and content for new instances.
fn select_template(members: &[Task]) -> Option<&Task> {
    members.iter().max_by_key(|t| (t.due_date, t.created_at))
}

/// The calendar day an existing member row represents: its explicit
/// instance date when stamped, else derived from its timestamps.
fn member_instance_key(task: &Task, tz: Tz) -> DateKey {
    task.recurrence_instance_date
        .or_else(|| task.due_date.map(|due| calendar::date_key_of(due, tz)))
        .or_else(|| task.completed_at.map(|done| calendar::date_key_of(done, tz)))
        .unwrap_or_else(|| calendar::date_key_of(task.created_at, tz))
}

fn new_instance(
    template: &Task,
    series_id: &str,
    target: DateKey,
    pattern: RecurrencePattern,
    interval: i64,
    tz: Tz,
) -> NewTaskData {
    let checklist = template
        .checklist
        .iter()
        .map(|item| ChecklistItem {
            text: item.text.clone(),
            completed: false,
        })
        .collect();

    NewTaskData {
        title: template.title.clone(),
        description: template.description.clone(),
        assigned_to_id: template.assigned_to_id,
        client_id: template.client_id,
        space_id: template.space_id,
        campaign_id: template.campaign_id,
        status: TaskStatus::Todo,
        due_date: Some(calendar::end_of_day_instant(target, tz)),
        completed_at: None,
        is_recurring: true,
        recurring_pattern: Some(pattern),
        recurring_interval: Some(interval),
        recurring_end_date: template.recurring_end_date,
        schedule_from: template.schedule_from,
        checklist,
        recurrence_series_id: Some(series_id.to_string()),
        recurrence_instance_date: Some(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn tz() -> Tz {
        "America/New_York".parse().unwrap()
    }

    fn recurring(title: &str, due: Option<DateTime<Utc>>) -> Task {
        Task {
            title: title.to_string(),
            is_recurring: true,
            recurring_pattern: Some(RecurrencePattern::Weekly),
            recurring_interval: Some(1),
            due_date: due,
            ..Default::default()
        }
    }

    #[test]
    fn test_grouping_uses_explicit_id_over_derived() {
        let mut stamped = recurring("Report", None);
        stamped.recurrence_series_id = Some("rec_aaaaaaaaaaaaaaaa".to_string());
        let legacy = recurring("Report", None);

        let series = group_into_series(vec![stamped, legacy]);
        assert_eq!(series.len(), 2);
        assert!(series.contains_key("rec_aaaaaaaaaaaaaaaa"));
    }

    #[test]
    fn test_legacy_twins_group_together() {
        let a = recurring("Report", None);
        let mut b = recurring("Report", None);
        b.id = Uuid::now_v7();

        let series = group_into_series(vec![a, b]);
        assert_eq!(series.len(), 1);
        assert_eq!(series.values().next().unwrap().len(), 2);
    }

    #[test]
    fn test_template_is_latest_due_then_latest_created() {
        let now = Utc::now();
        let older = recurring("Report", Some(now - Duration::days(14)));
        let newer = recurring("Report", Some(now - Duration::days(7)));
        let newer_id = newer.id;

        let members = vec![older, newer];
        assert_eq!(select_template(&members).unwrap().id, newer_id);

        // Missing due dates sort below any present due date.
        let undated = recurring("Report", None);
        let dated = recurring("Report", Some(now));
        let dated_id = dated.id;
        let members = vec![undated, dated];
        assert_eq!(select_template(&members).unwrap().id, dated_id);
    }

    #[test]
    fn test_member_key_fallback_chain() {
        let due = "2026-01-05T15:00:00Z".parse().unwrap();
        let completed = "2026-01-03T15:00:00Z".parse().unwrap();

        let mut task = recurring("Report", Some(due));
        task.completed_at = Some(completed);
        task.recurrence_instance_date = Some("2026-01-01".parse().unwrap());
        assert_eq!(member_instance_key(&task, tz()), "2026-01-01".parse().unwrap());

        task.recurrence_instance_date = None;
        assert_eq!(member_instance_key(&task, tz()), "2026-01-05".parse().unwrap());

        task.due_date = None;
        assert_eq!(member_instance_key(&task, tz()), "2026-01-03".parse().unwrap());

        task.completed_at = None;
        assert_eq!(member_instance_key(&task, tz()), calendar::date_key_of(task.created_at, tz()));
    }

    #[test]
    fn test_new_instance_resets_checklist_and_stamps_series() {
        let mut template = recurring("Report", Some(Utc::now()));
        template.checklist = Json(vec![
            ChecklistItem { text: "outline".to_string(), completed: true },
            ChecklistItem { text: "send".to_string(), completed: false },
        ]);

        let target: DateKey = "2026-01-19".parse().unwrap();
        let data = new_instance(&template, "rec_abc", target, RecurrencePattern::Weekly, 2, tz());

        assert_eq!(data.status, TaskStatus::Todo);
        assert_eq!(data.completed_at, None);
        assert_eq!(data.recurrence_series_id.as_deref(), Some("rec_abc"));
        assert_eq!(data.recurrence_instance_date, Some(target));
        assert_eq!(data.due_date, Some(calendar::end_of_day_instant(target, tz())));
        assert!(data.checklist.iter().all(|item| !item.completed));
        assert_eq!(data.checklist.len(), 2);
    }
}
