//! Stable series identity derived from a task's immutable characteristics.
//!
//! Rows created before an explicit `recurrence_series_id` column existed
//! carry no series marker, so grouping falls back to a deterministic hash
//! of the fields that define a series. Two tasks with identical values for
//! these seven fields always derive the same id.

use crate::models::Task;
use sha2::{Digest, Sha256};

const SERIES_ID_PREFIX: &str = "rec_";
const SERIES_ID_HEX_LEN: usize = 16;

/// Derive the stable series identifier for a recurrence series from the
/// template task's identity fields. Absent fields contribute an empty
/// string, so legacy rows with sparse data still group consistently.
pub fn derive_series_id(task: &Task) -> String {
    let fingerprint = [
        task.title.clone(),
        task.assigned_to_id.map(|id| id.to_string()).unwrap_or_default(),
        task.client_id.map(|id| id.to_string()).unwrap_or_default(),
        task.space_id.map(|id| id.to_string()).unwrap_or_default(),
        task.campaign_id.map(|id| id.to_string()).unwrap_or_default(),
        task.recurring_pattern.map(|p| p.to_string()).unwrap_or_default(),
        task.recurring_interval.map(|i| i.to_string()).unwrap_or_default(),
        task.schedule_from.map(|a| a.to_string()).unwrap_or_default(),
    ]
    .join("|");

    let mut hasher = Sha256::new();
    hasher.update(fingerprint.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{SERIES_ID_PREFIX}{}", &digest[..SERIES_ID_HEX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecurrencePattern, ScheduleAnchor};
    use uuid::Uuid;

    fn template() -> Task {
        Task {
            title: "Weekly client report".to_string(),
            assigned_to_id: Some(Uuid::now_v7()),
            client_id: Some(Uuid::now_v7()),
            is_recurring: true,
            recurring_pattern: Some(RecurrencePattern::Weekly),
            recurring_interval: Some(2),
            schedule_from: Some(ScheduleAnchor::DueDate),
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_fields_derive_identical_ids() {
        let a = template();
        let mut b = a.clone();
        // Fields outside the identity tuple must not affect the id.
        b.id = Uuid::now_v7();
        b.due_date = Some(chrono::Utc::now());
        b.description = Some("carried over".to_string());

        assert_eq!(derive_series_id(&a), derive_series_id(&b));
    }

    #[test]
    fn test_each_identity_field_changes_the_id() {
        let base = template();
        let base_id = derive_series_id(&base);

        let mut changed = base.clone();
        changed.title = "Monthly client report".to_string();
        assert_ne!(derive_series_id(&changed), base_id);

        let mut changed = base.clone();
        changed.assigned_to_id = Some(Uuid::now_v7());
        assert_ne!(derive_series_id(&changed), base_id);

        let mut changed = base.clone();
        changed.recurring_pattern = Some(RecurrencePattern::Monthly);
        assert_ne!(derive_series_id(&changed), base_id);

        let mut changed = base.clone();
        changed.recurring_interval = Some(3);
        assert_ne!(derive_series_id(&changed), base_id);

        let mut changed = base.clone();
        changed.schedule_from = Some(ScheduleAnchor::CompletionDate);
        assert_ne!(derive_series_id(&changed), base_id);
    }

    #[test]
    fn test_absent_fields_hash_as_empty() {
        let mut sparse = template();
        sparse.assigned_to_id = None;
        sparse.client_id = None;
        sparse.recurring_interval = None;

        let twin = sparse.clone();
        assert_eq!(derive_series_id(&sparse), derive_series_id(&twin));
    }

    #[test]
    fn test_id_shape() {
        let id = derive_series_id(&template());
        assert!(id.starts_with(SERIES_ID_PREFIX));
        assert_eq!(id.len(), SERIES_ID_PREFIX.len() + SERIES_ID_HEX_LEN);
        assert!(id[SERIES_ID_PREFIX.len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
