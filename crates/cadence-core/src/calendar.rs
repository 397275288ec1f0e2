use crate::error::CoreError;
use crate::models::RecurrencePattern;
use chrono::{DateTime, Days, Duration, LocalResult, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A calendar day in a series' reference timezone, rendered `YYYY-MM-DD`.
/// This is the stable join key between a task instance and the day it
/// represents, independent of the clock time stored on the row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct DateKey(pub NaiveDate);

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid date key: {0}")]
pub struct ParseDateKeyError(String);

impl FromStr for DateKey {
    type Err = ParseDateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(DateKey)
            .map_err(|_| ParseDateKeyError(s.to_string()))
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        DateKey(date)
    }
}

/// Validate and parse an IANA timezone name.
pub fn parse_timezone(timezone: &str) -> Result<Tz, CoreError> {
    timezone
        .parse::<Tz>()
        .map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// The calendar date `instant` falls on when viewed in `tz`.
pub fn date_key_of(instant: DateTime<Utc>, tz: Tz) -> DateKey {
    DateKey(instant.with_timezone(&tz).date_naive())
}

/// Advance a date-key by `interval` periods of `pattern`.
///
/// The key is re-anchored at local noon before stepping so the arithmetic
/// never lands inside a DST gap. Monthly and yearly steps follow chrono's
/// calendar-add semantics (Jan 31 + 1 month = Feb 28/29). The interval is
/// clamped to a minimum of 1.
pub fn advance_date_key(
    key: DateKey,
    pattern: RecurrencePattern,
    interval: i64,
) -> Result<DateKey, CoreError> {
    let interval = interval.max(1) as u64;
    let noon = key.0.and_hms_opt(12, 0, 0).unwrap();

    let stepped = match pattern {
        RecurrencePattern::Daily => noon.checked_add_days(Days::new(interval)),
        RecurrencePattern::Weekly => noon.checked_add_days(Days::new(interval * 7)),
        RecurrencePattern::Monthly => u32::try_from(interval)
            .ok()
            .and_then(|months| noon.checked_add_months(Months::new(months))),
        RecurrencePattern::Yearly => u32::try_from(interval * 12)
            .ok()
            .and_then(|months| noon.checked_add_months(Months::new(months))),
    }
    .ok_or_else(|| {
        CoreError::InvalidInput(format!(
            "cannot advance {key} by {interval} {pattern} period(s)"
        ))
    })?;

    Ok(DateKey(stepped.date()))
}

/// The date-key `interval` periods of `pattern` after `base`, evaluated
/// in `tz`.
pub fn next_date_key(
    pattern: RecurrencePattern,
    interval: i64,
    base: DateTime<Utc>,
    tz: Tz,
) -> Result<DateKey, CoreError> {
    advance_date_key(date_key_of(base, tz), pattern, interval)
}

/// The instant corresponding to 23:59:59.999 local time on `key` in `tz`.
/// This is the canonical due date stamped onto generated instances.
pub fn end_of_day_instant(key: DateKey, tz: Tz) -> DateTime<Utc> {
    let local = key.0.and_hms_milli_opt(23, 59, 59, 999).unwrap();
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        // Clock rolled back: the later reading still falls on the key's day.
        LocalResult::Ambiguous(_, latest) => latest.with_timezone(&Utc),
        LocalResult::None => {
            // Nonexistent local time; retry an hour earlier.
            let adjusted = local - Duration::hours(1);
            match tz.from_local_datetime(&adjusted).earliest() {
                Some(dt) => dt.with_timezone(&Utc),
                None => Utc.from_utc_datetime(&local),
            }
        }
    }
}
