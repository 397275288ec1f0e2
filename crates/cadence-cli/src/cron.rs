//! Midnight-local cron trigger.
//!
//! Sleeps until the next local midnight in the reference timezone, runs a
//! non-dry backfill, logs the summary, repeats. A failed run is logged and
//! the loop carries on to the next tick; retry policy lives here, not in
//! the engine.

use crate::http::SharedEngine;
use chrono::{DateTime, Days, Duration, LocalResult, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{error, info};

pub async fn run_midnight_loop(engine: SharedEngine) {
    let tz = engine.config().timezone;
    loop {
        let next = next_midnight_after(Utc::now(), tz);
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        info!(next = %next, timezone = %tz, "cron sleeping until next local midnight");
        tokio::time::sleep(wait).await;

        match engine.run_backfill(false).await {
            Ok(result) => info!(
                today = %result.today_key,
                created = result.tasks_created,
                updated = result.series_updated,
                skipped = result.skipped,
                "cron backfill complete"
            ),
            Err(err) => error!("cron backfill failed: {err}"),
        }
    }
}

/// The first instant after `now` that reads as 00:00 on the next calendar
/// day in `tz`. A midnight erased by a DST jump slides forward an hour; an
/// ambiguous midnight resolves to its earlier reading.
fn next_midnight_after(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let tomorrow = now.with_timezone(&tz).date_naive() + Days::new(1);
    let midnight = tomorrow.and_hms_opt(0, 0, 0).unwrap();

    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => match tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest() {
            Some(dt) => dt.with_timezone(&Utc),
            None => now + Duration::hours(24),
        },
    }
}
