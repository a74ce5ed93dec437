//! Timezone helpers shared by the context assembler, the scheduler, and the
//! notification jobs. All storage is UTC;
//! these helpers are the only place a naive UTC instant is converted to or
//! from a user's local wall-clock time.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CoreError, Result};

/// Parse and validate an IANA timezone name (e.g. `"Europe/Moscow"`).
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CoreError::InvalidTimezone(name.to_string()))
}

/// Current instant rendered in `tz`, minute precision — matches the Context
/// Assembler's `now` slot contract.
pub fn now_in_tz(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Today's date in the user's local timezone.
pub fn today_in_tz(tz: Tz) -> NaiveDate {
    now_in_tz(tz).date_naive()
}

/// Combine a naive local date/time in `tz` into a UTC instant. Returns
/// `None` for a time that doesn't exist (spring-forward gap); callers treat
/// that as "advance to the next candidate slot" rather than erroring, since
/// DST gaps are a scheduling placement detail, not a user-facing failure.
pub fn local_to_utc(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format an instant as `YYYY-MM-DD HH:MM` in the given timezone, minute
/// precision — the exact rendering the Context Assembler's `now` slot uses.
pub fn format_minute_precision(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
