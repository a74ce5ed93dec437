use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};
use waypoint_core::types::{NotificationJobKind, UserId};

use crate::error::Result;

/// Atomically claims `(user_id, job_kind, key, fire_date)`. Returns `true`
/// when this call newly claimed the tuple (the caller should fire the
/// notification) or `false` when another call already claimed it today
/// (the notification engine's duplicate-suppression guard).
pub fn try_claim_dedup(
    conn: &Connection,
    user_id: &UserId,
    job_kind: NotificationJobKind,
    key: &str,
    fire_date: NaiveDate,
) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO notification_dedup (user_id, job_kind, key, fire_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id.as_str(),
            job_kind.to_string(),
            key,
            fire_date.format("%Y-%m-%d").to_string(),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(changed > 0)
}
