use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use waypoint_core::types::{EventType, UserId};

use crate::error::{Result, StoreError};
use crate::models::{Event, EventPatch, NewEvent};

pub fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let date: String = row.get("date")?;
    let time: Option<String> = row.get("time")?;
    let event_type: String = row.get("event_type")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(Event {
        event_id: row.get("event_id")?,
        user_id: UserId(row.get("user_id")?),
        title: row.get("title")?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
        time: time.and_then(|t| NaiveTime::parse_from_str(&t, "%H:%M:%S").ok()),
        duration_minutes: row.get("duration_minutes")?,
        repeat: row.get("repeat")?,
        notes: row.get("notes")?,
        event_type: event_type.parse().unwrap_or(EventType::User),
        linked_step_id: row.get("linked_step_id")?,
        linked_goal_id: row.get("linked_goal_id")?,
        reminder_minutes_before: row.get("reminder_minutes_before")?,
        reminder_enabled: row.get::<_, i64>("reminder_enabled")? != 0,
        created_at: created_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
    })
}

pub fn get_event(conn: &Connection, user_id: &UserId, event_id: i64) -> Result<Option<Event>> {
    conn.query_row(
        "SELECT * FROM events WHERE event_id = ?1 AND user_id = ?2",
        params![event_id, user_id.as_str()],
        row_to_event,
    )
    .optional()
    .map_err(Into::into)
}

/// `event.search`: ascending `(date, time NULLS
/// LAST, event_id)` — the tie-break order the dispatcher contracts to.
pub fn list_events(
    conn: &Connection,
    user_id: &UserId,
    title_like: Option<&str>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    time_from: Option<NaiveTime>,
    time_to: Option<NaiveTime>,
) -> Result<Vec<Event>> {
    let mut sql = String::from("SELECT * FROM events WHERE user_id = ?1");
    let mut idx = 2;
    let mut bind_title = None;
    let mut bind_date_from = None;
    let mut bind_date_to = None;
    let mut bind_time_from = None;
    let mut bind_time_to = None;

    if let Some(t) = title_like {
        sql.push_str(&format!(" AND title LIKE ?{}", idx));
        bind_title = Some(format!("%{}%", t));
        idx += 1;
    }
    if let Some(d) = date_from {
        sql.push_str(&format!(" AND date >= ?{}", idx));
        bind_date_from = Some(d.format("%Y-%m-%d").to_string());
        idx += 1;
    }
    if let Some(d) = date_to {
        sql.push_str(&format!(" AND date <= ?{}", idx));
        bind_date_to = Some(d.format("%Y-%m-%d").to_string());
        idx += 1;
    }
    if let Some(t) = time_from {
        sql.push_str(&format!(" AND (time IS NULL OR time >= ?{})", idx));
        bind_time_from = Some(t.format("%H:%M:%S").to_string());
        idx += 1;
    }
    if let Some(t) = time_to {
        sql.push_str(&format!(" AND (time IS NULL OR time <= ?{})", idx));
        bind_time_to = Some(t.format("%H:%M:%S").to_string());
        idx += 1;
    }
    let _ = idx;
    sql.push_str(" ORDER BY date ASC, time IS NULL, time ASC, event_id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut raw_params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.as_str().to_string())];
    for v in [
        bind_title,
        bind_date_from,
        bind_date_to,
        bind_time_from,
        bind_time_to,
    ]
    .into_iter()
    .flatten()
    {
        raw_params.push(Box::new(v));
    }
    let param_refs: Vec<&dyn rusqlite::ToSql> = raw_params.iter().map(|b| b.as_ref()).collect();
    let events = stmt
        .query_map(param_refs.as_slice(), row_to_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

pub fn create_event(conn: &Connection, user_id: &UserId, event: NewEvent) -> Result<Event> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO events
            (user_id, title, date, time, duration_minutes, repeat, notes,
             event_type, reminder_minutes_before, reminder_enabled, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'user', ?8, ?9, ?10, ?10)",
        params![
            user_id.as_str(),
            event.title,
            event.date.format("%Y-%m-%d").to_string(),
            event.time.map(|t| t.format("%H:%M:%S").to_string()),
            event.duration_minutes,
            event.repeat,
            event.notes,
            event.reminder_minutes_before,
            event.reminder_enabled as i64,
            now,
        ],
    )?;
    let event_id = conn.last_insert_rowid();
    get_event(conn, user_id, event_id)?
        .ok_or_else(|| StoreError::Constraint("event insert did not persist".into()))
}

/// Applies `patch`; when the event is `event_type=goal_step`, keeps the
/// linked step's `planned_date`/`planned_time` in sync in the same
/// transaction (`event.mutate { op: update }`).
pub fn update_event(
    conn: &mut Connection,
    user_id: &UserId,
    event_id: i64,
    patch: EventPatch,
) -> Result<Event> {
    let tx = conn.transaction()?;
    let existing = tx
        .query_row(
            "SELECT * FROM events WHERE event_id = ?1 AND user_id = ?2",
            params![event_id, user_id.as_str()],
            row_to_event,
        )
        .optional()?
        .ok_or(StoreError::EventNotFound { event_id })?;

    let new_title = patch.title.unwrap_or(existing.title);
    let new_date = patch.date.unwrap_or(existing.date);
    let new_time = patch.time.unwrap_or(existing.time);
    let new_duration = patch.duration_minutes.unwrap_or(existing.duration_minutes);
    let new_notes = patch.notes.unwrap_or(existing.notes);

    tx.execute(
        "UPDATE events SET title = ?1, date = ?2, time = ?3, duration_minutes = ?4, notes = ?5, updated_at = ?6
         WHERE event_id = ?7",
        params![
            new_title,
            new_date.format("%Y-%m-%d").to_string(),
            new_time.map(|t| t.format("%H:%M:%S").to_string()),
            new_duration,
            new_notes,
            Utc::now().to_rfc3339(),
            event_id,
        ],
    )?;

    if let Some(step_id) = existing.linked_step_id {
        tx.execute(
            "UPDATE steps SET planned_date = ?1, planned_time = ?2, duration_minutes = ?3
             WHERE step_id = ?4",
            params![
                new_date.format("%Y-%m-%d").to_string(),
                new_time.map(|t| t.format("%H:%M:%S").to_string()),
                new_duration,
                step_id,
            ],
        )?;
    }

    let updated = tx
        .query_row(
            "SELECT * FROM events WHERE event_id = ?1",
            params![event_id],
            row_to_event,
        )
        .optional()?
        .ok_or(StoreError::EventNotFound { event_id })?;
    tx.commit()?;
    Ok(updated)
}

/// Deletes an event and clears the step side of the link in the same
/// transaction.
pub fn delete_event(conn: &mut Connection, user_id: &UserId, event_id: i64) -> Result<bool> {
    let tx = conn.transaction()?;
    let exists = tx
        .query_row(
            "SELECT 1 FROM events WHERE event_id = ?1 AND user_id = ?2",
            params![event_id, user_id.as_str()],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !exists {
        tx.commit()?;
        return Ok(false);
    }
    tx.execute(
        "UPDATE steps SET linked_event_id = NULL WHERE linked_event_id = ?1",
        params![event_id],
    )?;
    tx.execute(
        "DELETE FROM events WHERE event_id = ?1 AND user_id = ?2",
        params![event_id, user_id.as_str()],
    )?;
    tx.commit()?;
    Ok(true)
}

pub fn list_upcoming_events(
    conn: &Connection,
    user_id: &UserId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM events WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
         ORDER BY date ASC, time IS NULL, time ASC, event_id ASC",
    )?;
    let events = stmt
        .query_map(
            params![
                user_id.as_str(),
                from.format("%Y-%m-%d").to_string(),
                to.format("%Y-%m-%d").to_string()
            ],
            row_to_event,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// Busy `(start, end)` wall-clock intervals on `date` — feeds the Scheduler's
/// availability map (Phase 2). All-day events (no `time`)
/// occupy the whole day.
pub fn list_busy_intervals(
    conn: &Connection,
    user_id: &UserId,
    date: NaiveDate,
) -> Result<Vec<(NaiveTime, NaiveTime)>> {
    let mut stmt = conn.prepare(
        "SELECT time, duration_minutes FROM events WHERE user_id = ?1 AND date = ?2",
    )?;
    let rows = stmt
        .query_map(
            params![user_id.as_str(), date.format("%Y-%m-%d").to_string()],
            |r| {
                Ok((
                    r.get::<_, Option<String>>(0)?,
                    r.get::<_, i64>(1)?,
                ))
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut intervals = Vec::with_capacity(rows.len());
    for (time, duration) in rows {
        let start = match time.and_then(|t| NaiveTime::parse_from_str(&t, "%H:%M:%S").ok()) {
            Some(t) => t,
            None => {
                intervals.push((
                    NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
                ));
                continue;
            }
        };
        let end = start + chrono::Duration::minutes(duration);
        intervals.push((start, end));
    }
    Ok(intervals)
}

pub fn list_due_event_reminders(
    conn: &Connection,
    user_id: &UserId,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<Event>> {
    // Candidates are narrowed to the two calendar days the window can touch,
    // then filtered precisely in Rust once combined with the user's
    // timezone by the caller (the store has no timezone context of its own).
    let mut stmt = conn.prepare(
        "SELECT * FROM events WHERE user_id = ?1 AND reminder_enabled = 1
         AND time IS NOT NULL AND date BETWEEN ?2 AND ?3
         ORDER BY date ASC, time ASC",
    )?;
    let events = stmt
        .query_map(
            params![
                user_id.as_str(),
                window_start.format("%Y-%m-%d").to_string(),
                window_end.format("%Y-%m-%d").to_string()
            ],
            row_to_event,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}
