use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use waypoint_core::types::{StepStatus, UserId};

use crate::error::{Result, StoreError};
use crate::models::{Goal, Step, StepFieldPatch};

pub fn row_to_step(row: &Row) -> rusqlite::Result<Step> {
    let status: String = row.get("status")?;
    let completed_at: Option<String> = row.get("completed_at")?;
    let planned_date: Option<String> = row.get("planned_date")?;
    let planned_time: Option<String> = row.get("planned_time")?;
    Ok(Step {
        step_id: row.get("step_id")?,
        goal_id: row.get("goal_id")?,
        user_id: UserId(row.get("user_id")?),
        title: row.get("title")?,
        order: row.get("order")?,
        status: status.parse().unwrap_or(StepStatus::Pending),
        estimated_hours: row.get("estimated_hours")?,
        completed_at: completed_at.and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        planned_date: planned_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        planned_time: planned_time.and_then(|t| NaiveTime::parse_from_str(&t, "%H:%M:%S").ok()),
        duration_minutes: row.get("duration_minutes")?,
        linked_event_id: row.get("linked_event_id")?,
    })
}

pub fn list_steps(conn: &Connection, user_id: &UserId, goal_id: i64) -> Result<Vec<Step>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM steps WHERE goal_id = ?1 AND user_id = ?2 ORDER BY \"order\" ASC",
    )?;
    let steps = stmt
        .query_map(params![goal_id, user_id.as_str()], row_to_step)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(steps)
}

pub fn get_step(conn: &Connection, user_id: &UserId, step_id: i64) -> Result<Option<Step>> {
    conn.query_row(
        "SELECT * FROM steps WHERE step_id = ?1 AND user_id = ?2",
        params![step_id, user_id.as_str()],
        row_to_step,
    )
    .optional()
    .map_err(Into::into)
}

pub fn list_unscheduled_steps(
    conn: &Connection,
    user_id: &UserId,
    goal_id: i64,
) -> Result<Vec<Step>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM steps WHERE goal_id = ?1 AND user_id = ?2 AND planned_date IS NULL
         ORDER BY \"order\" ASC",
    )?;
    let steps = stmt
        .query_map(params![goal_id, user_id.as_str()], row_to_step)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(steps)
}

pub fn list_overdue_steps(
    conn: &Connection,
    user_id: &UserId,
    today: NaiveDate,
) -> Result<Vec<Step>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM steps WHERE user_id = ?1
         AND status IN ('pending', 'in_progress')
         AND planned_date IS NOT NULL AND planned_date < ?2
         ORDER BY goal_id ASC, \"order\" ASC",
    )?;
    let steps = stmt
        .query_map(
            params![user_id.as_str(), today.format("%Y-%m-%d").to_string()],
            row_to_step,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(steps)
}

pub fn add_step(
    conn: &mut Connection,
    user_id: &UserId,
    goal_id: i64,
    title: &str,
    order: Option<i64>,
    planned_date: Option<NaiveDate>,
    planned_time: Option<NaiveTime>,
) -> Result<Step> {
    let tx = conn.transaction()?;

    tx.query_row(
        "SELECT 1 FROM goals WHERE goal_id = ?1 AND user_id = ?2",
        params![goal_id, user_id.as_str()],
        |_| Ok(()),
    )
    .optional()?
    .ok_or(StoreError::GoalNotFound { goal_id })?;

    // Unspecified order defaults to max(order)+1 within the goal.
    let resolved_order = match order {
        Some(o) => o,
        None => {
            let max: Option<i64> = tx.query_row(
                "SELECT MAX(\"order\") FROM steps WHERE goal_id = ?1",
                params![goal_id],
                |r| r.get(0),
            )?;
            max.unwrap_or(0) + 1
        }
    };

    tx.execute(
        "INSERT INTO steps (goal_id, user_id, title, \"order\", status, planned_date, planned_time)
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6)",
        params![
            goal_id,
            user_id.as_str(),
            title,
            resolved_order,
            planned_date.map(|d| d.format("%Y-%m-%d").to_string()),
            planned_time.map(|t| t.format("%H:%M:%S").to_string()),
        ],
    )?;
    let step_id = tx.last_insert_rowid();

    if let Some(date) = planned_date {
        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO events
                (user_id, title, date, time, duration_minutes, event_type,
                 linked_step_id, linked_goal_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 60, 'goal_step', ?5, ?6, ?7, ?7)",
            params![
                user_id.as_str(),
                title,
                date.format("%Y-%m-%d").to_string(),
                planned_time.map(|t| t.format("%H:%M:%S").to_string()),
                step_id,
                goal_id,
                now,
            ],
        )?;
        let event_id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE steps SET linked_event_id = ?1 WHERE step_id = ?2",
            params![event_id, step_id],
        )?;
    }

    let step = tx
        .query_row(
            "SELECT * FROM steps WHERE step_id = ?1",
            params![step_id],
            row_to_step,
        )
        .optional()?
        .ok_or_else(|| StoreError::Constraint("step insert did not persist".into()))?;

    tx.commit()?;
    Ok(step)
}

pub fn delete_step_cascade(conn: &mut Connection, user_id: &UserId, step_id: i64) -> Result<bool> {
    let tx = conn.transaction()?;
    let row = tx
        .query_row(
            "SELECT goal_id, linked_event_id FROM steps WHERE step_id = ?1 AND user_id = ?2",
            params![step_id, user_id.as_str()],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, Option<i64>>(1)?)),
        )
        .optional()?;
    let Some((goal_id, linked_event_id)) = row else {
        tx.commit()?;
        return Ok(false);
    };

    if let Some(event_id) = linked_event_id {
        tx.execute("DELETE FROM events WHERE event_id = ?1", params![event_id])?;
    }
    tx.execute(
        "DELETE FROM steps WHERE step_id = ?1 AND user_id = ?2",
        params![step_id, user_id.as_str()],
    )?;
    tx.commit()?;

    crate::sqlite::goals::recompute_goal_progress(conn, user_id, goal_id)?;
    Ok(true)
}

pub fn update_step_status(
    conn: &mut Connection,
    user_id: &UserId,
    step_id: i64,
    new_status: StepStatus,
) -> Result<Goal> {
    let tx = conn.transaction()?;
    let goal_id: i64 = tx
        .query_row(
            "SELECT goal_id FROM steps WHERE step_id = ?1 AND user_id = ?2",
            params![step_id, user_id.as_str()],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(StoreError::StepNotFound { step_id })?;

    let completed_at = if new_status == StepStatus::Completed {
        Some(Utc::now().to_rfc3339())
    } else {
        None
    };
    tx.execute(
        "UPDATE steps SET status = ?1, completed_at = ?2 WHERE step_id = ?3",
        params![new_status.to_string(), completed_at, step_id],
    )?;
    tx.commit()?;

    crate::sqlite::goals::recompute_goal_progress(conn, user_id, goal_id)
}

/// Applies a `STEP_EDIT_*` patch; keeps a linked `goal_step` event's own
/// date/time in sync in the same transaction — the reverse direction of
/// what `update_event` does for the step side.
pub fn update_step_fields(
    conn: &mut Connection,
    user_id: &UserId,
    step_id: i64,
    patch: StepFieldPatch,
) -> Result<Step> {
    let tx = conn.transaction()?;
    let existing = tx
        .query_row(
            "SELECT * FROM steps WHERE step_id = ?1 AND user_id = ?2",
            params![step_id, user_id.as_str()],
            row_to_step,
        )
        .optional()?
        .ok_or(StoreError::StepNotFound { step_id })?;

    let new_title = patch.title.unwrap_or(existing.title);
    let new_date = patch.planned_date.unwrap_or(existing.planned_date);
    let new_time = patch.planned_time.unwrap_or(existing.planned_time);

    tx.execute(
        "UPDATE steps SET title = ?1, planned_date = ?2, planned_time = ?3 WHERE step_id = ?4",
        params![
            new_title,
            new_date.map(|d| d.format("%Y-%m-%d").to_string()),
            new_time.map(|t| t.format("%H:%M:%S").to_string()),
            step_id,
        ],
    )?;

    if let Some(event_id) = existing.linked_event_id {
        tx.execute(
            "UPDATE events SET title = ?1, date = ?2, time = ?3, updated_at = ?4 WHERE event_id = ?5",
            params![
                new_title,
                new_date.map(|d| d.format("%Y-%m-%d").to_string()),
                new_time.map(|t| t.format("%H:%M:%S").to_string()),
                Utc::now().to_rfc3339(),
                event_id,
            ],
        )?;
    }

    let step = tx
        .query_row(
            "SELECT * FROM steps WHERE step_id = ?1",
            params![step_id],
            row_to_step,
        )
        .optional()?
        .ok_or(StoreError::StepNotFound { step_id })?;
    tx.commit()?;
    Ok(step)
}

pub fn schedule_goal_steps(
    conn: &mut Connection,
    user_id: &UserId,
    goal_id: i64,
    placements: &[crate::models::StepPlacement],
) -> Result<Vec<Step>> {
    let tx = conn.transaction()?;
    let now = Utc::now().to_rfc3339();
    let mut placed_ids = Vec::with_capacity(placements.len());

    for placement in placements {
        let (placement_goal_id, title): (i64, String) = tx
            .query_row(
                "SELECT goal_id, title FROM steps WHERE step_id = ?1 AND user_id = ?2",
                params![placement.step_id, user_id.as_str()],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .ok_or(StoreError::StepNotFound { step_id: placement.step_id })?;
        if placement_goal_id != goal_id {
            return Err(StoreError::StepNotFound { step_id: placement.step_id });
        }

        tx.execute(
            "INSERT INTO events
                (user_id, title, date, time, duration_minutes, event_type,
                 linked_step_id, linked_goal_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'goal_step', ?6, ?7, ?8, ?8)",
            params![
                user_id.as_str(),
                title,
                placement.date.format("%Y-%m-%d").to_string(),
                placement.time.format("%H:%M:%S").to_string(),
                placement.duration_minutes,
                placement.step_id,
                goal_id,
                now,
            ],
        )?;
        let event_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE steps SET planned_date = ?1, planned_time = ?2, duration_minutes = ?3,
                              linked_event_id = ?4
             WHERE step_id = ?5",
            params![
                placement.date.format("%Y-%m-%d").to_string(),
                placement.time.format("%H:%M:%S").to_string(),
                placement.duration_minutes,
                event_id,
                placement.step_id,
            ],
        )?;
        placed_ids.push(placement.step_id);
    }

    tx.execute(
        "UPDATE goals SET is_scheduled = 1, updated_at = ?1 WHERE goal_id = ?2 AND user_id = ?3",
        params![now, goal_id, user_id.as_str()],
    )?;

    let mut steps = Vec::with_capacity(placed_ids.len());
    for step_id in placed_ids {
        let step = tx
            .query_row(
                "SELECT * FROM steps WHERE step_id = ?1",
                params![step_id],
                row_to_step,
            )
            .optional()?
            .ok_or(StoreError::StepNotFound { step_id })?;
        steps.push(step);
    }
    tx.commit()?;
    Ok(steps)
}

pub fn place_step(
    conn: &mut Connection,
    user_id: &UserId,
    step_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: i64,
) -> Result<Step> {
    let tx = conn.transaction()?;
    let (goal_id, title): (i64, String) = tx
        .query_row(
            "SELECT goal_id, title FROM steps WHERE step_id = ?1 AND user_id = ?2",
            params![step_id, user_id.as_str()],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?
        .ok_or(StoreError::StepNotFound { step_id })?;

    let now = Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO events
            (user_id, title, date, time, duration_minutes, event_type,
             linked_step_id, linked_goal_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'goal_step', ?6, ?7, ?8, ?8)",
        params![
            user_id.as_str(),
            title,
            date.format("%Y-%m-%d").to_string(),
            time.format("%H:%M:%S").to_string(),
            duration_minutes,
            step_id,
            goal_id,
            now,
        ],
    )?;
    let event_id = tx.last_insert_rowid();

    tx.execute(
        "UPDATE steps SET planned_date = ?1, planned_time = ?2, duration_minutes = ?3,
                          linked_event_id = ?4
         WHERE step_id = ?5",
        params![
            date.format("%Y-%m-%d").to_string(),
            time.format("%H:%M:%S").to_string(),
            duration_minutes,
            event_id,
            step_id,
        ],
    )?;

    let step = tx
        .query_row(
            "SELECT * FROM steps WHERE step_id = ?1",
            params![step_id],
            row_to_step,
        )
        .optional()?
        .ok_or(StoreError::StepNotFound { step_id })?;
    tx.commit()?;
    Ok(step)
}
