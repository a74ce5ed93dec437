use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use waypoint_core::types::{GoalStatus, Priority, UserId};

use crate::error::{Result, StoreError};
use crate::models::{Goal, GoalPatch, NewGoal, NewStepDraft, Step};

use super::steps::row_to_step;

pub fn row_to_goal(row: &Row) -> rusqlite::Result<Goal> {
    let status: String = row.get("status")?;
    let priority: String = row.get("priority")?;
    let target_date: Option<String> = row.get("target_date")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(Goal {
        goal_id: row.get("goal_id")?,
        user_id: UserId(row.get("user_id")?),
        title: row.get("title")?,
        description: row.get("description")?,
        status: status.parse().unwrap_or(GoalStatus::Active),
        progress_percent: row.get::<_, i64>("progress_percent")? as u8,
        target_date: target_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        category: row.get("category")?,
        priority: priority.parse().unwrap_or(Priority::Medium),
        is_scheduled: row.get::<_, i64>("is_scheduled")? != 0,
        created_at: created_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
    })
}

pub fn get_goal(conn: &Connection, user_id: &UserId, goal_id: i64) -> Result<Option<Goal>> {
    conn.query_row(
        "SELECT * FROM goals WHERE goal_id = ?1 AND user_id = ?2",
        params![goal_id, user_id.as_str()],
        row_to_goal,
    )
    .optional()
    .map_err(Into::into)
}

pub fn list_goals(
    conn: &Connection,
    user_id: &UserId,
    status: Option<GoalStatus>,
) -> Result<Vec<Goal>> {
    let sql = match status {
        Some(_) => {
            "SELECT * FROM goals WHERE user_id = ?1 AND status = ?2
             ORDER BY target_date IS NULL, target_date ASC, goal_id ASC"
        }
        None => {
            "SELECT * FROM goals WHERE user_id = ?1
             ORDER BY CASE status WHEN 'active' THEN 0 WHEN 'paused' THEN 1 ELSE 2 END,
                      target_date IS NULL, target_date ASC, goal_id ASC"
        }
    };
    let mut stmt = conn.prepare(sql)?;
    let goals = match status {
        Some(s) => stmt
            .query_map(params![user_id.as_str(), s.to_string()], row_to_goal)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt
            .query_map(params![user_id.as_str()], row_to_goal)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
    };
    Ok(goals)
}

pub fn list_active_goals_for_context(
    conn: &Connection,
    user_id: &UserId,
    limit: i64,
) -> Result<Vec<Goal>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM goals WHERE user_id = ?1 AND status = 'active'
         ORDER BY target_date IS NULL, target_date ASC, goal_id ASC LIMIT ?2",
    )?;
    let goals = stmt
        .query_map(params![user_id.as_str(), limit], row_to_goal)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(goals)
}

pub fn create_goal_with_steps(
    conn: &mut Connection,
    user_id: &UserId,
    goal: NewGoal,
    steps: Vec<NewStepDraft>,
) -> Result<(Goal, Vec<Step>)> {
    let tx = conn.transaction()?;
    let now = Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO goals
            (user_id, title, description, status, progress_percent, target_date,
             category, priority, is_scheduled, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'active', 0, ?4, ?5, ?6, 0, ?7, ?7)",
        params![
            user_id.as_str(),
            goal.title,
            goal.description,
            goal.target_date.map(|d| d.format("%Y-%m-%d").to_string()),
            goal.category,
            goal.priority.to_string(),
            now,
        ],
    )?;
    let goal_id = tx.last_insert_rowid();

    let mut inserted_steps = Vec::with_capacity(steps.len());
    for draft in steps {
        tx.execute(
            "INSERT INTO steps (goal_id, user_id, title, \"order\", status, estimated_hours)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
            params![
                goal_id,
                user_id.as_str(),
                draft.title,
                draft.order,
                draft.estimated_hours,
            ],
        )?;
        let step_id = tx.last_insert_rowid();
        let step = tx
            .query_row(
                "SELECT * FROM steps WHERE step_id = ?1",
                params![step_id],
                row_to_step,
            )
            .optional()?
            .ok_or_else(|| StoreError::Constraint("step insert did not persist".into()))?;
        inserted_steps.push(step);
    }

    let created_goal = tx
        .query_row(
            "SELECT * FROM goals WHERE goal_id = ?1",
            params![goal_id],
            row_to_goal,
        )
        .optional()?
        .ok_or_else(|| StoreError::Constraint("goal insert did not persist".into()))?;

    tx.commit()?;
    Ok((created_goal, inserted_steps))
}

pub fn delete_goal_cascade(conn: &mut Connection, user_id: &UserId, goal_id: i64) -> Result<bool> {
    let tx = conn.transaction()?;
    let exists = tx
        .query_row(
            "SELECT 1 FROM goals WHERE goal_id = ?1 AND user_id = ?2",
            params![goal_id, user_id.as_str()],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !exists {
        tx.commit()?;
        return Ok(false);
    }

    // Clear the step side of any step<->event link before the events
    // themselves are removed, since `events` has no cascade of its own.
    tx.execute(
        "DELETE FROM events WHERE linked_step_id IN (SELECT step_id FROM steps WHERE goal_id = ?1)",
        params![goal_id],
    )?;
    tx.execute("DELETE FROM steps WHERE goal_id = ?1", params![goal_id])?;
    tx.execute(
        "DELETE FROM goals WHERE goal_id = ?1 AND user_id = ?2",
        params![goal_id, user_id.as_str()],
    )?;
    tx.commit()?;
    Ok(true)
}

pub fn recompute_goal_progress(
    conn: &mut Connection,
    user_id: &UserId,
    goal_id: i64,
) -> Result<Goal> {
    let tx = conn.transaction()?;
    let total: i64 = tx.query_row(
        "SELECT COUNT(*) FROM steps WHERE goal_id = ?1",
        params![goal_id],
        |r| r.get(0),
    )?;
    let completed: i64 = tx.query_row(
        "SELECT COUNT(*) FROM steps WHERE goal_id = ?1 AND status = 'completed'",
        params![goal_id],
        |r| r.get(0),
    )?;
    let progress: i64 = if total == 0 {
        0
    } else {
        ((completed as f64 * 100.0) / total as f64).round() as i64
    };
    let new_status = if total > 0 && completed == total {
        GoalStatus::Completed
    } else {
        let current: String = tx.query_row(
            "SELECT status FROM goals WHERE goal_id = ?1",
            params![goal_id],
            |r| r.get(0),
        )?;
        // Don't downgrade a paused goal back to active just because a step
        // reverted — only a completed->active revert (step un-completed)
        // needs to be honored automatically.
        let current: GoalStatus = current.parse().unwrap_or(GoalStatus::Active);
        if current == GoalStatus::Completed {
            GoalStatus::Active
        } else {
            current
        }
    };
    tx.execute(
        "UPDATE goals SET progress_percent = ?1, status = ?2, updated_at = ?3
         WHERE goal_id = ?4 AND user_id = ?5",
        params![
            progress,
            new_status.to_string(),
            Utc::now().to_rfc3339(),
            goal_id,
            user_id.as_str(),
        ],
    )?;
    let goal = tx
        .query_row(
            "SELECT * FROM goals WHERE goal_id = ?1 AND user_id = ?2",
            params![goal_id, user_id.as_str()],
            row_to_goal,
        )
        .optional()?
        .ok_or(StoreError::GoalNotFound { goal_id })?;
    tx.commit()?;
    Ok(goal)
}

pub fn update_goal(
    conn: &Connection,
    user_id: &UserId,
    goal_id: i64,
    patch: GoalPatch,
) -> Result<Goal> {
    let existing = get_goal(conn, user_id, goal_id)?.ok_or(StoreError::GoalNotFound { goal_id })?;

    let title = patch.title.unwrap_or(existing.title);
    let description = patch.description.unwrap_or(existing.description);
    let target_date = patch.target_date.unwrap_or(existing.target_date);
    let category = patch.category.unwrap_or(existing.category);
    let priority = patch.priority.unwrap_or(existing.priority);

    conn.execute(
        "UPDATE goals SET title = ?1, description = ?2, target_date = ?3, category = ?4,
                          priority = ?5, updated_at = ?6
         WHERE goal_id = ?7 AND user_id = ?8",
        params![
            title,
            description,
            target_date.map(|d| d.format("%Y-%m-%d").to_string()),
            category,
            priority.to_string(),
            Utc::now().to_rfc3339(),
            goal_id,
            user_id.as_str(),
        ],
    )?;

    get_goal(conn, user_id, goal_id)?.ok_or(StoreError::GoalNotFound { goal_id })
}
