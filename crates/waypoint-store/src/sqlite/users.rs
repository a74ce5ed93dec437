use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use waypoint_core::types::UserId;

use crate::error::Result;
use crate::models::{NotificationToggle, UserProfile};

fn row_to_profile(row: &Row) -> rusqlite::Result<UserProfile> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(UserProfile {
        user_id: UserId(row.get("user_id")?),
        chat_id: row.get("chat_id")?,
        timezone: row.get("timezone")?,
        notify_enabled: row.get::<_, i64>("notify_enabled")? != 0,
        notify_event_reminders: row.get::<_, i64>("notify_event_reminders")? != 0,
        notify_goal_deadlines: row.get::<_, i64>("notify_goal_deadlines")? != 0,
        notify_step_reminders: row.get::<_, i64>("notify_step_reminders")? != 0,
        notify_motivation: row.get::<_, i64>("notify_motivation")? != 0,
        created_at: created_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
    })
}

pub fn get_profile(conn: &Connection, user_id: &UserId) -> Result<Option<UserProfile>> {
    conn.query_row(
        "SELECT * FROM users WHERE user_id = ?1",
        params![user_id.as_str()],
        row_to_profile,
    )
    .optional()
    .map_err(Into::into)
}

pub fn get_or_create_profile(
    conn: &Connection,
    user_id: &UserId,
    chat_id: &str,
    default_timezone: &str,
) -> Result<UserProfile> {
    if let Some(existing) = get_profile(conn, user_id)? {
        return Ok(existing);
    }
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (user_id, chat_id, timezone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![user_id.as_str(), chat_id, default_timezone, now],
    )?;
    get_profile(conn, user_id)?.ok_or_else(|| {
        crate::error::StoreError::Constraint("profile insert did not persist".into())
    })
}

pub fn update_timezone(conn: &Connection, user_id: &UserId, timezone: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET timezone = ?1, updated_at = ?2 WHERE user_id = ?3",
        params![timezone, Utc::now().to_rfc3339(), user_id.as_str()],
    )?;
    Ok(())
}

pub fn set_notification_toggle(
    conn: &Connection,
    user_id: &UserId,
    toggle: NotificationToggle,
    enabled: bool,
) -> Result<()> {
    let column = match toggle {
        NotificationToggle::EventReminders => "notify_event_reminders",
        NotificationToggle::GoalDeadlines => "notify_goal_deadlines",
        NotificationToggle::StepReminders => "notify_step_reminders",
        NotificationToggle::Motivation => "notify_motivation",
        NotificationToggle::Enabled => "notify_enabled",
    };
    let sql = format!(
        "UPDATE users SET {column} = ?1, updated_at = ?2 WHERE user_id = ?3",
        column = column
    );
    conn.execute(&sql, params![enabled as i64, Utc::now().to_rfc3339(), user_id.as_str()])?;
    Ok(())
}

pub fn list_user_ids(conn: &Connection) -> Result<Vec<UserId>> {
    let mut stmt = conn.prepare("SELECT user_id FROM users")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows.into_iter().map(UserId).collect())
}
