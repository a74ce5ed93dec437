use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use waypoint_core::types::UserId;

use crate::error::Result;
use crate::models::SessionStateRow;

pub fn get_session_state_raw(
    conn: &Connection,
    user_id: &UserId,
) -> Result<Option<SessionStateRow>> {
    conn.query_row(
        "SELECT user_id, state, state_context, updated_at FROM session_states WHERE user_id = ?1",
        params![user_id.as_str()],
        |row| {
            let updated_at: String = row.get("updated_at")?;
            Ok(SessionStateRow {
                user_id: UserId(row.get("user_id")?),
                state: row.get("state")?,
                state_context: row.get("state_context")?,
                updated_at: updated_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

pub fn set_session_state_raw(
    conn: &Connection,
    user_id: &UserId,
    state: &str,
    state_context: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO session_states (user_id, state, state_context, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id) DO UPDATE SET
            state = excluded.state,
            state_context = excluded.state_context,
            updated_at = excluded.updated_at",
        params![user_id.as_str(), state, state_context, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
