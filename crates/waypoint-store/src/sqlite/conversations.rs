use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use waypoint_core::types::UserId;

use crate::error::Result;
use crate::models::{ConversationMessage, CONVERSATION_HISTORY_LIMIT};

fn row_to_message(row: &Row) -> rusqlite::Result<ConversationMessage> {
    let created_at: String = row.get("created_at")?;
    Ok(ConversationMessage {
        msg_id: row.get("msg_id")?,
        user_id: UserId(row.get("user_id")?),
        role: row.get("role")?,
        text: row.get("text")?,
        intent: row.get("intent")?,
        created_at: created_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
    })
}

pub fn append_message(
    conn: &Connection,
    user_id: &UserId,
    role: &str,
    text: &str,
    intent: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO conversation_messages (user_id, role, text, intent, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id.as_str(), role, text, intent, Utc::now().to_rfc3339()],
    )?;
    trim_history(conn, user_id, CONVERSATION_HISTORY_LIMIT)
}

/// Last `limit` messages, oldest first — matches the Context Assembler's
/// "last N turns" slot contract. Retention itself (the
/// sliding window of `CONVERSATION_HISTORY_LIMIT`) is enforced by
/// [`trim_history`], called after every append from the dispatch pipeline.
pub fn list_recent_messages(
    conn: &Connection,
    user_id: &UserId,
    limit: i64,
) -> Result<Vec<ConversationMessage>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM (
            SELECT * FROM conversation_messages WHERE user_id = ?1
            ORDER BY msg_id DESC LIMIT ?2
         ) ORDER BY msg_id ASC",
    )?;
    let messages = stmt
        .query_map(params![user_id.as_str(), limit], row_to_message)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(messages)
}

/// Enforces the bounded per-user sliding window by deleting anything older
/// than the newest `keep` rows.
pub fn trim_history(conn: &Connection, user_id: &UserId, keep: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM conversation_messages
         WHERE user_id = ?1 AND msg_id NOT IN (
            SELECT msg_id FROM conversation_messages WHERE user_id = ?1
            ORDER BY msg_id DESC LIMIT ?2
         )",
        params![user_id.as_str(), keep],
    )?;
    Ok(())
}
