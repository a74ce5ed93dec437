use rusqlite::Connection;

use crate::error::Result;

/// Initialise every table this workspace persists to. Idempotent — safe to
/// call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            user_id                   TEXT    NOT NULL PRIMARY KEY,
            chat_id                   TEXT    NOT NULL,
            timezone                  TEXT    NOT NULL,
            notify_enabled            INTEGER NOT NULL DEFAULT 1,
            notify_event_reminders    INTEGER NOT NULL DEFAULT 1,
            notify_goal_deadlines     INTEGER NOT NULL DEFAULT 1,
            notify_step_reminders     INTEGER NOT NULL DEFAULT 1,
            notify_motivation         INTEGER NOT NULL DEFAULT 1,
            created_at                TEXT    NOT NULL,
            updated_at                TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS goals (
            goal_id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id          TEXT    NOT NULL,
            title            TEXT    NOT NULL,
            description      TEXT,
            status           TEXT    NOT NULL DEFAULT 'active',
            progress_percent INTEGER NOT NULL DEFAULT 0,
            target_date      TEXT,
            category         TEXT,
            priority         TEXT    NOT NULL DEFAULT 'medium',
            is_scheduled     INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT    NOT NULL,
            updated_at       TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_goals_user ON goals (user_id);

        CREATE TABLE IF NOT EXISTS steps (
            step_id          INTEGER PRIMARY KEY AUTOINCREMENT,
            goal_id          INTEGER NOT NULL,
            user_id          TEXT    NOT NULL,
            title            TEXT    NOT NULL,
            \"order\"        INTEGER NOT NULL,
            status           TEXT    NOT NULL DEFAULT 'pending',
            estimated_hours  REAL,
            completed_at     TEXT,
            planned_date     TEXT,
            planned_time     TEXT,
            duration_minutes INTEGER,
            linked_event_id  INTEGER,
            UNIQUE (goal_id, \"order\"),
            UNIQUE (linked_event_id)
        );
        CREATE INDEX IF NOT EXISTS idx_steps_goal ON steps (goal_id);
        CREATE INDEX IF NOT EXISTS idx_steps_user ON steps (user_id);

        CREATE TABLE IF NOT EXISTS events (
            event_id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id                  TEXT    NOT NULL,
            title                    TEXT    NOT NULL,
            date                     TEXT    NOT NULL,
            time                     TEXT,
            duration_minutes         INTEGER NOT NULL DEFAULT 60,
            repeat                   TEXT,
            notes                    TEXT,
            event_type               TEXT    NOT NULL DEFAULT 'user',
            linked_step_id           INTEGER,
            linked_goal_id           INTEGER,
            reminder_minutes_before  INTEGER NOT NULL DEFAULT 15,
            reminder_enabled         INTEGER NOT NULL DEFAULT 1,
            created_at               TEXT    NOT NULL,
            updated_at               TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_user_date ON events (user_id, date);

        CREATE TABLE IF NOT EXISTS conversation_messages (
            msg_id     INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    TEXT    NOT NULL,
            role       TEXT    NOT NULL,
            text       TEXT    NOT NULL,
            intent     TEXT,
            created_at TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_user ON conversation_messages (user_id, created_at);

        CREATE TABLE IF NOT EXISTS session_states (
            user_id       TEXT NOT NULL PRIMARY KEY,
            state         TEXT NOT NULL,
            state_context TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS notification_dedup (
            user_id    TEXT NOT NULL,
            job_kind   TEXT NOT NULL,
            key        TEXT NOT NULL,
            fire_date  TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, job_kind, key, fire_date)
        );
        ",
    )?;
    Ok(())
}
