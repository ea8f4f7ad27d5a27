//! Notification repository: the change-notification outbox.
//!
//! Triggers on `event_sessions` and `event_attendees` append rows here.
//! A listener remembers the highest ID it has delivered and polls for
//! anything newer, which gives the same at-most-once, best-effort contract
//! as a database `LISTEN`: rows written before the listener subscribed are
//! never delivered.

use rusqlite::{Connection, params};

use crate::errors::Result;
use crate::row_types::NotificationRow;

/// Notification outbox repository (stateless).
pub struct NotificationRepo;

impl NotificationRepo {
    /// Highest outbox ID on a channel, or 0 when empty.
    pub fn latest_id(conn: &Connection, channel: &str) -> Result<i64> {
        let id = conn.query_row(
            "SELECT COALESCE(MAX(id), 0) FROM change_notifications WHERE channel = ?1",
            [channel],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Notifications on `channel` with an ID greater than `after`, oldest first.
    pub fn poll(
        conn: &Connection,
        channel: &str,
        after: i64,
        limit: u32,
    ) -> Result<Vec<NotificationRow>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, channel, payload, created_at FROM change_notifications
             WHERE channel = ?1 AND id > ?2
             ORDER BY id
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![channel, after, limit], |row| {
                Ok(NotificationRow {
                    id: row.get(0)?,
                    channel: row.get(1)?,
                    payload: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Publish a notification by hand. Returns its outbox ID.
    pub fn notify(conn: &Connection, channel: &str, payload: &str) -> Result<i64> {
        let _ = conn.execute(
            "INSERT INTO change_notifications (channel, payload) VALUES (?1, ?2)",
            params![channel, payload],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Delete delivered notifications on `channel` up to and including `up_to`.
    pub fn prune(conn: &Connection, channel: &str, up_to: i64) -> Result<usize> {
        let deleted = conn.execute(
            "DELETE FROM change_notifications WHERE channel = ?1 AND id <= ?2",
            params![channel, up_to],
        )?;
        Ok(deleted)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
