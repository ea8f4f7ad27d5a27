//! Schedule repository: events, contractors, attendees and sessions.
//!
//! These tables belong to schedule management. The service itself only
//! reads them, but operators and tests seed them through this repository,
//! and every session or attendee write fires the notification triggers.

use cadence_core::{ContractorId, EventId, FocusAreas, Session, SessionId};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::row_types::{SessionRow, format_timestamp, parse_timestamp};

/// Fields for a new session.
pub struct NewSession<'a> {
    /// Parent event.
    pub event_id: EventId,
    /// Speaker display name.
    pub speaker_name: &'a str,
    /// Title.
    pub title: &'a str,
    /// Synopsis.
    pub synopsis: Option<&'a str>,
    /// Room or stage.
    pub location: Option<&'a str>,
    /// Start instant.
    pub start: Option<DateTime<Utc>>,
    /// End instant.
    pub end: Option<DateTime<Utc>>,
    /// Focus-area tags.
    pub focus_areas: &'a FocusAreas,
}

/// Schedule repository (stateless).
pub struct ScheduleRepo;

impl ScheduleRepo {
    /// Create an event.
    pub fn insert_event(conn: &Connection, name: &str, timezone: &str) -> Result<EventId> {
        let _ = conn.execute(
            "INSERT INTO events (name, timezone) VALUES (?1, ?2)",
            params![name, timezone],
        )?;
        Ok(EventId::new(conn.last_insert_rowid()))
    }

    /// Create a contractor.
    pub fn insert_contractor(
        conn: &Connection,
        name: &str,
        focus_areas: &FocusAreas,
    ) -> Result<ContractorId> {
        let _ = conn.execute(
            "INSERT INTO contractors (name, focus_areas) VALUES (?1, ?2)",
            params![name, focus_areas.to_json_string()],
        )?;
        Ok(ContractorId::new(conn.last_insert_rowid()))
    }

    /// Replace a contractor's focus areas.
    ///
    /// Contractor edits do not fire a notification; the next rebuild picks
    /// them up.
    pub fn set_contractor_focus_areas(
        conn: &Connection,
        contractor: ContractorId,
        focus_areas: &FocusAreas,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE contractors SET focus_areas = ?1 WHERE id = ?2",
            params![focus_areas.to_json_string(), contractor.get()],
        )?;
        Ok(changed > 0)
    }

    /// Register a contractor for an event. Returns false if already registered.
    pub fn add_attendee(conn: &Connection, event: EventId, contractor: ContractorId) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO event_attendees (event_id, contractor_id) VALUES (?1, ?2)",
            params![event.get(), contractor.get()],
        )?;
        Ok(inserted > 0)
    }

    /// Remove a registration.
    pub fn remove_attendee(
        conn: &Connection,
        event: EventId,
        contractor: ContractorId,
    ) -> Result<bool> {
        let deleted = conn.execute(
            "DELETE FROM event_attendees WHERE event_id = ?1 AND contractor_id = ?2",
            params![event.get(), contractor.get()],
        )?;
        Ok(deleted > 0)
    }

    /// Create a session, stamping `created_at`/`updated_at` with `at`.
    pub fn insert_session(
        conn: &Connection,
        new: &NewSession<'_>,
        at: DateTime<Utc>,
    ) -> Result<SessionId> {
        let stamp = format_timestamp(at);
        let _ = conn.execute(
            "INSERT INTO event_sessions (event_id, speaker_name, title, synopsis, location,
             session_time, session_end, focus_areas, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                new.event_id.get(),
                new.speaker_name,
                new.title,
                new.synopsis,
                new.location,
                new.start.map(format_timestamp),
                new.end.map(format_timestamp),
                new.focus_areas.to_json_string(),
                stamp,
            ],
        )?;
        Ok(SessionId::new(conn.last_insert_rowid()))
    }

    /// Reschedule a session.
    pub fn reschedule_session(
        conn: &Connection,
        id: SessionId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE event_sessions SET session_time = ?1, session_end = ?2, updated_at = ?3
             WHERE id = ?4",
            params![
                start.map(format_timestamp),
                end.map(format_timestamp),
                format_timestamp(at),
                id.get()
            ],
        )?;
        Ok(changed > 0)
    }

    /// Replace a session's focus areas.
    pub fn set_session_focus_areas(
        conn: &Connection,
        id: SessionId,
        focus_areas: &FocusAreas,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE event_sessions SET focus_areas = ?1, updated_at = ?2 WHERE id = ?3",
            params![focus_areas.to_json_string(), format_timestamp(at), id.get()],
        )?;
        Ok(changed > 0)
    }

    /// Delete a session.
    pub fn delete_session(conn: &Connection, id: SessionId) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM event_sessions WHERE id = ?1", [id.get()])?;
        Ok(deleted > 0)
    }

    /// Fetch one session.
    pub fn get_session(conn: &Connection, id: SessionId) -> Result<Option<Session>> {
        let sql = format!(
            "SELECT {} FROM event_sessions s JOIN events e ON e.id = s.event_id WHERE s.id = ?1",
            SessionRow::COLUMNS
        );
        let row = conn
            .query_row(&sql, [id.get()], |row| SessionRow::from_row(row, 0))
            .optional()?;
        row.map(SessionRow::into_session).transpose()
    }

    /// Sessions of an event, in start order (unscheduled last).
    pub fn list_sessions(conn: &Connection, event: EventId) -> Result<Vec<Session>> {
        let sql = format!(
            "SELECT {} FROM event_sessions s JOIN events e ON e.id = s.event_id
             WHERE s.event_id = ?1
             ORDER BY s.session_time IS NULL, s.session_time, s.id",
            SessionRow::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([event.get()], |row| SessionRow::from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(SessionRow::into_session).collect()
    }

    /// Most recent creation or update among scheduled sessions.
    ///
    /// `None` when no session has a start time.
    pub fn latest_source_change(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = conn.query_row(
            "SELECT MAX(MAX(created_at, updated_at)) FROM event_sessions
             WHERE session_time IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        raw.map(|value| parse_timestamp("updated_at", &value))
            .transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
