//! Database row types and timestamp encoding.
//!
//! Rows hold the raw column shape (timestamps and tag sets as text).
//! Conversion to the public types in `cadence-core` happens here so the
//! repositories only deal with SQL.

use cadence_core::{
    ContractorId, EventId, FocusAreas, Session, SessionContext, SessionId, UpcomingSessionContext,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;

use crate::errors::{Result, StoreError};

/// Encode an instant the way every timestamp column stores it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a stored RFC 3339 timestamp.
pub fn parse_timestamp(column: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidData {
            column,
            value: raw.to_string(),
        })
}

fn parse_optional(column: &'static str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|value| parse_timestamp(column, value)).transpose()
}

/// Raw `event_sessions` row joined with its event's timezone.
#[derive(Clone, Debug)]
pub struct SessionRow {
    /// Session ID.
    pub id: i64,
    /// Event ID.
    pub event_id: i64,
    /// Speaker display name.
    pub speaker_name: String,
    /// Title.
    pub title: String,
    /// Synopsis.
    pub synopsis: Option<String>,
    /// Location.
    pub location: Option<String>,
    /// Start (text).
    pub session_time: Option<String>,
    /// End (text).
    pub session_end: Option<String>,
    /// Focus areas as stored.
    pub focus_areas: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Event timezone.
    pub timezone: String,
}

impl SessionRow {
    /// Column list matching [`SessionRow::from_row`], for a query that
    /// aliases `event_sessions` as `s` and `events` as `e`.
    pub const COLUMNS: &'static str = "s.id, s.event_id, s.speaker_name, s.title, s.synopsis, \
         s.location, s.session_time, s.session_end, s.focus_areas, s.created_at, s.updated_at, \
         e.timezone";

    /// Map a row selected with [`SessionRow::COLUMNS`] at `offset`.
    pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            event_id: row.get(offset + 1)?,
            speaker_name: row.get(offset + 2)?,
            title: row.get(offset + 3)?,
            synopsis: row.get(offset + 4)?,
            location: row.get(offset + 5)?,
            session_time: row.get(offset + 6)?,
            session_end: row.get(offset + 7)?,
            focus_areas: row.get(offset + 8)?,
            created_at: row.get(offset + 9)?,
            updated_at: row.get(offset + 10)?,
            timezone: row.get(offset + 11)?,
        })
    }

    /// Decode into the public session type.
    pub fn into_session(self) -> Result<Session> {
        Ok(Session {
            id: SessionId::new(self.id),
            event_id: EventId::new(self.event_id),
            start: parse_optional("session_time", self.session_time.as_deref())?,
            end: parse_optional("session_end", self.session_end.as_deref())?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            focus_areas: FocusAreas::from_stored(&self.focus_areas),
            speaker_name: self.speaker_name,
            title: self.title,
            synopsis: self.synopsis,
            location: self.location,
            timezone: self.timezone,
        })
    }
}

/// A session paired with one attending contractor, the input to a rebuild.
#[derive(Clone, Debug)]
pub struct CandidateRow {
    /// The session.
    pub session: SessionRow,
    /// Event display name.
    pub event_name: String,
    /// Attending contractor.
    pub contractor_id: i64,
    /// Contractor focus areas as stored.
    pub contractor_focus_areas: String,
}

impl CandidateRow {
    /// Map a row of `SessionRow::COLUMNS, e.name, a.contractor_id, c.focus_areas`.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            session: SessionRow::from_row(row, 0)?,
            event_name: row.get(12)?,
            contractor_id: row.get(13)?,
            contractor_focus_areas: row.get(14)?,
        })
    }
}

/// Raw `view_sessions_now` row.
#[derive(Clone, Debug)]
pub struct SessionNowRow {
    session_id: i64,
    event_id: i64,
    contractor_id: i64,
    speaker_name: String,
    session_title: String,
    session_description: Option<String>,
    session_location: Option<String>,
    session_time: String,
    session_end: String,
    event_name: String,
    event_timezone: String,
    focus_areas: String,
    relevance_score: u32,
    focus_area_match_count: u32,
}

impl SessionNowRow {
    /// Column list in table order.
    pub const COLUMNS: &'static str = "session_id, event_id, contractor_id, speaker_name, \
         session_title, session_description, session_location, session_time, session_end, \
         event_name, event_timezone, focus_areas, relevance_score, focus_area_match_count";

    /// Map a row selected with [`SessionNowRow::COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            session_id: row.get(0)?,
            event_id: row.get(1)?,
            contractor_id: row.get(2)?,
            speaker_name: row.get(3)?,
            session_title: row.get(4)?,
            session_description: row.get(5)?,
            session_location: row.get(6)?,
            session_time: row.get(7)?,
            session_end: row.get(8)?,
            event_name: row.get(9)?,
            event_timezone: row.get(10)?,
            focus_areas: row.get(11)?,
            relevance_score: row.get(12)?,
            focus_area_match_count: row.get(13)?,
        })
    }

    /// Decode into the public view row.
    pub fn into_context(self) -> Result<SessionContext> {
        Ok(SessionContext {
            session_id: SessionId::new(self.session_id),
            event_id: EventId::new(self.event_id),
            contractor_id: ContractorId::new(self.contractor_id),
            session_time: parse_timestamp("session_time", &self.session_time)?,
            session_end: parse_timestamp("session_end", &self.session_end)?,
            focus_areas: FocusAreas::from_stored(&self.focus_areas),
            speaker_name: self.speaker_name,
            session_title: self.session_title,
            session_description: self.session_description,
            session_location: self.session_location,
            event_name: self.event_name,
            event_timezone: self.event_timezone,
            relevance_score: self.relevance_score,
            focus_area_match_count: self.focus_area_match_count,
        })
    }
}

/// Raw `view_sessions_next_60` row.
#[derive(Clone, Debug)]
pub struct UpcomingRow {
    session_id: i64,
    event_id: i64,
    contractor_id: i64,
    speaker_name: String,
    session_title: String,
    session_description: Option<String>,
    session_location: Option<String>,
    session_time: String,
    session_end: String,
    event_name: String,
    event_timezone: String,
    focus_areas: String,
    minutes_until_start: f64,
    match_count: u32,
    priority_score: u32,
}

impl UpcomingRow {
    /// Column list in table order.
    pub const COLUMNS: &'static str = "session_id, event_id, contractor_id, speaker_name, \
         session_title, session_description, session_location, session_time, session_end, \
         event_name, event_timezone, focus_areas, minutes_until_start, match_count, \
         priority_score";

    /// Map a row selected with [`UpcomingRow::COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            session_id: row.get(0)?,
            event_id: row.get(1)?,
            contractor_id: row.get(2)?,
            speaker_name: row.get(3)?,
            session_title: row.get(4)?,
            session_description: row.get(5)?,
            session_location: row.get(6)?,
            session_time: row.get(7)?,
            session_end: row.get(8)?,
            event_name: row.get(9)?,
            event_timezone: row.get(10)?,
            focus_areas: row.get(11)?,
            minutes_until_start: row.get(12)?,
            match_count: row.get(13)?,
            priority_score: row.get(14)?,
        })
    }

    /// Decode into the public view row.
    pub fn into_context(self) -> Result<UpcomingSessionContext> {
        Ok(UpcomingSessionContext {
            session_id: SessionId::new(self.session_id),
            event_id: EventId::new(self.event_id),
            contractor_id: ContractorId::new(self.contractor_id),
            session_time: parse_timestamp("session_time", &self.session_time)?,
            session_end: parse_timestamp("session_end", &self.session_end)?,
            focus_areas: FocusAreas::from_stored(&self.focus_areas),
            speaker_name: self.speaker_name,
            session_title: self.session_title,
            session_description: self.session_description,
            session_location: self.session_location,
            event_name: self.event_name,
            event_timezone: self.event_timezone,
            minutes_until_start: self.minutes_until_start,
            match_count: self.match_count,
            priority_score: self.priority_score,
        })
    }
}

/// Raw `change_notifications` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationRow {
    /// Monotonic outbox ID.
    pub id: i64,
    /// Channel name.
    pub channel: String,
    /// Payload text (the affected event ID).
    pub payload: String,
    /// When the trigger fired.
    pub created_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
