//! View repository: rebuild and read the two relevance snapshots.
//!
//! A rebuild reads every (scheduled session, attending contractor) pair,
//! scores it, and replaces the snapshot table inside one `IMMEDIATE`
//! transaction. Readers on other connections keep seeing the previous
//! snapshot until commit, and a failed rebuild rolls back to it.

use cadence_core::scoring::{self, is_active, is_upcoming, minutes_until};
use cadence_core::{
    ContextStats, ContractorId, EventId, FocusAreas, SessionContext, SessionId,
    UpcomingSessionContext,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::row_types::{
    CandidateRow, SessionNowRow, SessionRow, UpcomingRow, format_timestamp, parse_timestamp,
};

// Candidate prefilter. julianday() narrows to a two-day band around `now`;
// the exact inclusive window check runs in Rust on parsed instants.
const CANDIDATES_SQL: &str = "SELECT {cols}, e.name, a.contractor_id, c.focus_areas
     FROM event_sessions s
     JOIN events e ON e.id = s.event_id
     JOIN event_attendees a ON a.event_id = s.event_id
     JOIN contractors c ON c.id = a.contractor_id
     WHERE s.session_time IS NOT NULL
       AND s.session_end IS NOT NULL
       AND julianday(s.session_end) >= julianday(?1) - 1
       AND julianday(s.session_time) <= julianday(?1) + 1
     ORDER BY s.id, a.contractor_id";

/// A scored candidate with its decoded instants.
struct Scored {
    row: CandidateRow,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    session_tags: FocusAreas,
    match_count: u32,
}

/// View repository (stateless).
pub struct ViewRepo;

impl ViewRepo {
    /// Rebuild `view_sessions_now` as of `now`. Returns the row count.
    pub fn rebuild_sessions_now(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        let rows: Vec<SessionContext> = load_candidates(&tx, now)?
            .into_iter()
            .filter(|c| is_active(c.start, c.end, now))
            .map(|c| c.into_now())
            .collect();
        let count = write_sessions_now(&tx, &rows)?;
        tx.commit()?;
        debug!(rows = count, "rebuilt view_sessions_now");
        Ok(count)
    }

    /// Rebuild `view_sessions_next_60` as of `now`. Returns the row count.
    pub fn rebuild_sessions_next_60(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        let rows: Vec<UpcomingSessionContext> = load_candidates(&tx, now)?
            .into_iter()
            .filter(|c| is_upcoming(c.start, now))
            .map(|c| c.into_upcoming(now))
            .collect();
        let count = write_sessions_next_60(&tx, &rows)?;
        tx.commit()?;
        debug!(rows = count, "rebuilt view_sessions_next_60");
        Ok(count)
    }

    /// Sessions in progress for a contractor, relevance desc then match count desc.
    pub fn sessions_now(conn: &Connection, contractor: ContractorId) -> Result<Vec<SessionContext>> {
        let sql = format!(
            "SELECT {} FROM view_sessions_now WHERE contractor_id = ?1
             ORDER BY relevance_score DESC, focus_area_match_count DESC, session_time, session_id",
            SessionNowRow::COLUMNS
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map([contractor.get()], SessionNowRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(SessionNowRow::into_context).collect()
    }

    /// Upcoming sessions for a contractor, priority desc then soonest first.
    pub fn sessions_next_60(
        conn: &Connection,
        contractor: ContractorId,
    ) -> Result<Vec<UpcomingSessionContext>> {
        let sql = format!(
            "SELECT {} FROM view_sessions_next_60 WHERE contractor_id = ?1
             ORDER BY priority_score DESC, minutes_until_start ASC, session_id",
            UpcomingRow::COLUMNS
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map([contractor.get()], UpcomingRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(UpcomingRow::into_context).collect()
    }

    /// Record a completed refresh of both views.
    pub fn record_refresh(
        conn: &Connection,
        at: DateTime<Utc>,
        sessions_now: usize,
        sessions_next_60: usize,
    ) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO view_refresh_log (id, refreshed_at, sessions_now, sessions_next_60)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
               refreshed_at = excluded.refreshed_at,
               sessions_now = excluded.sessions_now,
               sessions_next_60 = excluded.sessions_next_60",
            params![
                format_timestamp(at),
                i64::try_from(sessions_now).unwrap_or(i64::MAX),
                i64::try_from(sessions_next_60).unwrap_or(i64::MAX),
            ],
        )?;
        Ok(())
    }

    /// When both views were last refreshed, by any process.
    pub fn last_refresh(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = conn
            .query_row("SELECT refreshed_at FROM view_refresh_log WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        raw.map(|value| parse_timestamp("refreshed_at", &value))
            .transpose()
    }

    /// Distinct contractors, distinct events, and row totals for both views.
    pub fn stats(conn: &Connection) -> Result<ContextStats> {
        let counts: [i64; 6] = conn.query_row(
            "SELECT
               (SELECT COUNT(DISTINCT contractor_id) FROM view_sessions_now),
               (SELECT COUNT(DISTINCT contractor_id) FROM view_sessions_next_60),
               (SELECT COUNT(DISTINCT event_id) FROM view_sessions_now),
               (SELECT COUNT(DISTINCT event_id) FROM view_sessions_next_60),
               (SELECT COUNT(*) FROM view_sessions_now),
               (SELECT COUNT(*) FROM view_sessions_next_60)",
            [],
            |row| {
                Ok([
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ])
            },
        )?;
        let [c_now, c_next, e_now, e_next, r_now, r_next] =
            counts.map(|n| u64::try_from(n).unwrap_or(0));
        Ok(ContextStats {
            contractors_with_active_sessions: c_now,
            contractors_with_upcoming_sessions: c_next,
            events_with_active_sessions: e_now,
            events_with_upcoming_sessions: e_next,
            total_active_session_records: r_now,
            total_upcoming_session_records: r_next,
        })
    }
}

fn load_candidates(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Scored>> {
    let sql = CANDIDATES_SQL.replace("{cols}", SessionRow::COLUMNS);
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([format_timestamp(now)], CandidateRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut scored = Vec::with_capacity(rows.len());
    for row in rows {
        let session_id = row.session.id;
        let (start, end) = match decode_window(&row.session) {
            Ok(window) => window,
            Err(error) => {
                warn!(session_id, %error, "skipping session with unreadable times");
                continue;
            }
        };
        let session_tags = FocusAreas::from_stored(&row.session.focus_areas);
        let contractor_tags = FocusAreas::from_stored(&row.contractor_focus_areas);
        let match_count = session_tags.match_count(&contractor_tags);
        scored.push(Scored {
            row,
            start,
            end,
            session_tags,
            match_count,
        });
    }
    Ok(scored)
}

fn decode_window(row: &SessionRow) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = parse_timestamp("session_time", row.session_time.as_deref().unwrap_or_default())?;
    let end = parse_timestamp("session_end", row.session_end.as_deref().unwrap_or_default())?;
    Ok((start, end))
}

impl Scored {
    fn into_now(self) -> SessionContext {
        let s = self.row.session;
        SessionContext {
            session_id: SessionId::new(s.id),
            event_id: EventId::new(s.event_id),
            contractor_id: ContractorId::new(self.row.contractor_id),
            speaker_name: s.speaker_name,
            session_title: s.title,
            session_description: s.synopsis,
            session_location: s.location,
            session_time: self.start,
            session_end: self.end,
            event_name: self.row.event_name,
            event_timezone: s.timezone,
            focus_areas: self.session_tags,
            relevance_score: scoring::relevance_score(self.match_count),
            focus_area_match_count: self.match_count,
        }
    }

    fn into_upcoming(self, now: DateTime<Utc>) -> UpcomingSessionContext {
        let minutes = minutes_until(self.start, now);
        let s = self.row.session;
        UpcomingSessionContext {
            session_id: SessionId::new(s.id),
            event_id: EventId::new(s.event_id),
            contractor_id: ContractorId::new(self.row.contractor_id),
            speaker_name: s.speaker_name,
            session_title: s.title,
            session_description: s.synopsis,
            session_location: s.location,
            session_time: self.start,
            session_end: self.end,
            event_name: self.row.event_name,
            event_timezone: s.timezone,
            focus_areas: self.session_tags,
            minutes_until_start: minutes,
            match_count: self.match_count,
            priority_score: scoring::priority_score(minutes, self.match_count),
        }
    }
}

fn write_sessions_now(tx: &Transaction<'_>, rows: &[SessionContext]) -> Result<usize> {
    let _ = tx.execute("DELETE FROM view_sessions_now", [])?;
    let sql = format!(
        "INSERT INTO view_sessions_now ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        SessionNowRow::COLUMNS
    );
    let mut stmt = tx.prepare_cached(&sql)?;
    for r in rows {
        let _ = stmt.execute(params![
            r.session_id.get(),
            r.event_id.get(),
            r.contractor_id.get(),
            r.speaker_name,
            r.session_title,
            r.session_description,
            r.session_location,
            format_timestamp(r.session_time),
            format_timestamp(r.session_end),
            r.event_name,
            r.event_timezone,
            r.focus_areas.to_json_string(),
            r.relevance_score,
            r.focus_area_match_count,
        ])?;
    }
    Ok(rows.len())
}

fn write_sessions_next_60(tx: &Transaction<'_>, rows: &[UpcomingSessionContext]) -> Result<usize> {
    let _ = tx.execute("DELETE FROM view_sessions_next_60", [])?;
    let sql = format!(
        "INSERT INTO view_sessions_next_60 ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        UpcomingRow::COLUMNS
    );
    let mut stmt = tx.prepare_cached(&sql)?;
    for r in rows {
        let _ = stmt.execute(params![
            r.session_id.get(),
            r.event_id.get(),
            r.contractor_id.get(),
            r.speaker_name,
            r.session_title,
            r.session_description,
            r.session_location,
            format_timestamp(r.session_time),
            format_timestamp(r.session_end),
            r.event_name,
            r.event_timezone,
            r.focus_areas.to_json_string(),
            r.minutes_until_start,
            r.match_count,
            r.priority_score,
        ])?;
    }
    Ok(rows.len())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
