//! View rows and the assembled event-context bundle.
//!
//! [`SessionContext`] and [`UpcomingSessionContext`] mirror the rows of the
//! two precomputed views. [`EventContext`] is the per-request bundle the
//! context assembler hands to AI consumers and caches as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ContractorId, EventId, SessionId};
use crate::tags::FocusAreas;

/// Row of the "sessions happening now" view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Session ID.
    pub session_id: SessionId,
    /// Event ID.
    pub event_id: EventId,
    /// Contractor the row was scored for.
    pub contractor_id: ContractorId,
    /// Speaker display name.
    pub speaker_name: String,
    /// Session title.
    pub session_title: String,
    /// Session synopsis.
    pub session_description: Option<String>,
    /// Room or stage.
    pub session_location: Option<String>,
    /// Start instant.
    pub session_time: DateTime<Utc>,
    /// End instant.
    pub session_end: DateTime<Utc>,
    /// Event display name.
    pub event_name: String,
    /// IANA timezone of the event.
    pub event_timezone: String,
    /// Session focus areas.
    pub focus_areas: FocusAreas,
    /// Relevance to the contractor (0–100).
    pub relevance_score: u32,
    /// Number of the contractor's focus areas this session covers.
    pub focus_area_match_count: u32,
}

/// Row of the "sessions in the next 60 minutes" view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpcomingSessionContext {
    /// Session ID.
    pub session_id: SessionId,
    /// Event ID.
    pub event_id: EventId,
    /// Contractor the row was scored for.
    pub contractor_id: ContractorId,
    /// Speaker display name.
    pub speaker_name: String,
    /// Session title.
    pub session_title: String,
    /// Session synopsis.
    pub session_description: Option<String>,
    /// Room or stage.
    pub session_location: Option<String>,
    /// Start instant.
    pub session_time: DateTime<Utc>,
    /// End instant.
    pub session_end: DateTime<Utc>,
    /// Event display name.
    pub event_name: String,
    /// IANA timezone of the event.
    pub event_timezone: String,
    /// Session focus areas.
    pub focus_areas: FocusAreas,
    /// Fractional minutes until the session starts, as of the last rebuild.
    pub minutes_until_start: f64,
    /// Number of the contractor's focus areas this session covers.
    pub match_count: u32,
    /// Urgency plus relevance.
    pub priority_score: u32,
}

/// Event context bundle for one contractor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    /// Sessions in progress, ranked.
    pub sessions_now: Vec<SessionContext>,
    /// Sessions starting within the next 60 minutes, ranked.
    pub sessions_next_60: Vec<UpcomingSessionContext>,
    /// Number of sessions in progress.
    pub total_active_sessions: usize,
    /// Number of upcoming sessions.
    pub total_upcoming_sessions: usize,
    /// When the bundle was assembled.
    pub context_timestamp: DateTime<Utc>,
}

impl EventContext {
    /// Assemble a bundle, deriving the counts from the row lists.
    pub fn new(
        sessions_now: Vec<SessionContext>,
        sessions_next_60: Vec<UpcomingSessionContext>,
        context_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            total_active_sessions: sessions_now.len(),
            total_upcoming_sessions: sessions_next_60.len(),
            sessions_now,
            sessions_next_60,
            context_timestamp,
        }
    }

    /// Whether the bundle carries no sessions at all.
    pub fn is_empty(&self) -> bool {
        self.total_active_sessions == 0 && self.total_upcoming_sessions == 0
    }
}

/// Aggregate counts across both views (admin dashboard).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStats {
    /// Distinct contractors with at least one session in progress.
    pub contractors_with_active_sessions: u64,
    /// Distinct contractors with at least one upcoming session.
    pub contractors_with_upcoming_sessions: u64,
    /// Distinct events with a session in progress.
    pub events_with_active_sessions: u64,
    /// Distinct events with an upcoming session.
    pub events_with_upcoming_sessions: u64,
    /// Rows in the "now" view.
    pub total_active_session_records: u64,
    /// Rows in the "next 60" view.
    pub total_upcoming_session_records: u64,
}
