//! Source-of-truth schedule record.
//!
//! Sessions are owned and mutated by schedule-management collaborators. The
//! core only reads them when rebuilding views and checking freshness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, SessionId};
use crate::tags::FocusAreas;

/// A scheduled session (speaker slot) within an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID.
    pub id: SessionId,
    /// Parent event.
    pub event_id: EventId,
    /// Speaker display name.
    pub speaker_name: String,
    /// Session title.
    pub title: String,
    /// Short synopsis.
    pub synopsis: Option<String>,
    /// Room or stage.
    pub location: Option<String>,
    /// Start instant. Unscheduled sessions have none.
    pub start: Option<DateTime<Utc>>,
    /// End instant.
    pub end: Option<DateTime<Utc>>,
    /// IANA timezone of the parent event.
    pub timezone: String,
    /// Focus-area tags.
    pub focus_areas: FocusAreas,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has both a start and an end.
    pub fn is_scheduled(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}
