//! Plain-text rendering of an [`EventContext`] for AI prompts.
//!
//! Output is a pure function of the bundle: no clock reads, no locale
//! lookups. Times are shown in the event's own timezone; an unknown zone
//! name falls back to UTC.

use cadence_core::{EventContext, SessionContext, UpcomingSessionContext};
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

const RULE_WIDTH: usize = 60;
const NO_SESSIONS_NOW: &str = "No sessions happening right now";
const NO_SESSIONS_UPCOMING: &str = "No sessions in the next 60 minutes";
const UNKNOWN_LOCATION: &str = "TBA";

/// Render a bundle as prompt text.
pub fn format_for_ai(context: &EventContext) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut parts: Vec<String> = vec![
        format!(
            "EVENT CONTEXT (as of {})",
            context
                .context_timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
        rule.clone(),
    ];

    if context.sessions_now.is_empty() {
        parts.push(format!("\n✅ {NO_SESSIONS_NOW}"));
    } else {
        parts.push("\n🔴 SESSIONS HAPPENING RIGHT NOW:".to_string());
        for (index, session) in context.sessions_now.iter().enumerate() {
            push_now(&mut parts, index + 1, session);
        }
    }

    if context.sessions_next_60.is_empty() {
        parts.push(format!("\n\n✅ {NO_SESSIONS_UPCOMING}"));
    } else {
        parts.push("\n\n⏰ UPCOMING SESSIONS (Next 60 minutes):".to_string());
        for (index, session) in context.sessions_next_60.iter().enumerate() {
            push_upcoming(&mut parts, index + 1, session);
        }
    }

    parts.push(format!("\n{rule}"));
    parts.join("\n")
}

fn push_now(parts: &mut Vec<String>, position: usize, session: &SessionContext) {
    let tz = zone(&session.event_timezone);
    parts.push(format!(
        "\n{position}. \"{}\" by {}",
        session.session_title, session.speaker_name
    ));
    parts.push(format!("   Event: {}", session.event_name));
    parts.push(format!("   Location: {}", location(session.session_location.as_deref())));
    parts.push(format!(
        "   Time: {} - {}",
        date_time(session.session_time, tz),
        clock_time(session.session_end, tz)
    ));
    push_matches(parts, session.focus_area_match_count);
    parts.push(format!("   Relevance Score: {}/100", session.relevance_score));
}

fn push_upcoming(parts: &mut Vec<String>, position: usize, session: &UpcomingSessionContext) {
    let tz = zone(&session.event_timezone);
    parts.push(format!(
        "\n{position}. \"{}\" by {}",
        session.session_title, session.speaker_name
    ));
    parts.push(format!("   Event: {}", session.event_name));
    parts.push(format!("   Location: {}", location(session.session_location.as_deref())));
    parts.push(format!(
        "   Starts in: {} minutes",
        rounded_minutes(session.minutes_until_start)
    ));
    parts.push(format!("   Time: {}", clock_time(session.session_time, tz)));
    push_matches(parts, session.match_count);
    parts.push(format!("   Priority Score: {}/100", session.priority_score));
}

fn push_matches(parts: &mut Vec<String>, count: u32) {
    if count > 0 {
        parts.push(format!("   ⭐ {count} of your focus areas match this session"));
    }
}

fn zone(name: &str) -> Tz {
    name.parse().unwrap_or(Tz::UTC)
}

fn location(raw: Option<&str>) -> &str {
    match raw.map(str::trim) {
        Some(loc) if !loc.is_empty() => loc,
        _ => UNKNOWN_LOCATION,
    }
}

fn date_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%b %-d, %Y, %-I:%M %p").to_string()
}

fn clock_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%-I:%M %p").to_string()
}

#[allow(clippy::cast_possible_truncation)]
fn rounded_minutes(minutes: f64) -> i64 {
    minutes.round() as i64
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
