//! Relevance and priority scoring for view rebuilds.
//!
//! - **Relevance** (sessions happening now): 100 when at least one of the
//!   session's focus areas matches the contractor's, otherwise 50.
//! - **Urgency** (upcoming sessions): 100 under 15 minutes to start, 75 under
//!   30 minutes, otherwise 50.
//! - **Priority** (upcoming sessions): urgency plus 10 per matching focus area.
//!
//! Window membership is inclusive on both ends.

use chrono::{DateTime, Duration, Utc};

use crate::constants::UPCOMING_WINDOW_MINUTES;

/// Relevance score when any focus area matches.
pub const RELEVANCE_MATCHED: u32 = 100;
/// Relevance score when nothing matches.
pub const RELEVANCE_BASELINE: u32 = 50;
/// Priority bonus per matching focus area.
pub const PRIORITY_PER_MATCH: u32 = 10;

/// Relevance score for a session given its focus-area match count.
pub fn relevance_score(match_count: u32) -> u32 {
    if match_count > 0 {
        RELEVANCE_MATCHED
    } else {
        RELEVANCE_BASELINE
    }
}

/// Urgency component of the priority score.
pub fn urgency_score(minutes_until_start: f64) -> u32 {
    if minutes_until_start < 15.0 {
        100
    } else if minutes_until_start < 30.0 {
        75
    } else {
        50
    }
}

/// Priority score combining urgency and focus-area matches.
pub fn priority_score(minutes_until_start: f64, match_count: u32) -> u32 {
    urgency_score(minutes_until_start).saturating_add(PRIORITY_PER_MATCH.saturating_mul(match_count))
}

/// Fractional minutes from `now` until `start` (negative once started).
#[allow(clippy::cast_precision_loss)]
pub fn minutes_until(start: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (start - now).num_milliseconds() as f64 / 60_000.0
}

/// Whether a session spanning `start..=end` is in progress at `now`.
pub fn is_active(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start <= now && now <= end
}

/// Whether a session starting at `start` begins within the upcoming window.
pub fn is_upcoming(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now <= start && start <= now + Duration::minutes(UPCOMING_WINDOW_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 13, h, m, 0).unwrap()
    }

    #[test]
    fn relevance_depends_only_on_any_match() {
        assert_eq!(relevance_score(0), 50);
        assert_eq!(relevance_score(1), 100);
        assert_eq!(relevance_score(7), 100);
    }

    #[test]
    fn urgency_thresholds() {
        assert_eq!(urgency_score(0.0), 100);
        assert_eq!(urgency_score(14.99), 100);
        assert_eq!(urgency_score(15.0), 75);
        assert_eq!(urgency_score(29.5), 75);
        assert_eq!(urgency_score(30.0), 50);
        assert_eq!(urgency_score(60.0), 50);
    }

    #[test]
    fn priority_adds_ten_per_match() {
        assert_eq!(priority_score(5.0, 0), 100);
        assert_eq!(priority_score(20.0, 2), 95);
        assert_eq!(priority_score(45.0, 3), 80);
    }

    #[test]
    fn minutes_until_is_fractional() {
        let now = at(9, 0);
        let start = now + Duration::seconds(90);
        assert!((minutes_until(start, now) - 1.5).abs() < f64::EPSILON);
        assert!(minutes_until(at(8, 30), now) < 0.0);
    }

    #[test]
    fn active_window_is_inclusive() {
        let now = at(10, 0);
        assert!(is_active(at(10, 0), at(11, 0), now));
        assert!(is_active(at(9, 0), at(10, 0), now));
        assert!(!is_active(at(10, 1), at(11, 0), now));
        assert!(!is_active(at(8, 0), at(9, 59), now));
    }

    #[test]
    fn upcoming_window_is_sixty_minutes() {
        let now = at(10, 0);
        assert!(is_upcoming(at(10, 0), now));
        assert!(is_upcoming(at(11, 0), now));
        assert!(!is_upcoming(at(11, 1), now));
        assert!(!is_upcoming(at(9, 59), now));
    }
}
