//! Staleness check of the views against the source tables.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a freshness check came out the way it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FreshnessReason {
    /// No scheduled session exists.
    #[serde(rename = "No sessions in database")]
    NoSessions,
    /// No refresh has completed yet.
    #[serde(rename = "Views never refreshed")]
    NeverRefreshed,
    /// A session changed after the last refresh completed.
    #[serde(rename = "Data changed after last refresh")]
    DataChanged,
    /// Nothing changed since the last refresh.
    #[serde(rename = "Views are fresh")]
    Fresh,
}

impl FreshnessReason {
    /// Human-readable reason.
    pub fn message(self) -> &'static str {
        match self {
            Self::NoSessions => "No sessions in database",
            Self::NeverRefreshed => "Views never refreshed",
            Self::DataChanged => "Data changed after last refresh",
            Self::Fresh => "Views are fresh",
        }
    }
}

/// Result of a freshness check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Freshness {
    /// Whether a refresh is due.
    pub needs_refresh: bool,
    /// Why.
    pub reason: FreshnessReason,
    /// Latest source change, reported when data changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_change: Option<DateTime<Utc>>,
    /// Last refresh, reported when data changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Compare the latest source change with the last successful refresh.
pub fn evaluate(
    latest_change: Option<DateTime<Utc>>,
    last_refresh: Option<DateTime<Utc>>,
) -> Freshness {
    let simple = |needs_refresh, reason| Freshness {
        needs_refresh,
        reason,
        latest_change: None,
        last_refresh: None,
    };
    let Some(latest) = latest_change else {
        return simple(false, FreshnessReason::NoSessions);
    };
    let Some(refreshed) = last_refresh else {
        return simple(true, FreshnessReason::NeverRefreshed);
    };
    if latest > refreshed {
        Freshness {
            needs_refresh: true,
            reason: FreshnessReason::DataChanged,
            latest_change: Some(latest),
            last_refresh: Some(refreshed),
        }
    } else {
        simple(false, FreshnessReason::Fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 13, 9, m, 0).unwrap()
    }

    #[test]
    fn no_sessions_wins_over_never_refreshed() {
        let f = evaluate(None, None);
        assert!(!f.needs_refresh);
        assert_eq!(f.reason, FreshnessReason::NoSessions);
    }

    #[test]
    fn never_refreshed_needs_refresh() {
        let f = evaluate(Some(at(0)), None);
        assert!(f.needs_refresh);
        assert_eq!(f.reason.message(), "Views never refreshed");
    }

    #[test]
    fn change_after_refresh_reports_both_times() {
        let f = evaluate(Some(at(5)), Some(at(1)));
        assert!(f.needs_refresh);
        assert_eq!(f.reason, FreshnessReason::DataChanged);
        assert_eq!(f.latest_change, Some(at(5)));
        assert_eq!(f.last_refresh, Some(at(1)));
    }

    #[test]
    fn equal_times_are_fresh() {
        let f = evaluate(Some(at(5)), Some(at(5)));
        assert!(!f.needs_refresh);
        assert_eq!(f.reason, FreshnessReason::Fresh);
    }

    #[test]
    fn serializes_reason_text() {
        let json = serde_json::to_value(evaluate(Some(at(5)), Some(at(1)))).unwrap();
        assert_eq!(json["needsRefresh"], true);
        assert_eq!(json["reason"], "Data changed after last refresh");
        assert!(json.get("latestChange").is_some());

        let json = serde_json::to_value(evaluate(None, None)).unwrap();
        assert!(json.get("latestChange").is_none());
    }
}
