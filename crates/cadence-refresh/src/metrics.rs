//! Refresh health counters.
//!
//! [`RefreshMetrics`] is owned by one refresher and read by health checks
//! through [`MetricsSnapshot`]. The same events are also reported to the
//! process-wide `metrics` recorder under the names below.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Completed refreshes (counter).
pub const VIEW_REFRESH_TOTAL: &str = "view_refresh_total";
/// Failed refreshes (counter).
pub const VIEW_REFRESH_ERRORS_TOTAL: &str = "view_refresh_errors_total";
/// Refresh duration (histogram).
pub const VIEW_REFRESH_DURATION_SECONDS: &str = "view_refresh_duration_seconds";
/// Notifications delivered to the refresher (counter).
pub const NOTIFICATIONS_RECEIVED_TOTAL: &str = "notifications_received_total";
/// Resubscription attempts (counter).
pub const NOTIFICATION_RECONNECTS_TOTAL: &str = "notification_reconnects_total";

/// Mutable refresh counters.
#[derive(Clone, Debug, Default)]
pub struct RefreshMetrics {
    /// Completion time of the last successful refresh.
    pub last_refresh: Option<DateTime<Utc>>,
    /// Successful refreshes.
    pub total_refreshes: u64,
    /// Failed refreshes plus lost subscriptions.
    pub errors: u64,
    /// Message of the most recent error.
    pub last_error: Option<String>,
    /// Whether the subscription is up.
    pub is_listening: bool,
}

impl RefreshMetrics {
    /// Record a successful refresh.
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_refresh = Some(at);
        self.total_refreshes += 1;
    }

    /// Record an error.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        self.last_error = Some(message.into());
    }

    /// Health-surface view of the counters.
    pub fn snapshot(&self, debounce_ms: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            last_refresh: self.last_refresh,
            total_refreshes: self.total_refreshes,
            errors: self.errors,
            last_error: self.last_error.clone(),
            is_listening: self.is_listening,
            debounce_ms,
        }
    }
}

/// Health surface of a refresher.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Completion time of the last successful refresh.
    pub last_refresh: Option<DateTime<Utc>>,
    /// Successful refreshes.
    pub total_refreshes: u64,
    /// Errors seen.
    pub errors: u64,
    /// Most recent error message.
    pub last_error: Option<String>,
    /// Whether the subscription is up.
    pub is_listening: bool,
    /// Configured debounce window.
    pub debounce_ms: u64,
}
