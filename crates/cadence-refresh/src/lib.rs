//! # cadence-refresh
//!
//! Keeps the two relevance views in step with the schedule tables.
//!
//! - **[`refresher`]**: [`ViewRefresher`] with debounce, single-flight
//!   rebuilds, reconnect and cooperative shutdown
//! - **[`traits`]**: the notification and rebuild seams the refresher drives
//! - **[`sqlite`]**: outbox-polling notifications and pool-backed rebuilds
//! - **[`freshness`]**: staleness check against the latest source change
//! - **[`metrics`]**: refresh counters and Prometheus metric names
//! - **[`state`]**: lifecycle states published on a watch channel

#![deny(unsafe_code)]

pub mod errors;
pub mod freshness;
pub mod metrics;
pub mod refresher;
pub mod sqlite;
pub mod state;
pub mod traits;

pub use errors::{RefreshError, Result};
pub use freshness::{Freshness, FreshnessReason};
pub use metrics::MetricsSnapshot;
pub use refresher::{RefreshOutcome, RefresherConfig, ViewRefresher};
pub use sqlite::{SqliteNotificationSource, SqliteNotificationStream, SqliteViewRebuilder};
pub use state::RefresherState;
pub use traits::{Notification, NotificationSource, NotificationStream, ViewRebuilder};
