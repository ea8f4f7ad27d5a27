//! Collaborator seams of the refresher.
//!
//! The refresher never touches a database directly. It subscribes through a
//! [`NotificationSource`] and rebuilds through a [`ViewRebuilder`], so tests
//! can drive it with in-memory fakes and a paused clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;

/// A change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Channel it arrived on.
    pub channel: String,
    /// Payload text. Logged only; it never narrows the rebuild.
    pub payload: String,
}

/// An open subscription.
#[async_trait]
pub trait NotificationStream: Send {
    /// Wait for the next notification.
    ///
    /// `Some(Err(_))` reports a broken connection; `None` means the stream
    /// ended. Both are handled as a disconnect.
    async fn next(&mut self) -> Option<Result<Notification>>;

    /// Stop listening and release the connection.
    async fn unlisten(&mut self) -> Result<()>;
}

/// Opens subscriptions.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Subscribe to `channel`.
    async fn listen(&self, channel: &str) -> Result<Box<dyn NotificationStream>>;
}

/// Rebuilds the two views and reads source freshness.
#[async_trait]
pub trait ViewRebuilder: Send + Sync {
    /// Verify a rebuild connection can be obtained.
    async fn ping(&self) -> Result<()>;

    /// Replace the "happening now" view as of `now`. Returns the row count.
    async fn rebuild_sessions_now(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Replace the "next 60 minutes" view as of `now`. Returns the row count.
    async fn rebuild_sessions_next_60(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Most recent create/update time among scheduled sessions.
    async fn latest_source_change(&self) -> Result<Option<DateTime<Utc>>>;

    /// Persist a completed refresh so other processes can see it.
    async fn record_refresh(
        &self,
        at: DateTime<Utc>,
        sessions_now: usize,
        sessions_next_60: usize,
    ) -> Result<()>;

    /// Last refresh persisted by any process.
    async fn last_refresh(&self) -> Result<Option<DateTime<Utc>>>;
}
