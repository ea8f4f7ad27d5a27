//! `SQLite` implementations of the refresher seams.
//!
//! [`SqliteNotificationSource`] opens a dedicated connection per
//! subscription and polls the `change_notifications` outbox. Opening a
//! subscription discards rows written while nobody was listening, so the
//! outbox stays bounded between runs. The listener never borrows from the
//! query pool. [`SqliteViewRebuilder`] runs rebuilds
//! on the pool through `spawn_blocking`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cadence_store::{
    ConnectionPool, NotificationRepo, ScheduleRepo, StoreError, ViewRepo, open_dedicated,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::debug;

use crate::errors::{RefreshError, Result};
use crate::traits::{Notification, NotificationSource, NotificationStream, ViewRebuilder};

const POLL_BATCH: u32 = 256;

async fn blocking<T, F>(f: F) -> std::result::Result<T, String>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, StoreError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(join) => Err(format!("blocking task failed: {join}")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Notification source
// ─────────────────────────────────────────────────────────────────────────────

/// Outbox-polling notification source.
///
/// Requires a file-backed database: each subscription opens its own
/// connection to `path`.
#[derive(Clone, Debug)]
pub struct SqliteNotificationSource {
    path: String,
    busy_timeout_ms: u32,
    poll_interval: Duration,
}

impl SqliteNotificationSource {
    /// Create a source for the database at `path`.
    pub fn new(path: impl Into<String>, busy_timeout_ms: u32, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms,
            poll_interval,
        }
    }
}

#[async_trait]
impl NotificationSource for SqliteNotificationSource {
    async fn listen(&self, channel: &str) -> Result<Box<dyn NotificationStream>> {
        let path = self.path.clone();
        let busy_timeout_ms = self.busy_timeout_ms;
        let owned_channel = channel.to_string();
        let (conn, cursor, discarded) = blocking(move || {
            let conn = open_dedicated(&path, busy_timeout_ms)?;
            let cursor = NotificationRepo::latest_id(&conn, &owned_channel)?;
            // Nothing before the cursor will ever be delivered.
            let discarded = NotificationRepo::prune(&conn, &owned_channel, cursor)?;
            Ok((conn, cursor, discarded))
        })
        .await
        .map_err(RefreshError::Connection)?;

        debug!(channel, cursor, discarded, "outbox subscription opened");
        Ok(Box::new(SqliteNotificationStream {
            conn: Some(Arc::new(Mutex::new(conn))),
            channel: channel.to_string(),
            cursor,
            pending: VecDeque::new(),
            poll_interval: self.poll_interval,
        }))
    }
}

/// Open outbox subscription.
pub struct SqliteNotificationStream {
    conn: Option<Arc<Mutex<Connection>>>,
    channel: String,
    cursor: i64,
    pending: VecDeque<Notification>,
    poll_interval: Duration,
}

impl SqliteNotificationStream {
    /// Fetch everything past the cursor and prune what was delivered.
    async fn poll_once(&mut self, conn: Arc<Mutex<Connection>>) -> Result<()> {
        let channel = self.channel.clone();
        let after = self.cursor;
        let rows = blocking(move || {
            let conn = conn.lock();
            let rows = NotificationRepo::poll(&conn, &channel, after, POLL_BATCH)?;
            if let Some(last) = rows.last() {
                let _ = NotificationRepo::prune(&conn, &channel, last.id)?;
            }
            Ok(rows)
        })
        .await
        .map_err(RefreshError::Connection)?;

        for row in rows {
            self.cursor = row.id;
            self.pending.push_back(Notification {
                channel: row.channel,
                payload: row.payload,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStream for SqliteNotificationStream {
    async fn next(&mut self) -> Option<Result<Notification>> {
        loop {
            if let Some(notification) = self.pending.pop_front() {
                return Some(Ok(notification));
            }
            let conn = self.conn.clone()?;
            tokio::time::sleep(self.poll_interval).await;
            if let Err(error) = self.poll_once(conn).await {
                return Some(Err(error));
            }
        }
    }

    async fn unlisten(&mut self) -> Result<()> {
        if self.conn.take().is_some() {
            debug!(channel = %self.channel, "outbox subscription closed");
        }
        self.pending.clear();
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// View rebuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Pool-backed view rebuilder.
#[derive(Clone)]
pub struct SqliteViewRebuilder {
    pool: ConnectionPool,
}

impl SqliteViewRebuilder {
    /// Wrap the query pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ViewRebuilder for SqliteViewRebuilder {
    async fn ping(&self) -> Result<()> {
        let pool = self.pool.clone();
        blocking(move || {
            let conn = pool.get()?;
            conn.execute_batch("SELECT 1")?;
            Ok(())
        })
        .await
        .map_err(RefreshError::Connection)
    }

    async fn rebuild_sessions_now(&self, now: DateTime<Utc>) -> Result<usize> {
        let pool = self.pool.clone();
        blocking(move || ViewRepo::rebuild_sessions_now(&*pool.get()?, now))
            .await
            .map_err(RefreshError::Rebuild)
    }

    async fn rebuild_sessions_next_60(&self, now: DateTime<Utc>) -> Result<usize> {
        let pool = self.pool.clone();
        blocking(move || ViewRepo::rebuild_sessions_next_60(&*pool.get()?, now))
            .await
            .map_err(RefreshError::Rebuild)
    }

    async fn latest_source_change(&self) -> Result<Option<DateTime<Utc>>> {
        let pool = self.pool.clone();
        blocking(move || ScheduleRepo::latest_source_change(&*pool.get()?))
            .await
            .map_err(RefreshError::Storage)
    }

    async fn record_refresh(
        &self,
        at: DateTime<Utc>,
        sessions_now: usize,
        sessions_next_60: usize,
    ) -> Result<()> {
        let pool = self.pool.clone();
        blocking(move || ViewRepo::record_refresh(&*pool.get()?, at, sessions_now, sessions_next_60))
            .await
            .map_err(RefreshError::Storage)
    }

    async fn last_refresh(&self) -> Result<Option<DateTime<Utc>>> {
        let pool = self.pool.clone();
        blocking(move || ViewRepo::last_refresh(&*pool.get()?))
            .await
            .map_err(RefreshError::Storage)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
