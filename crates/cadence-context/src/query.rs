//! Read-only access to the relevance views.

use async_trait::async_trait;
use cadence_core::{ContextStats, ContractorId, SessionContext, UpcomingSessionContext};
use cadence_store::{ConnectionPool, StoreError, ViewRepo};
use rusqlite::Connection;

use crate::errors::{ContextError, Result};

/// Per-contractor view reads.
#[async_trait]
pub trait ViewQuery: Send + Sync {
    /// Sessions in progress, relevance desc then match count desc.
    async fn sessions_now(&self, contractor: ContractorId) -> Result<Vec<SessionContext>>;

    /// Sessions starting within the hour, priority desc then soonest first.
    async fn sessions_next_60(&self, contractor: ContractorId) -> Result<Vec<UpcomingSessionContext>>;

    /// Aggregate counts across both views.
    async fn stats(&self) -> Result<ContextStats>;
}

/// [`ViewQuery`] over the shared connection pool.
#[derive(Clone)]
pub struct SqliteViewQuery {
    pool: ConnectionPool,
}

impl SqliteViewQuery {
    /// Wrap the query pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> std::result::Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await;
        match joined {
            Ok(result) => result.map_err(|e| ContextError::Query(e.to_string())),
            Err(join) => Err(ContextError::Query(format!("blocking task failed: {join}"))),
        }
    }
}

#[async_trait]
impl ViewQuery for SqliteViewQuery {
    async fn sessions_now(&self, contractor: ContractorId) -> Result<Vec<SessionContext>> {
        self.run(move |conn| ViewRepo::sessions_now(conn, contractor)).await
    }

    async fn sessions_next_60(&self, contractor: ContractorId) -> Result<Vec<UpcomingSessionContext>> {
        self.run(move |conn| ViewRepo::sessions_next_60(conn, contractor)).await
    }

    async fn stats(&self) -> Result<ContextStats> {
        self.run(ViewRepo::stats).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
