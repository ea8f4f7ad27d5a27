//! Cache-aside assembly of per-contractor event context.
//!
//! [`ContextAssembler`] is the only read path consumers use. Bundles are
//! served from the cache when present; otherwise both views are queried
//! concurrently under the request timeout, and the fresh bundle is written
//! back. The cache is strictly best effort: when it is down, reads fall
//! through to the views and writes are skipped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cadence_cache::{CacheKey, TypedCache};
use cadence_core::{
    Clock, ContextStats, ContractorId, EventContext, SessionContext, UpcomingSessionContext,
};
use cadence_settings::CadenceSettings;
use tracing::{debug, warn};

use crate::errors::{ContextError, Result};
use crate::metrics::{
    EVENT_CONTEXT_CACHE_HITS_TOTAL, EVENT_CONTEXT_CACHE_MISSES_TOTAL, VIEW_QUERY_ERRORS_TOTAL,
};
use crate::query::ViewQuery;

/// Assembler tuning.
#[derive(Clone, Debug)]
pub struct AssemblerConfig {
    /// Whether bundles are cached at all.
    pub cache_enabled: bool,
    /// Lifetime of a cached bundle.
    pub event_context_ttl: Duration,
    /// Upper bound on each view read.
    pub query_timeout: Duration,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self::from(&CadenceSettings::default())
    }
}

impl From<&CadenceSettings> for AssemblerConfig {
    fn from(settings: &CadenceSettings) -> Self {
        Self {
            cache_enabled: settings.cache.enabled,
            event_context_ttl: settings.cache.event_context_ttl(),
            query_timeout: settings.context.query_timeout(),
        }
    }
}

/// Reads the relevance views and assembles [`EventContext`] bundles.
#[derive(Clone)]
pub struct ContextAssembler {
    views: Arc<dyn ViewQuery>,
    cache: TypedCache,
    clock: Arc<dyn Clock>,
    config: AssemblerConfig,
}

impl ContextAssembler {
    /// Build an assembler.
    pub fn new(
        views: Arc<dyn ViewQuery>,
        cache: TypedCache,
        clock: Arc<dyn Clock>,
        config: AssemblerConfig,
    ) -> Self {
        Self {
            views,
            cache,
            clock,
            config,
        }
    }

    /// Sessions in progress for a contractor, ranked.
    pub async fn get_sessions_now(&self, contractor: ContractorId) -> Result<Vec<SessionContext>> {
        self.bounded(self.views.sessions_now(contractor)).await
    }

    /// Sessions starting within the hour for a contractor, ranked.
    pub async fn get_sessions_next_60(
        &self,
        contractor: ContractorId,
    ) -> Result<Vec<UpcomingSessionContext>> {
        self.bounded(self.views.sessions_next_60(contractor)).await
    }

    /// Cached or freshly assembled bundle for a contractor.
    ///
    /// A failed or timed-out query is returned as an error and nothing is
    /// written to the cache.
    pub async fn get_event_context(&self, contractor: ContractorId) -> Result<EventContext> {
        let key = CacheKey::event_context(contractor);

        if self.config.cache_enabled {
            if let Some(cached) = self.cache.get_json::<EventContext>(&key).await {
                metrics::counter!(EVENT_CONTEXT_CACHE_HITS_TOTAL).increment(1);
                debug!(contractor = contractor.get(), "event context served from cache");
                return Ok(cached);
            }
            metrics::counter!(EVENT_CONTEXT_CACHE_MISSES_TOTAL).increment(1);
        }

        let (now_rows, upcoming_rows) = self
            .bounded(async {
                tokio::try_join!(
                    self.views.sessions_now(contractor),
                    self.views.sessions_next_60(contractor)
                )
            })
            .await?;

        let context = EventContext::new(now_rows, upcoming_rows, self.clock.now());
        debug!(
            contractor = contractor.get(),
            active = context.total_active_sessions,
            upcoming = context.total_upcoming_sessions,
            "event context assembled"
        );

        if self.config.cache_enabled {
            let _ = self
                .cache
                .set_json(&key, &context, self.config.event_context_ttl)
                .await;
        }
        Ok(context)
    }

    /// Drop a contractor's cached bundle. Returns whether an entry existed.
    pub async fn invalidate_event_context(&self, contractor: ContractorId) -> bool {
        self.cache.delete(&CacheKey::event_context(contractor)).await
    }

    /// Aggregate counts across both views.
    pub async fn get_context_stats(&self) -> Result<ContextStats> {
        self.bounded(self.views.stats()).await
    }

    /// The cache front end, for stats and health checks.
    pub fn cache(&self) -> &TypedCache {
        &self.cache
    }

    async fn bounded<T>(&self, query: impl Future<Output = Result<T>>) -> Result<T> {
        let outcome = match tokio::time::timeout(self.config.query_timeout, query).await {
            Ok(result) => result,
            Err(_) => Err(ContextError::Timeout(self.config.query_timeout)),
        };
        if let Err(error) = &outcome {
            metrics::counter!(VIEW_QUERY_ERRORS_TOTAL).increment(1);
            warn!(error = %error, "view query failed");
        }
        outcome
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SqliteViewQuery;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use cadence_cache::MemoryCache;
    use cadence_core::{EventId, FocusAreas, ManualClock, SessionId};
    use cadence_store::{
        ConnectionConfig, NewSession, ScheduleRepo, ViewRepo, new_in_memory, run_migrations,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CONTRACTOR: ContractorId = ContractorId::new(42);

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 13, h, m, 0).unwrap()
    }

    fn now_row(session: i64, relevance: u32, matches: u32) -> SessionContext {
        SessionContext {
            session_id: SessionId::new(session),
            event_id: EventId::new(1),
            contractor_id: CONTRACTOR,
            speaker_name: "Speaker".into(),
            session_title: format!("Session {session}"),
            session_description: None,
            session_location: Some("Hall A".into()),
            session_time: at(8, 30),
            session_end: at(9, 30),
            event_name: "Growth Expo".into(),
            event_timezone: "UTC".into(),
            focus_areas: FocusAreas::new(["sales"]),
            relevance_score: relevance,
            focus_area_match_count: matches,
        }
    }

    fn upcoming_row(session: i64, minutes: f64, priority: u32) -> UpcomingSessionContext {
        UpcomingSessionContext {
            session_id: SessionId::new(session),
            event_id: EventId::new(1),
            contractor_id: CONTRACTOR,
            speaker_name: "Speaker".into(),
            session_title: format!("Session {session}"),
            session_description: None,
            session_location: None,
            session_time: at(9, 20),
            session_end: at(10, 0),
            event_name: "Growth Expo".into(),
            event_timezone: "UTC".into(),
            focus_areas: FocusAreas::default(),
            minutes_until_start: minutes,
            match_count: 0,
            priority_score: priority,
        }
    }

    /// In-memory views with a query counter and optional latency.
    #[derive(Default)]
    struct FakeViews {
        now: Vec<SessionContext>,
        upcoming: Vec<UpcomingSessionContext>,
        queries: AtomicUsize,
        delay: Option<Duration>,
        fail: bool,
    }

    impl FakeViews {
        async fn touch(&self) -> Result<()> {
            let _ = self.queries.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(ContextError::Query("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ViewQuery for FakeViews {
        async fn sessions_now(&self, _: ContractorId) -> Result<Vec<SessionContext>> {
            self.touch().await?;
            Ok(self.now.clone())
        }

        async fn sessions_next_60(&self, _: ContractorId) -> Result<Vec<UpcomingSessionContext>> {
            self.touch().await?;
            Ok(self.upcoming.clone())
        }

        async fn stats(&self) -> Result<ContextStats> {
            self.touch().await?;
            Ok(ContextStats::default())
        }
    }

    struct Harness {
        assembler: ContextAssembler,
        views: Arc<FakeViews>,
        store: Arc<MemoryCache>,
        clock: ManualClock,
    }

    fn harness(views: FakeViews) -> Harness {
        let views = Arc::new(views);
        let store = Arc::new(MemoryCache::new());
        let clock = ManualClock::new(at(9, 0));
        let assembler = ContextAssembler::new(
            views.clone(),
            TypedCache::new(store.clone()),
            Arc::new(clock.clone()),
            AssemblerConfig::default(),
        );
        Harness {
            assembler,
            views,
            store,
            clock,
        }
    }

    fn populated() -> FakeViews {
        FakeViews {
            now: vec![now_row(1, 100, 2)],
            upcoming: vec![upcoming_row(2, 20.5, 75)],
            ..FakeViews::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_read_within_ttl_is_byte_identical() {
        let h = harness(populated());

        let first = h.assembler.get_event_context(CONTRACTOR).await.unwrap();
        h.clock.advance(chrono::Duration::seconds(30));
        tokio::time::advance(Duration::from_secs(30)).await;
        let second = h.assembler.get_event_context(CONTRACTOR).await.unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(h.views.queries.load(Ordering::SeqCst), 2);
        assert_eq!(h.assembler.cache().stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cached_fractional_minutes_survive_exactly() {
        // Millisecond offsets over 60_000 are rarely exact in binary.
        let upcoming: Vec<_> = (0..600_i64)
            .map(|i| {
                let ms = 6_980 + i * 5_981;
                #[allow(clippy::cast_precision_loss)]
                let minutes = ms as f64 / 60_000.0;
                upcoming_row(i, minutes, 100)
            })
            .collect();
        let h = harness(FakeViews {
            upcoming,
            ..FakeViews::default()
        });

        let first = h.assembler.get_event_context(CONTRACTOR).await.unwrap();
        let second = h.assembler.get_event_context(CONTRACTOR).await.unwrap();
        assert_eq!(h.assembler.cache().stats().hits, 1);

        for (a, b) in first.sessions_next_60.iter().zip(&second.sessions_next_60) {
            assert_eq!(a.minutes_until_start.to_bits(), b.minutes_until_start.to_bits());
        }
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_reassembled_with_newer_timestamp() {
        let h = harness(populated());

        let first = h.assembler.get_event_context(CONTRACTOR).await.unwrap();
        h.clock.advance(chrono::Duration::seconds(61));
        tokio::time::advance(Duration::from_secs(61)).await;
        let second = h.assembler.get_event_context(CONTRACTOR).await.unwrap();

        assert!(second.context_timestamp > first.context_timestamp);
        assert_eq!(h.views.queries.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cache_outage_still_returns_bundle() {
        let h = harness(populated());
        h.store.set_available(false);

        let ctx = h.assembler.get_event_context(ContractorId::new(42)).await.unwrap();
        assert_eq!(ctx.total_active_sessions, 1);
        assert_eq!(ctx.total_upcoming_sessions, 1);
        assert_eq!(ctx.context_timestamp, at(9, 0));

        h.store.set_available(true);
        assert!(h.store.is_empty(), "no write while the cache was down");
    }

    #[tokio::test]
    async fn disabled_cache_always_assembles() {
        let views = Arc::new(populated());
        let store = Arc::new(MemoryCache::new());
        let assembler = ContextAssembler::new(
            views.clone(),
            TypedCache::new(store.clone()),
            Arc::new(ManualClock::new(at(9, 0))),
            AssemblerConfig {
                cache_enabled: false,
                ..AssemblerConfig::default()
            },
        );

        let _ = assembler.get_event_context(CONTRACTOR).await.unwrap();
        let _ = assembler.get_event_context(CONTRACTOR).await.unwrap();
        assert_eq!(views.queries.load(Ordering::SeqCst), 4);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failed_query_is_error_and_not_cached() {
        let h = harness(FakeViews {
            fail: true,
            ..populated()
        });

        assert_matches!(
            h.assembler.get_event_context(CONTRACTOR).await,
            Err(ContextError::Query(_))
        );
        assert!(h.store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_query_times_out() {
        let h = harness(FakeViews {
            delay: Some(Duration::from_secs(30)),
            ..populated()
        });

        assert_matches!(
            h.assembler.get_event_context(CONTRACTOR).await,
            Err(ContextError::Timeout(d)) if d == Duration::from_secs(5)
        );
        assert_matches!(
            h.assembler.get_sessions_now(CONTRACTOR).await,
            Err(ContextError::Timeout(_))
        );
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn invalidate_forces_reassembly() {
        let h = harness(populated());

        let _ = h.assembler.get_event_context(CONTRACTOR).await.unwrap();
        assert!(h.assembler.invalidate_event_context(CONTRACTOR).await);
        assert!(!h.assembler.invalidate_event_context(CONTRACTOR).await);
        let _ = h.assembler.get_event_context(CONTRACTOR).await.unwrap();
        assert_eq!(h.views.queries.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_views_give_zero_counts() {
        let h = harness(FakeViews::default());
        let ctx = h.assembler.get_event_context(CONTRACTOR).await.unwrap();
        assert!(ctx.is_empty());
        assert_eq!(ctx.total_active_sessions, 0);
        assert_eq!(ctx.total_upcoming_sessions, 0);

        let text = crate::format::format_for_ai(&ctx);
        assert!(text.contains("No sessions happening right now"));
        assert!(text.contains("No sessions in the next 60 minutes"));
    }

    #[tokio::test]
    async fn sqlite_views_rank_by_relevance_then_matches() {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        let contractor = {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
            let event = ScheduleRepo::insert_event(&conn, "Growth Expo", "UTC").unwrap();
            let contractor =
                ScheduleRepo::insert_contractor(&conn, "Acme", &FocusAreas::new(["sales", "hiring"]))
                    .unwrap();
            let _ = ScheduleRepo::add_attendee(&conn, event, contractor).unwrap();
            for (title, start, tags) in [
                ("Open floor", at(8, 30), &[] as &[&str]),
                ("Pipeline", at(8, 45), &["sales"][..]),
                ("Sales hiring", at(8, 50), &["sales", "hiring"][..]),
                ("Keynote", at(9, 10), &[][..]),
                ("Objections", at(9, 20), &["sales"][..]),
                ("Recruiting", at(9, 40), &["sales", "hiring"][..]),
                ("Interviews", at(9, 5), &["hiring"][..]),
            ] {
                let tags = FocusAreas::new(tags.iter().copied());
                let _ = ScheduleRepo::insert_session(
                    &conn,
                    &NewSession {
                        event_id: event,
                        speaker_name: "Speaker",
                        title,
                        synopsis: None,
                        location: None,
                        start: Some(start),
                        end: Some(start + chrono::Duration::minutes(60)),
                        focus_areas: &tags,
                    },
                    at(7, 0),
                )
                .unwrap();
            }
            let _ = ViewRepo::rebuild_sessions_now(&conn, at(9, 0)).unwrap();
            let _ = ViewRepo::rebuild_sessions_next_60(&conn, at(9, 0)).unwrap();
            contractor
        };

        let assembler = ContextAssembler::new(
            Arc::new(SqliteViewQuery::new(pool)),
            TypedCache::new(Arc::new(MemoryCache::new())),
            Arc::new(ManualClock::new(at(9, 0))),
            AssemblerConfig::default(),
        );

        let ctx = assembler.get_event_context(contractor).await.unwrap();
        let now: Vec<_> = ctx
            .sessions_now
            .iter()
            .map(|r| (r.session_title.as_str(), r.relevance_score, r.focus_area_match_count))
            .collect();
        assert_eq!(
            now,
            [("Sales hiring", 100, 2), ("Pipeline", 100, 1), ("Open floor", 50, 0)]
        );
        let upcoming: Vec<_> = ctx
            .sessions_next_60
            .iter()
            .map(|r| (r.session_title.as_str(), r.priority_score))
            .collect();
        // Urgency 100/75/50 plus 10 per matching focus area.
        assert_eq!(
            upcoming,
            [("Interviews", 110), ("Keynote", 100), ("Objections", 85), ("Recruiting", 70)]
        );

        let stats = assembler.get_context_stats().await.unwrap();
        assert_eq!(stats.total_active_session_records, 3);
        assert_eq!(stats.total_upcoming_session_records, 4);
        assert_eq!(stats.contractors_with_active_sessions, 1);
    }
}
