//! Debounced, single-flight view refresher.
//!
//! Two background tasks run per refresher:
//!
//! - the **listener** owns the notification stream, forwards every
//!   notification as a reset signal, and resubscribes when the stream
//!   breaks (first attempt after `reconnect_delay`, then every
//!   `reconnect_retry_delay` until shutdown). A restored subscription also
//!   sends one reset, since writes during the outage were never delivered;
//! - the **debouncer** owns the single timer. Each reset pushes the deadline
//!   out by one debounce window; when the deadline passes it starts a
//!   rebuild in its own task so notifications arriving mid-rebuild arm the
//!   next window instead of being lost.
//!
//! Rebuilds are serialized by an async mutex, so at most one is in flight
//! no matter whether it came from the timer or [`ViewRefresher::manual_refresh`].
//! Both views rebuild concurrently inside a refresh.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::Clock;
use cadence_settings::RefresherSettings;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{RefreshError, Result};
use crate::freshness::{self, Freshness};
use crate::metrics::{
    MetricsSnapshot, NOTIFICATION_RECONNECTS_TOTAL, NOTIFICATIONS_RECEIVED_TOTAL, RefreshMetrics,
    VIEW_REFRESH_DURATION_SECONDS, VIEW_REFRESH_ERRORS_TOTAL, VIEW_REFRESH_TOTAL,
};
use crate::state::RefresherState;
use crate::traits::{NotificationSource, NotificationStream, ViewRebuilder};

/// Refresher timing and channel configuration.
#[derive(Clone, Debug)]
pub struct RefresherConfig {
    /// Notification channel.
    pub channel: String,
    /// Quiet period before a rebuild.
    pub debounce: Duration,
    /// Wait before the first resubscribe attempt.
    pub reconnect_delay: Duration,
    /// Wait between later resubscribe attempts.
    pub reconnect_retry_delay: Duration,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self::from(&RefresherSettings::default())
    }
}

impl From<&RefresherSettings> for RefresherConfig {
    fn from(settings: &RefresherSettings) -> Self {
        Self {
            channel: settings.channel.clone(),
            debounce: settings.debounce(),
            reconnect_delay: settings.reconnect_delay(),
            reconnect_retry_delay: settings.reconnect_retry_delay(),
        }
    }
}

/// What a completed refresh reports.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    /// Wall time spent rebuilding.
    #[serde(rename = "durationMs", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Completion time.
    pub timestamp: DateTime<Utc>,
    /// Rows in the "now" view.
    pub sessions_now: usize,
    /// Rows in the "next 60" view.
    pub sessions_next_60: usize,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

struct Inner {
    source: Arc<dyn NotificationSource>,
    rebuilder: Arc<dyn ViewRebuilder>,
    clock: Arc<dyn Clock>,
    config: RefresherConfig,
    metrics: Mutex<RefreshMetrics>,
    state: watch::Sender<RefresherState>,
    rebuild_lock: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
}

/// Keeps the relevance views within one debounce window of the source.
pub struct ViewRefresher {
    inner: Arc<Inner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ViewRefresher {
    /// Build a refresher. Nothing runs until [`ViewRefresher::initialize`].
    pub fn new(
        source: Arc<dyn NotificationSource>,
        rebuilder: Arc<dyn ViewRebuilder>,
        clock: Arc<dyn Clock>,
        config: RefresherConfig,
    ) -> Self {
        let (state, _) = watch::channel(RefresherState::Uninitialized);
        Self {
            inner: Arc::new(Inner {
                source,
                rebuilder,
                clock,
                config,
                metrics: Mutex::new(RefreshMetrics::default()),
                state,
                rebuild_lock: tokio::sync::Mutex::new(()),
                cancel: CancellationToken::new(),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to the change channel and start the background tasks.
    ///
    /// Calling it again while running is a no-op. A failure leaves the
    /// refresher uninitialized so the caller can retry.
    ///
    /// # Errors
    ///
    /// [`RefreshError::Connection`] if the subscription or the rebuild pool
    /// is unreachable, [`RefreshError::ShutDown`] after shutdown.
    pub async fn initialize(&self) -> Result<()> {
        if self.inner.cancel.is_cancelled() {
            return Err(RefreshError::ShutDown);
        }
        if !self.tasks.lock().is_empty() {
            debug!("refresher already initialized");
            return Ok(());
        }

        let stream = self.inner.connect().await?;

        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            // Lost a race with a concurrent initialize; keep the winner's tasks.
            drop(tasks);
            release(stream).await;
            return Ok(());
        }
        self.inner.set_listening(true);
        let _ = self.inner.transition(|_| Some(RefresherState::Listening));

        let (reset_tx, reset_rx) = mpsc::unbounded_channel();
        tasks.push(tokio::spawn(run_listener(self.inner.clone(), stream, reset_tx)));
        tasks.push(tokio::spawn(run_debouncer(self.inner.clone(), reset_rx)));
        drop(tasks);

        info!(
            channel = %self.inner.config.channel,
            debounce_ms = self.debounce_ms(),
            "view refresher listening"
        );
        Ok(())
    }

    /// Rebuild both views now, waiting for any in-flight rebuild first.
    ///
    /// # Errors
    ///
    /// [`RefreshError::Rebuild`] if either view failed to rebuild; the
    /// previous snapshot of that view is kept.
    pub async fn refresh_views(&self) -> Result<RefreshOutcome> {
        self.inner.refresh_views().await
    }

    /// Operator-triggered refresh that bypasses the debounce window.
    ///
    /// # Errors
    ///
    /// As [`ViewRefresher::refresh_views`], or [`RefreshError::ShutDown`].
    pub async fn manual_refresh(&self) -> Result<RefreshOutcome> {
        if self.inner.cancel.is_cancelled() {
            return Err(RefreshError::ShutDown);
        }
        info!("manual view refresh requested");
        self.inner.refresh_views().await
    }

    /// Whether the views lag behind the source tables.
    ///
    /// Refreshes completed by other processes count too.
    ///
    /// # Errors
    ///
    /// [`RefreshError::Storage`] if the source tables cannot be read.
    pub async fn check_freshness(&self) -> Result<Freshness> {
        let latest = self.inner.rebuilder.latest_source_change().await?;
        let persisted = self.inner.rebuilder.last_refresh().await?;
        let last_refresh = self.inner.metrics.lock().last_refresh.max(persisted);
        Ok(freshness::evaluate(latest, last_refresh))
    }

    /// Health surface.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.lock().snapshot(self.debounce_ms())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RefresherState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<RefresherState> {
        self.inner.state.subscribe()
    }

    /// Stop listening, drop any pending timer, and wait for the background
    /// tasks (and an in-flight rebuild) to finish. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.set_listening(false);
        let previous = self.inner.state.send_replace(RefresherState::ShutDown);

        let handles: Vec<_> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            if let Err(error) = handle.await {
                warn!(%error, "refresher task ended abnormally");
            }
        }
        if previous != RefresherState::ShutDown {
            info!("view refresher shut down");
        }
    }

    fn debounce_ms(&self) -> u64 {
        u64::try_from(self.inner.config.debounce.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Drop for ViewRefresher {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

impl Inner {
    async fn connect(&self) -> Result<Box<dyn NotificationStream>> {
        let mut stream = self.source.listen(&self.config.channel).await?;
        if let Err(error) = self.rebuilder.ping().await {
            let _ = stream.unlisten().await;
            return Err(RefreshError::Connection(error.to_string()));
        }
        Ok(stream)
    }

    async fn refresh_views(&self) -> Result<RefreshOutcome> {
        let _guard = self.rebuild_lock.lock().await;
        let started = Instant::now();
        let now = self.clock.now();

        let result = tokio::try_join!(
            self.rebuilder.rebuild_sessions_now(now),
            self.rebuilder.rebuild_sessions_next_60(now),
        );

        match result {
            Ok((sessions_now, sessions_next_60)) => {
                let duration = started.elapsed();
                let timestamp = self.clock.now();
                self.metrics.lock().record_success(timestamp);
                if let Err(error) = self
                    .rebuilder
                    .record_refresh(timestamp, sessions_now, sessions_next_60)
                    .await
                {
                    warn!(%error, "failed to persist refresh time");
                }
                metrics::counter!(VIEW_REFRESH_TOTAL).increment(1);
                metrics::histogram!(VIEW_REFRESH_DURATION_SECONDS).record(duration.as_secs_f64());
                info!(
                    duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                    sessions_now,
                    sessions_next_60,
                    "views refreshed"
                );
                Ok(RefreshOutcome {
                    duration,
                    timestamp,
                    sessions_now,
                    sessions_next_60,
                })
            }
            Err(error) => {
                let error = match error {
                    RefreshError::Rebuild(_) => error,
                    other => RefreshError::Rebuild(other.to_string()),
                };
                self.metrics.lock().record_error(error.to_string());
                metrics::counter!(VIEW_REFRESH_ERRORS_TOTAL).increment(1);
                error!(%error, "view refresh failed, keeping previous snapshot");
                Err(error)
            }
        }
    }

    fn set_listening(&self, listening: bool) {
        self.metrics.lock().is_listening = listening;
    }

    /// Apply a transition unless already shut down. Returns whether the
    /// state changed.
    fn transition(&self, f: impl FnOnce(RefresherState) -> Option<RefresherState>) -> bool {
        self.state.send_if_modified(|state| {
            if *state == RefresherState::ShutDown {
                return false;
            }
            match f(*state) {
                Some(next) if next != *state => {
                    *state = next;
                    true
                }
                _ => false,
            }
        })
    }

    /// Sleep unless cancelled first. Returns false on cancellation.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }

    /// Resubscribe until it works or the refresher shuts down.
    async fn reconnect(&self) -> Option<Box<dyn NotificationStream>> {
        let mut delay = self.config.reconnect_delay;
        loop {
            if !self.pause(delay).await {
                return None;
            }
            metrics::counter!(NOTIFICATION_RECONNECTS_TOTAL).increment(1);
            match self.connect().await {
                Ok(stream) => {
                    if self.cancel.is_cancelled() {
                        release(stream).await;
                        return None;
                    }
                    self.set_listening(true);
                    let _ = self.transition(|_| Some(RefresherState::Listening));
                    info!(channel = %self.config.channel, "notification subscription restored");
                    return Some(stream);
                }
                Err(error) => {
                    delay = self.config.reconnect_retry_delay;
                    warn!(
                        %error,
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "resubscribe failed"
                    );
                }
            }
        }
    }

    fn on_disconnect(&self, error: &RefreshError) {
        {
            let mut metrics = self.metrics.lock();
            metrics.is_listening = false;
            metrics.record_error(error.to_string());
        }
        let _ = self.transition(|_| Some(RefresherState::Reconnecting));
        error!(%error, "notification subscription lost, reconnecting");
    }
}

async fn release(mut stream: Box<dyn NotificationStream>) {
    if let Err(error) = stream.unlisten().await {
        debug!(%error, "unlisten failed");
    }
}

async fn run_listener(
    inner: Arc<Inner>,
    mut stream: Box<dyn NotificationStream>,
    reset: mpsc::UnboundedSender<()>,
) {
    loop {
        let item = tokio::select! {
            () = inner.cancel.cancelled() => {
                release(stream).await;
                return;
            }
            item = stream.next() => item,
        };

        let error = match item {
            Some(Ok(notification)) => {
                metrics::counter!(NOTIFICATIONS_RECEIVED_TOTAL).increment(1);
                info!(
                    channel = %notification.channel,
                    payload = %notification.payload,
                    "change notification received"
                );
                if reset.send(()).is_err() {
                    release(stream).await;
                    return;
                }
                continue;
            }
            Some(Err(error)) => error,
            None => RefreshError::Connection("notification stream closed".into()),
        };

        inner.on_disconnect(&error);
        release(stream).await;
        let Some(next) = inner.reconnect().await else {
            return;
        };
        stream = next;

        // Changes made while unsubscribed were never delivered.
        debug!("arming catch-up refresh after resubscribe");
        if reset.send(()).is_err() {
            release(stream).await;
            return;
        }
    }
}

async fn run_debouncer(inner: Arc<Inner>, mut reset: mpsc::UnboundedReceiver<()>) {
    let debounce = inner.config.debounce;
    let mut deadline: Option<Instant> = None;
    let mut rebuilds = JoinSet::new();

    loop {
        let timer = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            () = inner.cancel.cancelled() => break,
            signal = reset.recv() => {
                if signal.is_none() {
                    break;
                }
                deadline = Some(Instant::now() + debounce);
                let _ = inner.transition(|s| (s == RefresherState::Listening).then_some(RefresherState::Debouncing));
                debug!("debounce timer armed");
            }
            () = timer => {
                deadline = None;
                let _ = inner.transition(|s| (s == RefresherState::Debouncing).then_some(RefresherState::Listening));
                let inner = inner.clone();
                let _ = rebuilds.spawn(async move {
                    // Failures are recorded in metrics; the next notification retries.
                    let _ = inner.refresh_views().await;
                });
            }
            Some(_) = rebuilds.join_next(), if !rebuilds.is_empty() => {}
        }
    }

    // A rebuild is a single transaction; let an in-flight one finish.
    while rebuilds.join_next().await.is_some() {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
