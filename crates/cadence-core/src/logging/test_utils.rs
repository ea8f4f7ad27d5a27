//! In-memory `tracing` capture for tests.
//!
//! Soft failures (cache outages, dropped notifications) are only visible
//! in logs, so tests in several crates assert on what was emitted.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// One emitted event.
#[derive(Clone, Debug, Default)]
pub struct LogRecord {
    /// Level, `None` only while the record is being filled in.
    pub level: Option<Level>,
    /// Rendered `message` field.
    pub message: String,
    /// Every other field, rendered as text.
    pub fields: BTreeMap<String, String>,
}

impl Visit for LogRecord {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.put(field, format!("{value:?}"));
    }
}

impl LogRecord {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            let _ = self.fields.insert(field.name().to_owned(), value);
        }
    }
}

/// Shared handle to the captured records.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<LogRecord>>>);

impl CapturedLogs {
    /// Snapshot of everything captured so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.0.lock().clone()
    }

    /// First record whose message contains `needle`.
    pub fn find(&self, needle: &str) -> Option<LogRecord> {
        self.0.lock().iter().find(|r| r.message.contains(needle)).cloned()
    }

    /// Whether any record's message contains `needle`.
    pub fn has_message(&self, needle: &str) -> bool {
        self.find(needle).is_some()
    }

    /// Records emitted at exactly `level`.
    pub fn at_level(&self, level: Level) -> Vec<LogRecord> {
        self.0
            .lock()
            .iter()
            .filter(|r| r.level == Some(level))
            .cloned()
            .collect()
    }
}

struct Recorder(CapturedLogs);

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut record = LogRecord {
            level: Some(*event.metadata().level()),
            ..LogRecord::default()
        };
        event.record(&mut record);
        self.0.0.lock().push(record);
    }
}

/// Route events on the current thread into a fresh [`CapturedLogs`].
///
/// Keep the guard alive for the whole test. Async tests must run on the
/// current-thread runtime (the `#[tokio::test]` default) so spawned tasks
/// log on the capturing thread.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(Recorder(logs.clone()))
        .set_default();
    (logs, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_level_and_message() {
        let (logs, _guard) = capture_logs();
        tracing::warn!("cache unavailable");
        assert_eq!(logs.at_level(Level::WARN).len(), 1);
        assert!(logs.at_level(Level::ERROR).is_empty());
        assert!(logs.has_message("unavailable"));
    }

    #[test]
    fn records_structured_fields() {
        let (logs, _guard) = capture_logs();
        tracing::info!(channel = "event_refresh", payload = 17, "change notification received");
        let record = logs.find("notification").unwrap();
        assert_eq!(record.fields["channel"], "event_refresh");
        assert_eq!(record.fields["payload"], "17");
    }

    #[test]
    fn captures_nothing_outside_guard() {
        let logs = {
            let (logs, _guard) = capture_logs();
            logs
        };
        tracing::error!("after guard dropped");
        assert!(logs.records().is_empty());
    }
}
