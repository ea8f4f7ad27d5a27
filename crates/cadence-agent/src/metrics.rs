//! Prometheus recorder for the service binary.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder.
///
/// Call once at startup, before any metric is recorded.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use cadence_context::metrics::{
        EVENT_CONTEXT_CACHE_HITS_TOTAL, EVENT_CONTEXT_CACHE_MISSES_TOTAL, VIEW_QUERY_ERRORS_TOTAL,
    };
    use cadence_refresh::metrics::{
        NOTIFICATION_RECONNECTS_TOTAL, NOTIFICATIONS_RECEIVED_TOTAL, VIEW_REFRESH_DURATION_SECONDS,
        VIEW_REFRESH_ERRORS_TOTAL, VIEW_REFRESH_TOTAL,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn detached_recorder_renders() {
        // Build without installing so tests never fight over the global.
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = handle.render();
        assert!(output.is_empty() || output.contains('\n'));
    }

    #[test]
    fn metric_names_are_snake_case() {
        let names = [
            VIEW_REFRESH_TOTAL,
            VIEW_REFRESH_ERRORS_TOTAL,
            VIEW_REFRESH_DURATION_SECONDS,
            NOTIFICATIONS_RECEIVED_TOTAL,
            NOTIFICATION_RECONNECTS_TOTAL,
            EVENT_CONTEXT_CACHE_HITS_TOTAL,
            EVENT_CONTEXT_CACHE_MISSES_TOTAL,
            VIEW_QUERY_ERRORS_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name} is not snake_case"
            );
        }
    }
}
