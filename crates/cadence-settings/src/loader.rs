//! Layered settings resolution.
//!
//! Compiled defaults are serialized to JSON, the settings file (when
//! present) is merged over them, the result is decoded, and `CADENCE_*`
//! variables are applied last. The final value is validated before it is
//! returned.
//!
//! When merging, objects combine key by key, `null` in the file keeps the
//! default, and any other file value replaces the default outright.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{CadenceSettings, LogFormat};

/// Resolve the default settings file path (`~/.cadence/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".cadence").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<CadenceSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid final value
/// is an error.
pub fn load_settings_from_path(path: &Path) -> Result<CadenceSettings> {
    load_with(path, |name| std::env::var(name).ok())
}

/// Load settings using an explicit variable lookup instead of the process
/// environment.
pub fn load_with<F>(path: &Path, lookup: F) -> Result<CadenceSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(CadenceSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: CadenceSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

/// Merge `overlay` onto `base` (see the module docs for the rules).
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay.into_iter().filter(|(_, v)| !v.is_null()) {
                let combined = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = base.insert(key, combined);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Apply `CADENCE_*` overrides read through `lookup`.
///
/// Numbers must parse and fall within range; booleans accept
/// `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`. Invalid values are
/// logged and ignored.
pub fn apply_overrides<F>(settings: &mut CadenceSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = env.string("CADENCE_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = env.u64("CADENCE_DB_POOL_SIZE", 1, 256) {
        settings.database.pool_size = u32::try_from(v).unwrap_or(settings.database.pool_size);
    }

    // ── Refresher ───────────────────────────────────────────────────
    if let Some(v) = env.string("CADENCE_CHANNEL") {
        settings.refresher.channel = v;
    }
    if let Some(v) = env.u64("CADENCE_DEBOUNCE_MS", 1, 600_000) {
        settings.refresher.debounce_ms = v;
    }
    if let Some(v) = env.u64("CADENCE_RECONNECT_DELAY_MS", 0, 600_000) {
        settings.refresher.reconnect_delay_ms = v;
    }
    if let Some(v) = env.u64("CADENCE_RECONNECT_RETRY_DELAY_MS", 0, 600_000) {
        settings.refresher.reconnect_retry_delay_ms = v;
    }
    if let Some(v) = env.u64("CADENCE_POLL_INTERVAL_MS", 10, 60_000) {
        settings.refresher.poll_interval_ms = v;
    }

    // ── Cache ───────────────────────────────────────────────────────
    if let Some(v) = env.bool("CADENCE_CACHE_ENABLED") {
        settings.cache.enabled = v;
    }
    if let Some(v) = env.u64("CADENCE_EVENT_CONTEXT_TTL_SECS", 1, 86_400) {
        settings.cache.event_context_ttl_secs = v;
    }

    // ── Context ─────────────────────────────────────────────────────
    if let Some(v) = env.u64("CADENCE_QUERY_TIMEOUT_MS", 100, 600_000) {
        settings.context.query_timeout_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("CADENCE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("CADENCE_LOG_FORMAT") {
        match v.to_lowercase().as_str() {
            "json" => settings.logging.format = LogFormat::Json,
            "compact" => settings.logging.format = LogFormat::Compact,
            _ => warn!(key = "CADENCE_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, min, max, "invalid numeric env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn no_vars(_: &str) -> Option<String> {
        None
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_combines_objects_and_replaces_leaves() {
        let defaults = serde_json::json!({
            "refresher": {"debounceMs": 5000, "channel": "event_refresh"},
            "logging": {"level": "info"},
            "tags": ["a", "b"]
        });
        let file = serde_json::json!({
            "refresher": {"debounceMs": 100},
            "logging": null,
            "tags": ["c"]
        });
        let merged = deep_merge(defaults, file);
        assert_eq!(merged["refresher"]["debounceMs"], 100);
        assert_eq!(merged["refresher"]["channel"], "event_refresh");
        assert_eq!(merged["logging"]["level"], "info");
        assert_eq!(merged["tags"], serde_json::json!(["c"]));
    }

    #[test]
    fn merge_scalar_over_object_wins() {
        let merged = deep_merge(
            serde_json::json!({"cache": {"enabled": true}}),
            serde_json::json!({"cache": false}),
        );
        assert_eq!(merged["cache"], false);
    }

    // ── load_with ───────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_with(Path::new("/nonexistent/settings.json"), no_vars).unwrap();
        assert_eq!(settings, CadenceSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"database": {"path": "/data/s.db"}, "cache": {"eventContextTtlSecs": 30}}"#,
        )
        .unwrap();

        let settings = load_with(&path, no_vars).unwrap();
        assert_eq!(settings.database.path, "/data/s.db");
        assert_eq!(settings.database.pool_size, 8);
        assert_eq!(settings.cache.event_context_ttl_secs, 30);
        assert_eq!(settings.refresher.debounce_ms, 5000);
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_with(&path, no_vars), Err(SettingsError::Json(_))));
    }

    #[test]
    fn invalid_value_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"refresher": {"debounceMs": 0}}"#).unwrap();
        assert!(matches!(
            load_with(&path, no_vars),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn env_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"refresher": {"debounceMs": 2000}}"#).unwrap();

        let settings = load_with(&path, vars(&[("CADENCE_DEBOUNCE_MS", "750")])).unwrap();
        assert_eq!(settings.refresher.debounce_ms, 750);
    }

    // ── apply_overrides ─────────────────────────────────────────────

    #[test]
    fn overrides_apply_every_section() {
        let mut s = CadenceSettings::default();
        apply_overrides(
            &mut s,
            vars(&[
                ("CADENCE_DB_PATH", "/tmp/x.db"),
                ("CADENCE_DB_POOL_SIZE", "4"),
                ("CADENCE_CHANNEL", "schedule_changed"),
                ("CADENCE_POLL_INTERVAL_MS", "50"),
                ("CADENCE_CACHE_ENABLED", "off"),
                ("CADENCE_EVENT_CONTEXT_TTL_SECS", "15"),
                ("CADENCE_QUERY_TIMEOUT_MS", "1500"),
                ("CADENCE_LOG_LEVEL", "debug"),
                ("CADENCE_LOG_FORMAT", "JSON"),
            ]),
        );
        assert_eq!(s.database.path, "/tmp/x.db");
        assert_eq!(s.database.pool_size, 4);
        assert_eq!(s.refresher.channel, "schedule_changed");
        assert_eq!(s.refresher.poll_interval_ms, 50);
        assert!(!s.cache.enabled);
        assert_eq!(s.cache.event_context_ttl_secs, 15);
        assert_eq!(s.context.query_timeout_ms, 1500);
        assert_eq!(s.logging.level, "debug");
        assert_eq!(s.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut s = CadenceSettings::default();
        apply_overrides(
            &mut s,
            vars(&[
                ("CADENCE_DEBOUNCE_MS", "0"),
                ("CADENCE_DB_POOL_SIZE", "lots"),
                ("CADENCE_CACHE_ENABLED", "maybe"),
                ("CADENCE_LOG_FORMAT", "xml"),
                ("CADENCE_DB_PATH", "   "),
            ]),
        );
        assert_eq!(s, CadenceSettings::default());
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in ["true", "1", "yes", "on", "TRUE", " On "] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in ["false", "0", "no", "off", "No"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("5000", 1, 600_000), Some(5000));
        assert_eq!(parse_u64_range("0", 1, 600_000), None);
        assert_eq!(parse_u64_range("700000", 1, 600_000), None);
        assert_eq!(parse_u64_range("abc", 1, 10), None);
    }
}
