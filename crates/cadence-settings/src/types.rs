//! Settings type definitions.
//!
//! All types use camelCase JSON keys and `#[serde(default)]`, so a partial
//! settings file only needs the values it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "database": { "path": "/var/lib/cadence/schedule.db" },
///   "refresher": { "debounceMs": 2000 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CadenceSettings {
    /// Storage settings.
    pub database: DatabaseSettings,
    /// View refresher settings.
    pub refresher: RefresherSettings,
    /// Cache layer settings.
    pub cache: CacheSettings,
    /// Context assembler settings.
    pub context: ContextSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl CadenceSettings {
    /// Reject values that would make the service misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(SettingsError::InvalidValue("database.path is empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(SettingsError::InvalidValue(
                "database.poolSize must be at least 1".into(),
            ));
        }
        if self.refresher.channel.trim().is_empty() {
            return Err(SettingsError::InvalidValue("refresher.channel is empty".into()));
        }
        if self.refresher.debounce_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "refresher.debounceMs must be greater than 0".into(),
            ));
        }
        if self.refresher.poll_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "refresher.pollIntervalMs must be greater than 0".into(),
            ));
        }
        if self.cache.event_context_ttl_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "cache.eventContextTtlSecs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// SQLite storage settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Database file path.
    pub path: String,
    /// Query/rebuild pool size. The notification listener uses its own
    /// connection outside the pool.
    pub pool_size: u32,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "schedule.db".to_string(),
            pool_size: 8,
            busy_timeout_ms: 30_000,
        }
    }
}

/// View refresher settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefresherSettings {
    /// Change-notification channel to listen on.
    pub channel: String,
    /// Quiet period after the last notification before rebuilding.
    pub debounce_ms: u64,
    /// Wait before the first reconnect attempt.
    pub reconnect_delay_ms: u64,
    /// Wait between subsequent reconnect attempts.
    pub reconnect_retry_delay_ms: u64,
    /// How often the listener polls the notification outbox.
    pub poll_interval_ms: u64,
}

impl RefresherSettings {
    /// Debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// First reconnect delay.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Subsequent reconnect delay.
    pub fn reconnect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_retry_delay_ms)
    }

    /// Outbox poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RefresherSettings {
    fn default() -> Self {
        Self {
            channel: "event_refresh".to_string(),
            debounce_ms: 5_000,
            reconnect_delay_ms: 5_000,
            reconnect_retry_delay_ms: 10_000,
            poll_interval_ms: 250,
        }
    }
}

/// Cache layer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    /// Whether to cache at all. Disabled means every read assembles.
    pub enabled: bool,
    /// Event context TTL in seconds.
    pub event_context_ttl_secs: u64,
    /// Contractor bundle TTL in seconds.
    pub contractor_bundle_ttl_secs: u64,
}

impl CacheSettings {
    /// Event context TTL.
    pub fn event_context_ttl(&self) -> Duration {
        Duration::from_secs(self.event_context_ttl_secs)
    }

    /// Contractor bundle TTL.
    pub fn contractor_bundle_ttl(&self) -> Duration {
        Duration::from_secs(self.contractor_bundle_ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            event_context_ttl_secs: 60,
            contractor_bundle_ttl_secs: 300,
        }
    }
}

/// Context assembler settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextSettings {
    /// Upper bound on each view query.
    pub query_timeout_ms: u64,
}

impl ContextSettings {
    /// Query timeout.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            query_timeout_ms: 5_000,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Filter directive (`RUST_LOG` overrides it).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_match_service_contract() {
        let s = CadenceSettings::default();
        assert_eq!(s.refresher.channel, "event_refresh");
        assert_eq!(s.refresher.debounce(), Duration::from_secs(5));
        assert_eq!(s.refresher.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(s.refresher.reconnect_retry_delay(), Duration::from_secs(10));
        assert_eq!(s.cache.event_context_ttl(), Duration::from_secs(60));
        assert_eq!(s.cache.contractor_bundle_ttl(), Duration::from_secs(300));
        assert!(s.cache.enabled);
        assert_eq!(s.logging.level, "info");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn json_keys_are_camel_case() {
        let json = serde_json::to_value(CadenceSettings::default()).unwrap();
        assert_eq!(json["refresher"]["debounceMs"], 5000);
        assert_eq!(json["cache"]["eventContextTtlSecs"], 60);
        assert_eq!(json["database"]["poolSize"], 8);
        assert_eq!(json["logging"]["format"], "compact");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: CadenceSettings =
            serde_json::from_str(r#"{"refresher": {"debounceMs": 100}}"#).unwrap();
        assert_eq!(s.refresher.debounce_ms, 100);
        assert_eq!(s.refresher.poll_interval_ms, 250);
        assert_eq!(s.database, DatabaseSettings::default());
    }

    #[test]
    fn validate_rejects_zero_debounce() {
        let mut s = CadenceSettings::default();
        s.refresher.debounce_ms = 0;
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(msg)) if msg.contains("debounceMs"));
    }

    #[test]
    fn validate_rejects_empty_pool() {
        let mut s = CadenceSettings::default();
        s.database.pool_size = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_ttl() {
        let mut s = CadenceSettings::default();
        s.cache.event_context_ttl_secs = 0;
        assert!(s.validate().is_err());
    }
}
