//! Package-level constants.

/// Current version of Cadence (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "cadence";

/// Change-notification channel fired by schedule triggers.
pub const REFRESH_CHANNEL: &str = "event_refresh";

/// Width of the "upcoming" window in minutes.
pub const UPCOMING_WINDOW_MINUTES: i64 = 60;
