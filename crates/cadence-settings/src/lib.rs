//! # cadence-settings
//!
//! Layered configuration for the Cadence service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CadenceSettings::default()`]
//! 2. **User file**: `~/.cadence/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `CADENCE_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, load_with, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<CadenceSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// The first call loads from `~/.cadence/settings.json` with env overrides,
/// falling back to compiled defaults if loading fails.
pub fn get_settings() -> &'static CadenceSettings {
    SETTINGS.get_or_init(|| match load_settings() {
        Ok(settings) => settings,
        Err(error) => {
            tracing::warn!(%error, "failed to load settings, using defaults");
            CadenceSettings::default()
        }
    })
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: CadenceSettings) -> std::result::Result<(), CadenceSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
