//! # teller-settings
//!
//! Configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TellerSettings::default()`]
//! 2. **User file**: `~/.teller/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TELLER_*` overrides
//!
//! The binary applies command-line flags on top and then installs the result
//! with [`init_settings`].

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, resolve_home_path,
    settings_path, teller_home,
};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<TellerSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// Returns whatever [`init_settings`] installed. If nothing was installed,
/// the first call loads `~/.teller/settings.json` with env var overrides and
/// falls back to compiled defaults if loading fails.
pub fn get_settings() -> &'static TellerSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: TellerSettings) -> std::result::Result<(), TellerSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
