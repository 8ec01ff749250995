//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TellerSettings::default()`]
//! 2. If `~/.teller/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `TELLER_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use teller_tx::NestingPolicy;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::TellerSettings;

/// The teller home directory (`~/.teller`).
pub fn teller_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".teller")
}

/// Resolve the path to the settings file (`~/.teller/settings.json`).
pub fn settings_path() -> PathBuf {
    teller_home().join("settings.json")
}

/// Resolve a configured path: absolute paths are kept, relative ones are
/// placed under [`teller_home`].
pub fn resolve_home_path(path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        teller_home().join(path)
    }
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TellerSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<TellerSettings> {
    let defaults = serde_json::to_value(TellerSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: TellerSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Values are parsed strictly; invalid ones are ignored with a warning.
pub fn apply_env_overrides(settings: &mut TellerSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Separated from [`apply_env_overrides`] so tests need not touch the
/// process environment.
pub fn apply_overrides(settings: &mut TellerSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = read("TELLER_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = read("TELLER_DB_POOL_SIZE") {
        if let Some(n) = checked("TELLER_DB_POOL_SIZE", &v, parse_u32_range(&v, 1, 1024)) {
            settings.database.pool_size = n;
        }
    }
    if let Some(v) = read("TELLER_NESTING") {
        if let Some(p) = checked("TELLER_NESTING", &v, v.parse::<NestingPolicy>().ok()) {
            settings.transactions.nesting = p;
        }
    }

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read("TELLER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("TELLER_PORT") {
        if let Some(n) = checked("TELLER_PORT", &v, parse_u16_range(&v, 0, 65535)) {
            settings.server.port = n;
        }
    }

    // ── Coordinator ─────────────────────────────────────────────────
    if let Some(v) = read("TELLER_COORDINATOR_ENABLED") {
        if let Some(b) = checked("TELLER_COORDINATOR_ENABLED", &v, parse_bool(&v)) {
            settings.coordinator.enabled = b;
        }
    }
    if let Some(v) = read("TELLER_COORDINATOR_PERIOD_MS") {
        if let Some(n) = checked("TELLER_COORDINATOR_PERIOD_MS", &v, parse_u64_range(&v, 10, 3_600_000)) {
            settings.coordinator.period_ms = n;
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("TELLER_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn checked<T>(name: &str, raw: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        warn!(key = name, value = %raw, "invalid env var, ignoring");
    }
    parsed
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
