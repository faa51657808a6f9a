//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ParleySettings::default()`]
//! 2. If `~/.parley/settings.json` exists, deep-merge user values over
//!    defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::ParleySettings;

/// Resolve the path to the settings file (`~/.parley/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".parley").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ParleySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<ParleySettings> {
    let defaults = serde_json::to_value(ParleySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ParleySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
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

/// Apply `PARLEY_*` environment variable overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut ParleySettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
///
/// Each variable has strict parsing rules: integers must be valid and in
/// range; invalid values are silently ignored (fall back to file/default).
/// The lookup indirection keeps this testable without mutating the
/// process environment.
pub fn apply_overrides_from(
    settings: &mut ParleySettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("PARLEY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16("PARLEY_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.usize("PARLEY_MAX_CONNECTIONS", 1, 1_000_000) {
        settings.server.max_connections = v;
    }
    if let Some(v) = env.u64("PARLEY_HEARTBEAT_INTERVAL_SECS", 1, 3600) {
        settings.server.heartbeat_interval_secs = v;
    }
    if let Some(v) = env.u64("PARLEY_HEARTBEAT_TIMEOUT_SECS", 1, 3600) {
        settings.server.heartbeat_timeout_secs = v;
    }
    if let Some(v) = env.usize("PARLEY_SEND_QUEUE_CAPACITY", 1, 65_536) {
        settings.server.send_queue_capacity = v;
    }

    // ── Chat ────────────────────────────────────────────────────────
    if let Some(v) = env.i64("PARLEY_SUPPORT_USER_ID", 1, i64::MAX) {
        settings.chat.support_user_id = v;
    }
    if let Some(v) = env.usize("PARLEY_HISTORY_LIMIT", 1, 100_000) {
        settings.chat.history_limit = v;
    }

    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = env.string("PARLEY_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = env.u32("PARLEY_DB_POOL_SIZE", 1, 128) {
        settings.database.pool_size = v;
    }
}

/// Range-checked typed reads over a variable lookup.
struct EnvReader<F: Fn(&str) -> Option<String>> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        self.string(name)?.parse().ok().filter(|v| (min..=max).contains(v))
    }

    fn u32(&self, name: &str, min: u32, max: u32) -> Option<u32> {
        self.string(name)?.parse().ok().filter(|v| (min..=max).contains(v))
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        self.string(name)?.parse().ok().filter(|v| (min..=max).contains(v))
    }

    fn i64(&self, name: &str, min: i64, max: i64) -> Option<i64> {
        self.string(name)?.parse().ok().filter(|v| (min..=max).contains(v))
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        self.string(name)?.parse().ok().filter(|v| (min..=max).contains(v))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
