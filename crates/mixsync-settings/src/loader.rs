//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MixsyncSettings::default()`]
//! 2. If `~/.mixsync/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `MIXSYNC_*` environment variable overrides
//! 4. Validate cross-field constraints

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{LogFormat, MixsyncSettings};

/// Path of the user settings file (`~/.mixsync/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".mixsync").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<MixsyncSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields defaults; an unreadable or malformed one is an error.
pub fn load_settings_from_path(path: &Path) -> Result<MixsyncSettings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, resolving overrides through `lookup` instead
/// of the process environment.
pub fn load_settings_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<MixsyncSettings> {
    let defaults = serde_json::to_value(MixsyncSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: MixsyncSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    validate(&settings)?;
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

/// Apply `MIXSYNC_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut MixsyncSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply `MIXSYNC_*` overrides resolved through `lookup`.
///
/// Values that fail to parse or fall outside their range are logged and
/// ignored, leaving the file or default value in place.
pub fn apply_overrides(settings: &mut MixsyncSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };
    let server = &mut settings.server;

    if let Some(v) = env.string("MIXSYNC_HOST") {
        server.host = v;
    }
    if let Some(v) = env.parsed("MIXSYNC_PORT", 0_u16, u16::MAX) {
        server.port = v;
    }
    if let Some(v) = env.parsed("MIXSYNC_MAX_CONNECTIONS", 1_usize, 10_000) {
        server.max_connections = v;
    }
    if let Some(v) = env.parsed("MIXSYNC_HEARTBEAT_INTERVAL_SECS", 1_u64, 3600) {
        server.heartbeat_interval_secs = v;
    }
    if let Some(v) = env.parsed("MIXSYNC_HEARTBEAT_TIMEOUT_SECS", 1_u64, 7200) {
        server.heartbeat_timeout_secs = v;
    }
    if let Some(v) = env.parsed("MIXSYNC_SEND_QUEUE", 16_usize, 1_048_576) {
        server.send_queue = v;
    }
    if let Some(v) = env.string("MIXSYNC_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("MIXSYNC_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => warn!(key = "MIXSYNC_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

/// Check constraints that span several fields.
pub fn validate(settings: &MixsyncSettings) -> Result<()> {
    let server = &settings.server;
    if server.heartbeat_timeout_secs <= server.heartbeat_interval_secs {
        return Err(SettingsError::InvalidValue(format!(
            "heartbeat timeout ({}s) must exceed heartbeat interval ({}s)",
            server.heartbeat_timeout_secs, server.heartbeat_interval_secs
        )));
    }
    if server.max_connections == 0 {
        return Err(SettingsError::InvalidValue(
            "maxConnections must be at least 1".into(),
        ));
    }
    if server.send_queue == 0 {
        return Err(SettingsError::InvalidValue(
            "sendQueue must be at least 1".into(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a number within an inclusive range.
pub fn parse_range<T>(val: &str, min: T, max: T) -> Option<T>
where
    T: std::str::FromStr + PartialOrd,
{
    let n: T = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a log format name (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_lowercase().as_str() {
        "compact" | "text" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, min: T, max: T) -> Option<T>
    where
        T: std::str::FromStr + PartialOrd + Copy + std::fmt::Display,
    {
        let val = (self.lookup)(name)?;
        let result = parse_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, %min, %max, "invalid env var, ignoring");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 3820, "host": "0.0.0.0"}});
        let source = serde_json::json!({"server": {"port": 9000}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9000);
        assert_eq!(merged["server"]["host"], "0.0.0.0");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_and_primitive_replace() {
        let merged = deep_merge(
            serde_json::json!({"items": [1, 2, 3], "a": {"nested": true}}),
            serde_json::json!({"items": [4], "a": 42}),
        );
        assert_eq!(merged["items"], serde_json::json!([4]));
        assert_eq!(merged["a"], 42);
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    // ── loading ─────────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings =
            load_settings_with(Path::new("/nonexistent/settings.json"), no_env).unwrap();
        assert_eq!(settings, MixsyncSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9000, "sendQueue": 128}, "logging": {"format": "json"}}"#,
        )
        .unwrap();

        let settings = load_settings_with(&path, no_env).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.send_queue, 128);
        assert_eq!(settings.server.max_connections, 32);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert_matches!(load_settings_with(&path, no_env), Err(SettingsError::Json(_)));
    }

    #[test]
    fn wrong_type_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": "high"}}"#).unwrap();
        assert_matches!(load_settings_with(&path, no_env), Err(SettingsError::Json(_)));
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": 9000}}"#).unwrap();

        let settings = load_settings_with(
            &path,
            env(&[
                ("MIXSYNC_PORT", "9100"),
                ("MIXSYNC_HOST", "127.0.0.1"),
                ("MIXSYNC_LOG_LEVEL", "mixsync_protocol=debug"),
                ("MIXSYNC_LOG_FORMAT", "JSON"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.logging.level, "mixsync_protocol=debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = MixsyncSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("MIXSYNC_PORT", "70000"),
                ("MIXSYNC_MAX_CONNECTIONS", "0"),
                ("MIXSYNC_SEND_QUEUE", "lots"),
                ("MIXSYNC_HOST", ""),
                ("MIXSYNC_LOG_FORMAT", "xml"),
            ]),
        );
        assert_eq!(settings, MixsyncSettings::default());
    }

    #[test]
    fn heartbeat_overrides_are_validated_together() {
        let err = load_settings_with(
            Path::new("/nonexistent/settings.json"),
            env(&[
                ("MIXSYNC_HEARTBEAT_INTERVAL_SECS", "30"),
                ("MIXSYNC_HEARTBEAT_TIMEOUT_SECS", "10"),
            ]),
        )
        .unwrap_err();
        assert_matches!(err, SettingsError::InvalidValue(msg) if msg.contains("heartbeat"));
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_range_bounds() {
        assert_eq!(parse_range("16", 16_usize, 32), Some(16));
        assert_eq!(parse_range(" 32 ", 16_usize, 32), Some(32));
        assert_eq!(parse_range("33", 16_usize, 32), None);
        assert_eq!(parse_range("-1", 0_u16, 10), None);
        assert_eq!(parse_range("abc", 0_u64, 10), None);
    }

    #[test]
    fn parse_log_format_names() {
        assert_eq!(parse_log_format("Compact"), Some(LogFormat::Compact));
        assert_eq!(parse_log_format("text"), Some(LogFormat::Compact));
        assert_eq!(parse_log_format("json"), Some(LogFormat::Json));
        assert_eq!(parse_log_format("yaml"), None);
    }
}
