//! # mixsync-settings
//!
//! Layered configuration for the mixsync daemon.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`MixsyncSettings::default()`]
//! 2. **User file**: `~/.mixsync/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `MIXSYNC_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the daemon itself.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, load_settings_with,
    settings_path, validate,
};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<MixsyncSettings> = OnceLock::new();

/// Global settings, loaded on first access.
///
/// Falls back to compiled defaults when loading fails.
pub fn get_settings() -> &'static MixsyncSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load settings, using defaults");
            MixsyncSettings::default()
        })
    })
}

/// Install `settings` as the global value.
///
/// Returns the settings back if the global was already initialized.
pub fn init_settings(settings: MixsyncSettings) -> std::result::Result<(), MixsyncSettings> {
    SETTINGS.set(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = MixsyncSettings::default();
        assert!(validate(&settings).is_ok());
        assert_eq!(settings.server.port, 3820);
        assert_eq!(settings.server.send_queue, 4096);
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    fn settings_path_is_under_home() {
        let path = settings_path();
        assert!(path.ends_with(".mixsync/settings.json"));
    }
}
