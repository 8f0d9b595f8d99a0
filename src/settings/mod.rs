mod loader;
pub use loader::{load_settings, load_settings_from};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    Toml(#[from] toml::de::Error),
}
/// Process settings, deserialized from `settings.toml`.
///
/// `logging_config` names a registered override (`<module>.<function>`);
/// `logging_settings` is handed to it untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_settings: Option<toml::Value>,
}
/// Resolve the default settings path (`<config dir>/reachy/settings.toml`).
#[must_use]
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reachy").join("settings.toml"))
}
#[cfg(test)]
#[path = "../settings_tests.rs"]
mod settings_tests;
