use std::path::Path;
use tracing::{debug, warn};
use super::{settings_path, Settings, SettingsError};
/// Load settings from the default location.
///
/// Returns `Ok(Settings::default())` if the file does not exist.
///
/// # Errors
///
/// Returns [`SettingsError`] if the file exists but cannot be read or parsed.
pub fn load_settings() -> Result<Settings, SettingsError> {
    let Some(path) = settings_path() else {
        warn!("Could not determine config directory; using default settings");
        return Ok(Settings::default());
    };
    load_settings_from(&path)
}
/// Load settings from `path`, falling back to defaults when it is absent.
///
/// # Errors
///
/// Returns [`SettingsError`] if the file exists but cannot be read or parsed.
pub fn load_settings_from(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        debug!("Settings not found at {}; using defaults", path.display());
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;
    debug!("Loaded settings from {}", path.display());
    Ok(settings)
}
