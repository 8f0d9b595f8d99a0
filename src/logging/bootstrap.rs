use std::sync::Arc;
use tracing::{debug, warn};

use super::config::{LoggingConfig, DEFAULT_LOGGING};
use super::error::ConfigureError;
use super::registry::OverrideRegistry;
use super::state::LoggingState;

/// Caller-owned settings handed to an override untouched.
pub type OverrideSettings = toml::Value;

/// Absent or falsy settings mean there is nothing to override with.
///
/// Empty tables, arrays and strings, `false`, and zero all count as falsy.
fn has_settings(settings: Option<&OverrideSettings>) -> bool {
    match settings {
        None => false,
        Some(toml::Value::Table(table)) => !table.is_empty(),
        Some(toml::Value::Array(items)) => !items.is_empty(),
        Some(toml::Value::String(text)) => !text.is_empty(),
        Some(toml::Value::Boolean(flag)) => *flag,
        Some(toml::Value::Integer(number)) => *number != 0,
        Some(toml::Value::Float(number)) => *number != 0.0,
        Some(toml::Value::Datetime(_)) => true,
    }
}

/// Applies a default configuration, then an optional override.
///
/// Meant for process startup. Records emitted from other threads while
/// `configure` runs see either the old or the new configuration, never a
/// partial one; a second `configure` started before the first finishes is
/// rejected with [`ConfigureError::AlreadyConfiguring`].
#[derive(Debug, Clone, Copy)]
pub struct LoggingBootstrap<'a> {
    state: &'a LoggingState,
    registry: &'a OverrideRegistry,
}

impl<'a> LoggingBootstrap<'a> {
    #[must_use]
    pub fn new(state: &'a LoggingState, registry: &'a OverrideRegistry) -> Self {
        Self { state, registry }
    }

    /// Apply `default_config`, then run the override named by `override_ref`.
    ///
    /// The override only runs when `override_settings` is present and
    /// non-empty and `override_ref` is non-empty. If resolving or running it
    /// fails, `default_config` stays applied and the error is returned. The
    /// override's own error is returned as-is inside
    /// [`ConfigureError::Override`].
    pub fn configure(
        &self,
        default_config: &LoggingConfig,
        override_ref: Option<&str>,
        override_settings: Option<&OverrideSettings>,
    ) -> Result<(), ConfigureError> {
        let _guard = self.state.begin_configure()?;

        self.state.apply(default_config)?;

        if !has_settings(override_settings) {
            debug!("No logging settings; keeping default configuration");
            return Ok(());
        }
        let (Some(reference), Some(settings)) = (
            override_ref.map(str::trim).filter(|r| !r.is_empty()),
            override_settings,
        ) else {
            warn!("Logging settings given without an override reference; ignoring them");
            return Ok(());
        };

        let function = self.registry.resolve(reference)?;
        function(self.state, settings).map_err(ConfigureError::Override)?;

        debug!(reference = %reference, "Applied logging override");
        Ok(())
    }
}

/// Startup entry point: install the global logging state and configure it
/// with [`DEFAULT_LOGGING`] plus the given override.
pub fn configure_logging(
    override_ref: Option<&str>,
    override_settings: Option<&OverrideSettings>,
    registry: &OverrideRegistry,
) -> Result<Arc<LoggingState>, ConfigureError> {
    let state = LoggingState::install_global()?;
    LoggingBootstrap::new(&state, registry).configure(
        &DEFAULT_LOGGING,
        override_ref,
        override_settings,
    )?;
    Ok(state)
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod bootstrap_tests;
