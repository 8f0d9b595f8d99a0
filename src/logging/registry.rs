//! Name → function table for logging overrides.
//!
//! Settings files name an override as `<module>.<function>`. Instead of
//! loading code at runtime, every override a process can use is registered
//! up front and looked up here by that name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::config::{LevelOverrides, LoggingConfig};
use super::error::{OverrideError, ResolutionError};
use super::state::LoggingState;

/// Module under which the built-in overrides are registered.
pub const BUILTIN_MODULE: &str = "reachy.logging";

/// A registered override: receives the logging state and the caller's settings.
pub type OverrideFn =
    Arc<dyn Fn(&LoggingState, &toml::Value) -> Result<(), OverrideError> + Send + Sync>;

/// Split `<module>.<function>` (or `<module>::<function>`) on its last separator.
///
/// The module half is returned in dotted form.
pub fn split_reference(reference: &str) -> Result<(String, String), ResolutionError> {
    let malformed = || ResolutionError::MalformedReference(reference.to_string());
    let dotted = reference.trim().replace("::", ".");
    let (module, symbol) = dotted.rsplit_once('.').ok_or_else(malformed)?;
    if module.is_empty() || symbol.is_empty() {
        return Err(malformed());
    }
    Ok((module.to_string(), symbol.to_string()))
}

#[derive(Default, Clone)]
pub struct OverrideRegistry {
    modules: BTreeMap<String, BTreeMap<String, OverrideFn>>,
}

impl OverrideRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `reachy.logging.dict_config` and `reachy.logging.set_levels`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(BUILTIN_MODULE, "dict_config", dict_config)
            .register(BUILTIN_MODULE, "set_levels", set_levels);
        registry
    }

    /// Register `function` as `<module>.<symbol>`, replacing any previous entry.
    pub fn register<F>(&mut self, module: &str, symbol: &str, function: F) -> &mut Self
    where
        F: Fn(&LoggingState, &toml::Value) -> Result<(), OverrideError> + Send + Sync + 'static,
    {
        self.modules
            .entry(module.replace("::", "."))
            .or_default()
            .insert(symbol.to_string(), Arc::new(function));
        self
    }

    /// Look up an override by reference. Parsed fresh on every call.
    pub fn resolve(&self, reference: &str) -> Result<OverrideFn, ResolutionError> {
        let (module, symbol) = split_reference(reference)?;
        let functions = self
            .modules
            .get(&module)
            .ok_or_else(|| ResolutionError::ModuleNotFound {
                module: module.clone(),
            })?;
        let function = functions
            .get(&symbol)
            .ok_or_else(|| ResolutionError::SymbolNotFound {
                module: module.clone(),
                symbol: symbol.clone(),
            })?;
        debug!(module = %module, symbol = %symbol, "Resolved logging override");
        Ok(Arc::clone(function))
    }

    /// Every registered reference, sorted.
    #[must_use]
    pub fn references(&self) -> Vec<String> {
        self.modules
            .iter()
            .flat_map(|(module, functions)| {
                functions.keys().map(move |symbol| format!("{module}.{symbol}"))
            })
            .collect()
    }
}

impl fmt::Debug for OverrideRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideRegistry")
            .field("references", &self.references())
            .finish()
    }
}

/// Replace the installed configuration with the one described by `settings`.
fn dict_config(state: &LoggingState, settings: &toml::Value) -> Result<(), OverrideError> {
    let config = LoggingConfig::from_value(settings.clone())?;
    state.apply(&config)?;
    Ok(())
}

/// Adjust levels only; `settings` has optional `loggers` and `handlers` tables.
fn set_levels(state: &LoggingState, settings: &toml::Value) -> Result<(), OverrideError> {
    let overrides: LevelOverrides = settings.clone().try_into()?;
    state.apply_levels(&overrides)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop(_: &LoggingState, _: &toml::Value) -> Result<(), OverrideError> {
        Ok(())
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(
            split_reference("app.settings.logging.setup").unwrap(),
            ("app.settings.logging".to_string(), "setup".to_string())
        );
        assert_eq!(
            split_reference("app::logging::setup").unwrap(),
            ("app.logging".to_string(), "setup".to_string())
        );
    }

    #[test]
    fn test_split_reference_malformed() {
        for reference in ["setup", "", ".setup", "app.", "  "] {
            assert!(
                matches!(
                    split_reference(reference),
                    Err(ResolutionError::MalformedReference(_))
                ),
                "{reference:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_resolve_missing_module() {
        let registry = OverrideRegistry::with_builtins();
        let err = registry.resolve("nowhere.setup").err().unwrap();
        assert_eq!(
            err,
            ResolutionError::ModuleNotFound {
                module: "nowhere".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_missing_symbol() {
        let registry = OverrideRegistry::with_builtins();
        let err = registry.resolve("reachy.logging.nope").err().unwrap();
        assert!(matches!(err, ResolutionError::SymbolNotFound { .. }));
    }

    #[test]
    fn test_register_and_resolve_invokes_function() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = OverrideRegistry::new();
        registry.register("app::logging", "setup", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let function = registry.resolve("app.logging.setup").unwrap();
        function(&LoggingState::new(), &toml::Value::Boolean(true)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = OverrideRegistry::new();
        registry.register("app", "setup", noop).register("app", "setup", noop);
        assert_eq!(registry.references(), vec!["app.setup"]);
    }

    #[test]
    fn test_builtin_references() {
        let registry = OverrideRegistry::with_builtins();
        assert_eq!(
            registry.references(),
            vec!["reachy.logging.dict_config", "reachy.logging.set_levels"]
        );
        assert!(format!("{registry:?}").contains("dict_config"));
    }

    #[test]
    fn test_dict_config_rejects_invalid_settings() {
        let registry = OverrideRegistry::with_builtins();
        let function = registry.resolve("reachy.logging.dict_config").unwrap();
        let settings: toml::Value = toml::from_str("version = 3").unwrap();
        let err = function(&LoggingState::new(), &settings).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_set_levels_rejects_unknown_handler() {
        let registry = OverrideRegistry::with_builtins();
        let function = registry.resolve("reachy.logging.set_levels").unwrap();
        let settings: toml::Value = toml::from_str("[handlers]\nghost = \"INFO\"\n").unwrap();
        let err = function(&LoggingState::new(), &settings).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
