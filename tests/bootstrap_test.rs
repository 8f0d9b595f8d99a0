#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

mod common;

use common::{create_test_dir, json_file_config, read_json_lines};
use reachy::logging::{
    ConfigureError, LogLevel, LoggingBootstrap, LoggingState, OverrideRegistry, ResolutionError,
    DEFAULT_LOGGING, DEFAULT_LOG_FILE, ROOT_LOGGER, TIMESTAMP_FORMAT,
};
use reachy::settings::Settings;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;

fn run_with<F: FnOnce()>(state: &Arc<LoggingState>, f: F) {
    let subscriber = tracing_subscriber::registry().with(state.layer());
    tracing::subscriber::with_default(subscriber, f);
}

#[test]
fn test_default_logging_describes_console_and_json_file() {
    let handlers = DEFAULT_LOGGING.handlers();
    assert_eq!(handlers.len(), 2);
    assert!(handlers.contains_key("console"));
    assert!(handlers.contains_key("file"));

    let logger = &DEFAULT_LOGGING.loggers()[ROOT_LOGGER];
    assert_eq!(logger.level, Some(LogLevel::Info));
    assert_eq!(logger.handlers, vec!["console", "file"]);
    assert_eq!(DEFAULT_LOG_FILE, "/tmp/reachy.log");
}

#[test]
fn test_settings_file_drives_set_levels_override() {
    let dir = create_test_dir();
    let settings_path = dir.path().join("settings.toml");
    std::fs::write(
        &settings_path,
        concat!(
            "logging_config = \"reachy.logging.set_levels\"\n\n",
            "[logging_settings.loggers]\n",
            "reachy = \"WARNING\"\n",
        ),
    )
    .unwrap();
    let settings: Settings = reachy::load_settings_from(&settings_path).unwrap();

    let state = Arc::new(LoggingState::new());
    let registry = OverrideRegistry::with_builtins();
    LoggingBootstrap::new(&state, &registry)
        .configure(
            &json_file_config(dir.path(), "reachy.log"),
            settings.logging_config.as_deref(),
            settings.logging_settings.as_ref(),
        )
        .unwrap();

    run_with(&state, || {
        tracing::info!(target: "reachy::arm", "quiet");
        tracing::warn!(target: "reachy::arm", position = 12.5, "gripper slipping");
    });

    let lines = read_json_lines(&dir.path().join("reachy.log"));
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["message"], "gripper slipping");
    assert_eq!(lines[0]["level"], "WARNING");
    assert_eq!(lines[0]["name"], "reachy::arm");
    assert_eq!(lines[0]["position"], 12.5);

    let timestamp = lines[0]["timestamp"].as_str().unwrap();
    assert!(chrono::NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).is_ok());
}

#[test]
fn test_custom_override_from_application_registry() {
    let dir = create_test_dir();
    let state = Arc::new(LoggingState::new());
    let mut registry = OverrideRegistry::new();
    registry.register("app.logging", "quiet_file", |state, settings| {
        let level: LogLevel = settings["level"]
            .as_str()
            .ok_or("level must be a string")?
            .parse()?;
        let mut overrides = reachy::logging::LevelOverrides::default();
        overrides.handlers.insert("file".to_string(), level);
        state.apply_levels(&overrides)?;
        Ok(())
    });
    let settings: toml::Value = toml::from_str("level = \"error\"").unwrap();

    LoggingBootstrap::new(&state, &registry)
        .configure(
            &json_file_config(dir.path(), "reachy.log"),
            Some("app.logging.quiet_file"),
            Some(&settings),
        )
        .unwrap();

    run_with(&state, || {
        tracing::warn!(target: "reachy", "dropped by handler");
        tracing::error!(target: "reachy", "kept");
    });

    let messages: Vec<_> = read_json_lines(&dir.path().join("reachy.log"))
        .into_iter()
        .map(|line| line["message"].clone())
        .collect();
    assert_eq!(messages, vec!["kept"]);
}

#[test]
fn test_unresolvable_override_leaves_defaults_logging() {
    let dir = create_test_dir();
    let state = Arc::new(LoggingState::new());
    let registry = OverrideRegistry::with_builtins();
    let settings: toml::Value = toml::from_str("level = \"DEBUG\"").unwrap();

    let err = LoggingBootstrap::new(&state, &registry)
        .configure(
            &json_file_config(dir.path(), "reachy.log"),
            Some("reachy.logging.missing"),
            Some(&settings),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigureError::Resolution(ResolutionError::SymbolNotFound { .. })
    ));
    assert!(err.to_string().contains("missing"));

    run_with(&state, || tracing::info!(target: "reachy", "defaults still work"));
    let lines = read_json_lines(&dir.path().join("reachy.log"));
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["message"], "defaults still work");
}
