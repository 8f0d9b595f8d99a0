//! Common test utilities

use reachy::logging::{
    FileMode, FormatterConfig, HandlerConfig, LogLevel, LoggerConfig, LoggingConfig,
};
use std::path::Path;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// A JSON file handler at `<dir>/<file>` attached to the `reachy` logger at INFO.
pub fn json_file_config(dir: &Path, file: &str) -> LoggingConfig {
    LoggingConfig::builder()
        .formatter("json-precise", FormatterConfig::Json)
        .handler(
            "file",
            HandlerConfig::file(dir.join(file), FileMode::Write)
                .with_level(LogLevel::Info)
                .with_formatter("json-precise"),
        )
        .logger("reachy", LoggerConfig::new(LogLevel::Info, ["file"]))
        .build()
        .expect("Test config should be valid")
}

/// Parse every line of a JSON log file.
#[allow(dead_code)] // Not every integration test reads JSON output
pub fn read_json_lines(path: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("Log line should be JSON"))
        .collect()
}
