//! Typed logging configuration: formatters, handlers and loggers.
//!
//! A [`LoggingConfig`] is validated when it is built or deserialized, so a
//! value of this type never references a formatter or handler it does not
//! define.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::ConfigError;
use super::template::Template;

/// Path of the JSON log file written by [`DEFAULT_LOGGING`].
pub const DEFAULT_LOG_FILE: &str = "/tmp/reachy.log";

/// Root logger name used by the crate's own records.
pub const ROOT_LOGGER: &str = "reachy";

/// The built-in configuration, applied before any override.
pub static DEFAULT_LOGGING: Lazy<LoggingConfig> = Lazy::new(default_logging);

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// Record severity, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    const fn lowest() -> Self {
        Self::Trace
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, ConfigError> {
        s.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warning,
            tracing::Level::ERROR => Self::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Formatters, handlers, loggers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum FormatterConfig {
    /// Plain text line rendered from a template.
    Text { format: Template },
    /// One JSON object per record, enriched with `name`, `level` and `timestamp`.
    Json,
}

impl FormatterConfig {
    pub fn text(format: &str) -> Result<Self, ConfigError> {
        Ok(Self::Text {
            format: format.parse()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    Stdout,
    #[default]
    Stderr,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileMode {
    /// Truncate on open.
    #[serde(rename = "w", alias = "write")]
    Write,
    #[default]
    #[serde(rename = "a", alias = "append")]
    Append,
}

/// Where a handler writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum HandlerTarget {
    Console {
        #[serde(default)]
        stream: ConsoleStream,
    },
    File {
        filename: PathBuf,
        #[serde(default)]
        mode: FileMode,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(flatten)]
    pub target: HandlerTarget,
    #[serde(default = "LogLevel::lowest")]
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
}

impl HandlerConfig {
    #[must_use]
    pub fn console(stream: ConsoleStream) -> Self {
        Self {
            target: HandlerTarget::Console { stream },
            level: LogLevel::lowest(),
            formatter: None,
        }
    }

    #[must_use]
    pub fn file(filename: impl Into<PathBuf>, mode: FileMode) -> Self {
        Self {
            target: HandlerTarget::File {
                filename: filename.into(),
                mode,
            },
            level: LogLevel::lowest(),
            formatter: None,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = Some(formatter.into());
        self
    }
}

fn default_propagate() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Unset means inherit from the nearest configured ancestor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub handlers: Vec<String>,
    #[serde(default = "default_propagate")]
    pub propagate: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: None,
            handlers: Vec::new(),
            propagate: true,
        }
    }
}

impl LoggerConfig {
    #[must_use]
    pub fn new<I, S>(level: LogLevel, handlers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            level: Some(level),
            handlers: handlers.into_iter().map(Into::into).collect(),
            propagate: true,
        }
    }

    #[must_use]
    pub fn without_propagation(mut self) -> Self {
        self.propagate = false;
        self
    }
}

/// Loggers are addressed by `tracing` target, so `a.b` and `a::b` name the same logger.
#[must_use]
pub fn normalize_logger_name(name: &str) -> String {
    name.replace('.', "::")
}

// ---------------------------------------------------------------------------
// LoggingConfig
// ---------------------------------------------------------------------------

fn default_version() -> u32 {
    1
}

/// Serialized shape of [`LoggingConfig`], before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawLoggingConfig {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    formatters: BTreeMap<String, FormatterConfig>,
    #[serde(default)]
    handlers: BTreeMap<String, HandlerConfig>,
    #[serde(default)]
    loggers: BTreeMap<String, LoggerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<LoggerConfig>,
}

/// A complete, validated logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLoggingConfig", into = "RawLoggingConfig")]
pub struct LoggingConfig {
    formatters: BTreeMap<String, FormatterConfig>,
    handlers: BTreeMap<String, HandlerConfig>,
    loggers: BTreeMap<String, LoggerConfig>,
    root: Option<LoggerConfig>,
}

impl LoggingConfig {
    #[must_use]
    pub fn builder() -> LoggingConfigBuilder {
        LoggingConfigBuilder::default()
    }

    /// A configuration with no loggers; every record is dropped.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            formatters: BTreeMap::new(),
            handlers: BTreeMap::new(),
            loggers: BTreeMap::new(),
            root: None,
        }
    }

    /// Parse and validate a configuration from a TOML value.
    pub fn from_value(value: toml::Value) -> Result<Self, ConfigError> {
        value
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Deserialize(e.to_string()))
    }

    #[must_use]
    pub fn formatters(&self) -> &BTreeMap<String, FormatterConfig> {
        &self.formatters
    }

    #[must_use]
    pub fn handlers(&self) -> &BTreeMap<String, HandlerConfig> {
        &self.handlers
    }

    #[must_use]
    pub fn loggers(&self) -> &BTreeMap<String, LoggerConfig> {
        &self.loggers
    }

    #[must_use]
    pub fn root(&self) -> Option<&LoggerConfig> {
        self.root.as_ref()
    }

    /// A copy of this configuration with `overrides` applied on top.
    pub fn with_levels(&self, overrides: &LevelOverrides) -> Result<Self, ConfigError> {
        let mut config = self.clone();
        for (handler, level) in &overrides.handlers {
            config.set_handler_level(handler, *level)?;
        }
        for (logger, level) in &overrides.loggers {
            config.set_logger_level(logger, *level);
        }
        Ok(config)
    }

    /// Change a handler's level in place.
    pub(crate) fn set_handler_level(
        &mut self,
        name: &str,
        level: LogLevel,
    ) -> Result<(), ConfigError> {
        let handler = self
            .handlers
            .get_mut(name)
            .ok_or_else(|| ConfigError::NoSuchHandler(name.to_string()))?;
        handler.level = level;
        Ok(())
    }

    /// Change a logger's level, adding a handler-less logger if it is not configured.
    pub(crate) fn set_logger_level(&mut self, name: &str, level: LogLevel) {
        self.loggers
            .entry(normalize_logger_name(name))
            .or_default()
            .level = Some(level);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, handler) in &self.handlers {
            if let Some(formatter) = &handler.formatter {
                if !self.formatters.contains_key(formatter) {
                    return Err(ConfigError::UnknownFormatter {
                        handler: name.clone(),
                        formatter: formatter.clone(),
                    });
                }
            }
        }

        let loggers = self
            .loggers
            .iter()
            .map(|(name, logger)| (name.as_str(), logger))
            .chain(self.root.iter().map(|logger| ("root", logger)));
        for (name, logger) in loggers {
            if let Some(missing) = logger
                .handlers
                .iter()
                .find(|h| !self.handlers.contains_key(h.as_str()))
            {
                return Err(ConfigError::UnknownHandler {
                    logger: name.to_string(),
                    handler: missing.clone(),
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<RawLoggingConfig> for LoggingConfig {
    type Error = ConfigError;

    fn try_from(raw: RawLoggingConfig) -> Result<Self, Self::Error> {
        if raw.version != 1 {
            return Err(ConfigError::UnsupportedVersion(raw.version));
        }
        let config = Self {
            formatters: raw.formatters,
            handlers: raw.handlers,
            loggers: raw
                .loggers
                .into_iter()
                .map(|(name, logger)| (normalize_logger_name(&name), logger))
                .collect(),
            root: raw.root,
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<LoggingConfig> for RawLoggingConfig {
    fn from(config: LoggingConfig) -> Self {
        Self {
            version: 1,
            formatters: config.formatters,
            handlers: config.handlers,
            loggers: config.loggers,
            root: config.root,
        }
    }
}

/// Level changes applied on top of the installed configuration.
///
/// Loggers that are not configured yet are added without handlers, so their
/// records still reach the handlers of their ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelOverrides {
    #[serde(default)]
    pub loggers: BTreeMap<String, LogLevel>,
    #[serde(default)]
    pub handlers: BTreeMap<String, LogLevel>,
}

impl LevelOverrides {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty() && self.handlers.is_empty()
    }
}

/// Builds a [`LoggingConfig`], validating references in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct LoggingConfigBuilder {
    formatters: BTreeMap<String, FormatterConfig>,
    handlers: BTreeMap<String, HandlerConfig>,
    loggers: BTreeMap<String, LoggerConfig>,
    root: Option<LoggerConfig>,
}

impl LoggingConfigBuilder {
    #[must_use]
    pub fn formatter(mut self, name: impl Into<String>, formatter: FormatterConfig) -> Self {
        self.formatters.insert(name.into(), formatter);
        self
    }

    #[must_use]
    pub fn handler(mut self, name: impl Into<String>, handler: HandlerConfig) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    #[must_use]
    pub fn logger(mut self, name: &str, logger: LoggerConfig) -> Self {
        self.loggers.insert(normalize_logger_name(name), logger);
        self
    }

    #[must_use]
    pub fn root(mut self, logger: LoggerConfig) -> Self {
        self.root = Some(logger);
        self
    }

    pub fn build(self) -> Result<LoggingConfig, ConfigError> {
        let config = LoggingConfig {
            formatters: self.formatters,
            handlers: self.handlers,
            loggers: self.loggers,
            root: self.root,
        };
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_logging() -> LoggingConfig {
    let formatters = BTreeMap::from([
        (
            "precise".to_string(),
            FormatterConfig::Text {
                format: Template::precise(),
            },
        ),
        ("json-precise".to_string(), FormatterConfig::Json),
    ]);
    let handlers = BTreeMap::from([
        (
            "console".to_string(),
            HandlerConfig::console(ConsoleStream::Stderr)
                .with_level(LogLevel::Info)
                .with_formatter("precise"),
        ),
        (
            "file".to_string(),
            HandlerConfig::file(DEFAULT_LOG_FILE, FileMode::Write)
                .with_level(LogLevel::Info)
                .with_formatter("json-precise"),
        ),
    ]);
    let loggers = BTreeMap::from([(
        ROOT_LOGGER.to_string(),
        LoggerConfig::new(LogLevel::Info, ["console", "file"]),
    )]);

    LoggingConfig {
        formatters,
        handlers,
        loggers,
        root: None,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
