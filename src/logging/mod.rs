//! Logging bootstrap.
//!
//! [`DEFAULT_LOGGING`] (a console handler plus a JSON file handler under the
//! `reachy` logger) is applied first; a settings file can then name an
//! override registered in an [`OverrideRegistry`] to customize it further.
//! Records are emitted with the ordinary `tracing` macros and routed by
//! [`LoggingState`].

mod bootstrap;
mod config;
mod error;
mod format;
mod registry;
mod state;
mod template;

pub use bootstrap::{configure_logging, LoggingBootstrap, OverrideSettings};
pub use config::{
    normalize_logger_name, ConsoleStream, FileMode, FormatterConfig, HandlerConfig,
    HandlerTarget, LevelOverrides, LogLevel, LoggerConfig, LoggingConfig, LoggingConfigBuilder,
    DEFAULT_LOGGING, DEFAULT_LOG_FILE, ROOT_LOGGER,
};
pub use error::{ConfigError, ConfigureError, OverrideError, ResolutionError};
pub use format::{json_object, Formatter, Record, TIMESTAMP_FORMAT};
pub use registry::{split_reference, OverrideFn, OverrideRegistry, BUILTIN_MODULE};
pub use state::{LoggingLayer, LoggingState};
pub use template::{Placeholder, Segment, Template};
