use std::path::PathBuf;
use thiserror::Error;

/// Error raised by an override function. Passed through [`ConfigureError::Override`] untouched.
pub type OverrideError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A logging configuration could not be built or applied.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unsupported logging config version {0} (expected 1)")]
    UnsupportedVersion(u32),

    #[error("Handler '{handler}' references unknown formatter '{formatter}'")]
    UnknownFormatter { handler: String, formatter: String },

    #[error("Logger '{logger}' references unknown handler '{handler}'")]
    UnknownHandler { logger: String, handler: String },

    #[error("Level override references unknown handler '{0}'")]
    NoSuchHandler(String),

    #[error("Invalid format template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("Failed to open log file {}: {source}", path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid logging config: {0}")]
    Deserialize(String),
}

/// An override reference could not be turned into a registered function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Malformed override reference '{0}' (expected '<module>.<function>')")]
    MalformedReference(String),

    #[error("Override module '{module}' not found")]
    ModuleNotFound { module: String },

    #[error("Override module '{module}' has no function '{symbol}'")]
    SymbolNotFound { module: String, symbol: String },
}

/// Failure of a [`LoggingBootstrap::configure`](super::LoggingBootstrap::configure) call.
#[derive(Error, Debug)]
pub enum ConfigureError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Override(OverrideError),

    #[error("Logging configuration is already in progress")]
    AlreadyConfiguring,

    #[error("Failed to install global logging subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}
