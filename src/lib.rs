#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::indexing_slicing
    )
)]

pub mod logging;
pub mod settings;

// Re-export commonly used types
pub use logging::{
    configure_logging, ConfigureError, LoggingBootstrap, LoggingConfig, LoggingState,
    OverrideRegistry, DEFAULT_LOGGING,
};
pub use settings::{load_settings, load_settings_from, Settings, SettingsError};
