// Allow panic/unwrap/expect in tests (denied globally via Cargo.toml lints)
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result
    )
)]

use clap::Parser;
use color_eyre::eyre::Result;
use reachy::logging::{configure_logging, OverrideRegistry};
use reachy::settings::{load_settings, load_settings_from, Settings};
use std::path::PathBuf;
use tracing::{debug, info};

/// Reachy - robot process launcher with configurable logging
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (default: <config dir>/reachy/settings.toml)
    #[arg(short, long, env = "REACHY_SETTINGS")]
    settings: Option<PathBuf>,

    /// Print the registered logging overrides and exit
    #[arg(long)]
    list_overrides: bool,
}

fn main() -> Result<()> {
    // Install color-eyre error hooks for colored error output
    color_eyre::install()?;

    let args = Args::parse();
    let registry = OverrideRegistry::with_builtins();

    if args.list_overrides {
        for reference in registry.references() {
            println!("{reference}");
        }
        return Ok(());
    }

    // Settings are read before logging exists, so failures go to stderr via eyre.
    let settings: Settings = match &args.settings {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };

    let state = configure_logging(
        settings.logging_config.as_deref(),
        settings.logging_settings.as_ref(),
        &registry,
    )?;

    info!(
        override_ref = settings.logging_config.as_deref().unwrap_or("none"),
        "Logging configured"
    );
    for path in state.open_files() {
        debug!("Writing logs to {}", path.display());
    }

    Ok(())
}
