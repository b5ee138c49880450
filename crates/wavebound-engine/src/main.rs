//! # Wavebound Engine
//!
//! Headless runner for Wavebound.
//!
//! Loads a TOML config, plays one run under an autopilot and prints the final
//! report as JSON on stdout.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod cli;
mod config;
mod headless;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::EngineConfig;

/// Main entry point.
fn main() -> Result<()> {
    let args = cli::parse_args();

    let filter = EnvFilter::from_default_env().add_directive("wavebound=info".parse()?);
    if args.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    info!("Wavebound starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = EngineConfig::load_from(&args.config);
    args.apply(&mut config).context("Invalid command line")?;
    config.validate();
    config.game.validate().context("Invalid game config")?;

    let report = headless::run_headless(&config).context("Headless run failed")?;
    let json = serde_json::to_string_pretty(&report).context("Failed to encode run report")?;
    println!("{json}");

    info!("Wavebound shutdown complete");
    Ok(())
}
