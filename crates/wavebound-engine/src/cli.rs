//! Command-line interface for the headless runner.

use clap::Parser;
use std::path::PathBuf;

use wavebound_common::{ConfigError, ConfigResult};
use wavebound_gameplay::Archetype;

use crate::config::{EngineConfig, CONFIG_FILE};

/// Headless Wavebound run under an autopilot
#[derive(Parser, Debug)]
#[command(name = "wavebound")]
#[command(about = "Headless Wavebound run under an autopilot")]
#[command(version)]
pub struct Args {
    /// TOML config file
    #[arg(long, value_name = "PATH", default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// RNG seed, overriding the config
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after clearing this many waves, overriding the config
    #[arg(long)]
    pub waves: Option<u32>,

    /// Starting attack (arrow, slash, orb, wave, lightning, summon)
    #[arg(long, value_name = "NAME")]
    pub attack: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Fold command-line overrides into a loaded config.
    pub fn apply(&self, config: &mut EngineConfig) -> ConfigResult<()> {
        if let Some(seed) = self.seed {
            config.game.seed = Some(seed);
        }
        if let Some(waves) = self.waves {
            config.max_waves = waves;
        }
        if let Some(name) = &self.attack {
            config.starting_archetype =
                Archetype::from_name(name).ok_or_else(|| ConfigError::UnknownName {
                    kind: "attack",
                    name: name.clone(),
                })?;
        }
        Ok(())
    }
}

/// Parse the process arguments.
pub fn parse_args() -> Args {
    Args::parse()
}
