//! Engine configuration.
//!
//! Wraps the simulation tuning with headless-runner settings. Configuration
//! can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};
use wavebound_common::{WaveboundError, WaveboundResult};
use wavebound_gameplay::{Archetype, GameConfig};

/// Configuration file name.
pub const CONFIG_FILE: &str = "wavebound.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Headless Runner ===
    /// Stop after clearing this many waves (0 = no limit)
    pub max_waves: u32,
    /// Stop after this many simulated seconds (0 = no limit)
    pub max_sim_seconds: f32,
    /// Fixed ticks per simulated second
    pub tick_rate: u32,
    /// Archetype equipped at the start
    pub starting_archetype: Archetype,
    /// Take the first offered buff automatically.
    /// When off the runner stops at the first prompt.
    pub autopick: bool,

    // === Simulation ===
    /// Gameplay tuning
    pub game: GameConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_waves: 0,
            max_sim_seconds: 1800.0, // 30 minutes
            tick_rate: 60,
            starting_archetype: Archetype::Slash,
            autopick: true,
            game: GameConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `path`.
    ///
    /// A missing, unreadable or malformed file yields the defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(Some(config)) => {
                info!(path = %path.display(), "Config loaded");
                config
            },
            Ok(None) => {
                info!(path = %path.display(), "No config file, using defaults");
                Self::default()
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Config unusable, using defaults");
                Self::default()
            },
        }
    }

    fn try_load(path: &Path) -> Result<Option<Self>, WaveboundError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&contents)
            .map(Some)
            .map_err(|e| WaveboundError::Serialization(e.to_string()))
    }

    /// Write configuration to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> WaveboundResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| WaveboundError::Serialization(e.to_string()))?;
        fs::write(path, contents)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Clamp runner settings to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(10, 240);
        self.max_sim_seconds = self.max_sim_seconds.max(0.0);
    }

    /// Fixed timestep in seconds.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert!(config.autopick);
        assert_eq!(config.game.player.max_hp, 100);
        assert!(config.game.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.tick_rate = 1;
        config.max_sim_seconds = -5.0;

        config.validate();

        assert_eq!(config.tick_rate, 10);
        assert!(config.max_sim_seconds.abs() < f32::EPSILON);
        assert!((config.fixed_dt() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let mut config = EngineConfig::default();
        config.max_waves = 12;
        config.starting_archetype = Archetype::Lightning;
        config.game.seed = Some(12345);
        config.game.combat.combo_timeout = 3.0;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/wavebound.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(
            &config_path,
            "max_waves = 3\n\n[game.player]\nmax_hp = 250\n",
        )
        .expect("Failed to write config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.max_waves, 3);
        assert_eq!(loaded.game.player.max_hp, 250);
        assert!((loaded.game.player.speed - 200.0).abs() < f32::EPSILON);
        assert_eq!(loaded.tick_rate, 60);
    }

    #[test]
    fn test_invalid_toml_falls_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "max_waves = \"many\"").expect("Failed to write config");

        assert_eq!(EngineConfig::load_from(&config_path), EngineConfig::default());
    }
}
