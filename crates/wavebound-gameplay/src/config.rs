//! Simulation tuning.
//!
//! Every section carries `#[serde(default)]` so a TOML file only needs the
//! values it overrides. Durations are seconds.

use serde::{Deserialize, Serialize};
use wavebound_common::{ConfigError, ConfigResult, WorldBounds};

/// Root tuning record for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Playfield settings
    pub world: WorldConfig,
    /// Player base stats
    pub player: PlayerConfig,
    /// Combo, knockback, crit and damage-taken tuning
    pub combat: CombatConfig,
    /// Wave progression tuning
    pub waves: WaveConfig,
    /// Experience curve
    pub progression: ProgressionConfig,
    /// Active skill tuning
    pub skills: SkillConfig,
    /// Pool capacities
    pub pools: PoolConfig,
    /// RNG seed (None = random)
    pub seed: Option<u64>,
}

impl GameConfig {
    /// Check the config for values the simulation cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.world.width <= 0.0 || self.world.height <= 0.0 {
            return Err(ConfigError::out_of_range(
                "world.width/height",
                self.world.width.min(self.world.height),
                "> 0",
            ));
        }
        if self.player.max_hp <= 0 {
            return Err(ConfigError::out_of_range(
                "player.max_hp",
                self.player.max_hp,
                ">= 1",
            ));
        }
        if self.combat.combo_timeout <= 0.0 {
            return Err(ConfigError::out_of_range(
                "combat.combo_timeout",
                self.combat.combo_timeout,
                "> 0",
            ));
        }
        if self.combat.combo_multiplier_cap < 1.0 {
            return Err(ConfigError::out_of_range(
                "combat.combo_multiplier_cap",
                self.combat.combo_multiplier_cap,
                ">= 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.combat.reduction_cap) {
            return Err(ConfigError::out_of_range(
                "combat.reduction_cap",
                self.combat.reduction_cap,
                "0..=1",
            ));
        }
        if self.waves.min_spawn_interval <= 0.0 {
            return Err(ConfigError::out_of_range(
                "waves.min_spawn_interval",
                self.waves.min_spawn_interval,
                "> 0",
            ));
        }
        if self.progression.growth < 1.0 {
            return Err(ConfigError::out_of_range(
                "progression.growth",
                self.progression.growth,
                ">= 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.skills.heal_percent) {
            return Err(ConfigError::out_of_range(
                "skills.heal_percent",
                self.skills.heal_percent,
                "0..=1",
            ));
        }
        if self.pools.enemy_capacity == 0 || self.pools.projectile_capacity == 0 {
            return Err(ConfigError::out_of_range(
                "pools.*_capacity",
                self.pools.enemy_capacity.min(self.pools.projectile_capacity) as u32,
                ">= 1",
            ));
        }
        Ok(())
    }
}

/// Playfield settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World width
    pub width: f32,
    /// World height
    pub height: f32,
    /// Distance kept from every edge when teleporting or spawning
    pub edge_margin: f32,
    /// Minimum spawn distance from the player
    pub spawn_min_distance: f32,
    /// Maximum spawn distance from the player
    pub spawn_max_distance: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 2000.0,
            edge_margin: 50.0,
            spawn_min_distance: 400.0,
            spawn_max_distance: 600.0,
        }
    }
}

impl WorldConfig {
    /// Playfield as bounds.
    #[must_use]
    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::new(self.width, self.height)
    }
}

/// Player base stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Movement speed
    pub speed: f32,
    /// Base max HP
    pub max_hp: i32,
    /// Base attack
    pub attack: f32,
    /// Base attack range
    pub attack_range: f32,
    /// Collision radius
    pub size: f32,
    /// Base defense
    pub defense: f32,
    /// Base crit chance
    pub crit_chance: f32,
    /// Base crit multiplier
    pub crit_multiplier: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 200.0,
            max_hp: 100,
            attack: 10.0,
            attack_range: 80.0,
            size: 24.0,
            defense: 0.0,
            crit_chance: 0.05,
            crit_multiplier: 1.5,
        }
    }
}

/// Combat tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Seconds without a hit before the combo resets
    pub combo_timeout: f32,
    /// Multiplier gained per hit after the first
    pub combo_step: f32,
    /// Combo multiplier ceiling
    pub combo_multiplier_cap: f32,
    /// Knockback impulse magnitude
    pub knockback_force: f32,
    /// Knockback duration
    pub knockback_duration: f32,
    /// Invincibility after taking a hit
    pub invincibility_duration: f32,
    /// Ceiling applied to damage reduction and cooldown reduction
    pub reduction_cap: f32,
    /// Defense constant `k` in `defense / (defense + k)`
    pub defense_constant: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            combo_timeout: 2.0,
            combo_step: 0.05,
            combo_multiplier_cap: 2.0,
            knockback_force: 200.0,
            knockback_duration: 0.15,
            invincibility_duration: 0.5,
            reduction_cap: 0.75,
            defense_constant: 50.0,
        }
    }
}

/// Wave progression tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Enemies in wave 0
    pub base_quota: u32,
    /// Extra enemies per wave
    pub quota_per_wave: u32,
    /// Extra enemies per full ten waves
    pub quota_per_decade: u32,
    /// Spawn interval at wave 0
    pub base_spawn_interval: f32,
    /// Spawn interval decrease per wave
    pub spawn_interval_step: f32,
    /// Spawn interval floor
    pub min_spawn_interval: f32,
    /// Announcement time before fighting starts
    pub prepare_time: f32,
    /// Pause between a reward selection and the next wave
    pub resume_delay: f32,
    /// Regular spawns between elite spawns on elite waves
    pub elite_spawn_every: u32,
    /// Speed difficulty ceiling
    pub speed_multiplier_cap: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            base_quota: 10,
            quota_per_wave: 3,
            quota_per_decade: 5,
            base_spawn_interval: 1.0,
            spawn_interval_step: 0.03,
            min_spawn_interval: 0.2,
            prepare_time: 3.0,
            resume_delay: 1.0,
            elite_spawn_every: 10,
            speed_multiplier_cap: 1.5,
        }
    }
}

/// Experience curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Experience required for the first level-up
    pub first_level_exp: u32,
    /// Requirement growth per level
    pub growth: f32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            first_level_exp: 100,
            growth: 1.15,
        }
    }
}

/// Active skill tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    /// Speed boost cooldown
    pub speed_boost_cooldown: f32,
    /// Speed boost duration
    pub speed_boost_duration: f32,
    /// Speed boost multiplier
    pub speed_boost_multiplier: f32,
    /// Dash cooldown
    pub dash_cooldown: f32,
    /// Dash distance
    pub dash_distance: f32,
    /// Dash invulnerability window
    pub dash_duration: f32,
    /// Width of the dash sweep for penetrating dashes
    pub dash_width: f32,
    /// Shield cooldown
    pub shield_cooldown: f32,
    /// Shield duration
    pub shield_duration: f32,
    /// Heal cooldown
    pub heal_cooldown: f32,
    /// Fraction of max HP healed
    pub heal_percent: f32,
    /// Invincibility left after a dash or shield ends
    pub trailing_invincibility: f32,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            speed_boost_cooldown: 8.0,
            speed_boost_duration: 3.0,
            speed_boost_multiplier: 1.5,
            dash_cooldown: 3.0,
            dash_distance: 150.0,
            dash_duration: 0.15,
            dash_width: 24.0,
            shield_cooldown: 12.0,
            shield_duration: 2.0,
            heal_cooldown: 15.0,
            heal_percent: 0.3,
            trailing_invincibility: 0.2,
        }
    }
}

/// Pool capacities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Max simultaneously live enemies
    pub enemy_capacity: usize,
    /// Max in-flight projectiles per attack
    pub projectile_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enemy_capacity: 256,
            projectile_capacity: 512,
        }
    }
}
