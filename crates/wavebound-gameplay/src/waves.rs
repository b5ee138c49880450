//! Endless wave progression.
//!
//! The director owns the wave lifecycle:
//!
//! ```text
//! Idle -> Preparing -> Fighting -> Reward -> (resume delay) -> Idle -> ...
//! ```
//!
//! It decides what spawns and when, scales enemies by wave difficulty,
//! counts kills against the quota and reports milestone waves. Buff
//! choices are handled by the run; the director only waits in `Reward`
//! until [`WaveDirector::resume`] is called.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wavebound_common::{direction, EnemyHandle, WorldBounds};

use crate::buffs::RollGuarantee;
use crate::config::{WaveConfig, WorldConfig};
use crate::enemy::{Difficulty, EnemyKind, EnemyTypeConfig};
use crate::events::{EventBus, GameEvent};
use crate::spatial::Spawner;

// ============================================================================
// Wave Shape
// ============================================================================

/// Wave lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WavePhase {
    /// Between waves.
    #[default]
    Idle,
    /// Announced, counting down to the fight.
    Preparing,
    /// Spawning and fighting.
    Fighting,
    /// Cleared, waiting for the reward to resolve.
    Reward,
}

/// Special properties of a wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WaveFlags {
    /// Spawns a boss when the fight starts
    pub boss: bool,
    /// Spawns extra elites during the fight
    pub elite: bool,
    /// Doubled quota
    pub swarm: bool,
}

impl WaveFlags {
    /// Flags for a wave number. Boss waves are never elite waves.
    #[must_use]
    pub const fn for_wave(wave: u32) -> Self {
        let boss = wave > 0 && wave % 5 == 0;
        Self {
            boss,
            elite: !boss && wave > 0 && wave % 3 == 0,
            swarm: wave > 0 && wave % 10 == 0,
        }
    }

    /// Check whether any flag is set.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.boss || self.elite || self.swarm
    }
}

/// Named waves with a one-off reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Milestone {
    /// Wave 5: an extra buff choice.
    FirstBlood,
    /// Wave 10: legendary reward roll.
    RisingStar,
    /// Wave 15: all stats +10%.
    Renowned,
    /// Wave 20: special buff pool unlocked.
    Warlord,
    /// Wave 25: full heal and a legendary extra choice.
    Conqueror,
    /// Wave 30: title only.
    Peerless,
    /// Wave 50: title only.
    Immortal,
}

impl Milestone {
    /// Every milestone in wave order.
    pub const ALL: [Self; 7] = [
        Self::FirstBlood,
        Self::RisingStar,
        Self::Renowned,
        Self::Warlord,
        Self::Conqueror,
        Self::Peerless,
        Self::Immortal,
    ];

    /// Milestone reached by clearing a wave, if any.
    #[must_use]
    pub fn for_wave(wave: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.wave() == wave)
    }

    /// Wave that triggers this milestone.
    #[must_use]
    pub const fn wave(self) -> u32 {
        match self {
            Self::FirstBlood => 5,
            Self::RisingStar => 10,
            Self::Renowned => 15,
            Self::Warlord => 20,
            Self::Conqueror => 25,
            Self::Peerless => 30,
            Self::Immortal => 50,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FirstBlood => "First Blood",
            Self::RisingStar => "Rising Star",
            Self::Renowned => "Renowned",
            Self::Warlord => "Warlord",
            Self::Conqueror => "Conqueror",
            Self::Peerless => "Peerless",
            Self::Immortal => "Immortal",
        }
    }
}

/// Summary of a cleared wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveReport {
    /// Wave number
    pub wave: u32,
    /// Kills counted against the quota
    pub kills: u32,
    /// Wave flags
    pub flags: WaveFlags,
    /// Milestone reached
    pub milestone: Option<Milestone>,
}

impl WaveReport {
    /// Rarity guarantee for this wave's reward roll.
    #[must_use]
    pub fn guarantee(&self) -> RollGuarantee {
        match self.milestone {
            Some(Milestone::RisingStar) => RollGuarantee::Legendary,
            Some(_) => RollGuarantee::RareOrBetter,
            None if self.flags.boss => RollGuarantee::RareOrBetter,
            None => RollGuarantee::Standard,
        }
    }
}

// ============================================================================
// Scaling
// ============================================================================

/// Enemies to kill in a wave, before boss, elite and split additions.
#[must_use]
pub fn quota(wave: u32, config: &WaveConfig) -> u32 {
    let base =
        config.base_quota + config.quota_per_wave * wave + (wave / 10) * config.quota_per_decade;
    if WaveFlags::for_wave(wave).swarm {
        base * 2
    } else {
        base
    }
}

/// Seconds between regular spawns.
#[must_use]
pub fn spawn_interval(wave: u32, config: &WaveConfig) -> f32 {
    (config.base_spawn_interval - config.spawn_interval_step * wave as f32)
        .max(config.min_spawn_interval)
}

/// Enemy stat multipliers for a wave. Non-decreasing in `wave`.
#[must_use]
pub fn difficulty(wave: u32, speed_cap: f32) -> Difficulty {
    let w = wave as f32;
    let decades = w / 10.0;
    Difficulty {
        hp: 1.0 + 0.1 * w + decades * decades * 0.05,
        atk: 1.0 + 0.08 * w,
        speed: (1.0 + 0.02 * w).min(speed_cap),
    }
}

/// Regular spawn weights. Kinds unlock at fixed waves.
#[must_use]
pub fn type_weights(wave: u32) -> Vec<(EnemyKind, u32)> {
    let mut weights = vec![(EnemyKind::Shadow, 50)];
    if wave >= 3 {
        weights.push((EnemyKind::Wolf, 20));
    }
    if wave >= 5 {
        weights.push((EnemyKind::Snake, 15));
    }
    if wave >= 8 {
        weights.push((EnemyKind::Wraith, 15));
    }
    weights
}

// ============================================================================
// Director
// ============================================================================

/// Drives spawning and the wave lifecycle.
#[derive(Debug, Clone)]
pub struct WaveDirector {
    config: WaveConfig,
    bounds: WorldBounds,
    edge_margin: f32,
    spawn_min_distance: f32,
    spawn_max_distance: f32,
    rng: fastrand::Rng,

    wave: u32,
    phase: WavePhase,
    flags: WaveFlags,
    difficulty: Difficulty,
    weights: Vec<(EnemyKind, u32)>,
    interval: f32,

    regular_quota: u32,
    regular_spawned: u32,
    quota: u32,
    spawned: u32,
    killed: u32,
    elites_pending: u32,
    last_elite_mark: u32,
    boss_pending: bool,

    spawn_timer: f32,
    phase_timer: f32,
    resume_timer: Option<f32>,
}

impl WaveDirector {
    /// Creates a director before wave 1.
    #[must_use]
    pub fn new(config: WaveConfig, world: &WorldConfig, rng: fastrand::Rng) -> Self {
        Self {
            bounds: world.bounds(),
            edge_margin: world.edge_margin,
            spawn_min_distance: world.spawn_min_distance,
            spawn_max_distance: world.spawn_max_distance.max(world.spawn_min_distance),
            rng,
            wave: 0,
            phase: WavePhase::Idle,
            flags: WaveFlags::default(),
            difficulty: Difficulty::default(),
            weights: type_weights(0),
            interval: spawn_interval(0, &config),
            regular_quota: 0,
            regular_spawned: 0,
            quota: 0,
            spawned: 0,
            killed: 0,
            elites_pending: 0,
            last_elite_mark: 0,
            boss_pending: false,
            spawn_timer: 0.0,
            phase_timer: 0.0,
            resume_timer: None,
            config,
        }
    }

    /// Current wave number (0 before the first wave).
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Current wave flags.
    #[must_use]
    pub const fn flags(&self) -> WaveFlags {
        self.flags
    }

    /// Current difficulty multipliers.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Current spawn weights.
    #[must_use]
    pub fn weights(&self) -> &[(EnemyKind, u32)] {
        &self.weights
    }

    /// Current regular spawn interval.
    #[must_use]
    pub const fn spawn_interval(&self) -> f32 {
        self.interval
    }

    /// Enemies to kill this wave, including bosses, elites and split
    /// children spawned so far.
    #[must_use]
    pub const fn quota(&self) -> u32 {
        self.quota
    }

    /// Enemies spawned this wave.
    #[must_use]
    pub const fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Enemies killed this wave.
    #[must_use]
    pub const fn killed(&self) -> u32 {
        self.killed
    }

    /// Kills still needed.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.quota.saturating_sub(self.killed)
    }

    /// Announce the next wave. Only valid while idle.
    pub fn start_next_wave(&mut self, events: &EventBus) -> bool {
        if self.phase != WavePhase::Idle {
            return false;
        }
        self.resume_timer = None;
        self.wave += 1;
        let wave = self.wave;

        self.flags = WaveFlags::for_wave(wave);
        self.difficulty = difficulty(wave, self.config.speed_multiplier_cap);
        self.weights = type_weights(wave);
        self.interval = spawn_interval(wave, &self.config);
        self.regular_quota = quota(wave, &self.config);
        self.quota = self.regular_quota;
        self.regular_spawned = 0;
        self.spawned = 0;
        self.killed = 0;
        self.last_elite_mark = 0;
        self.elites_pending = if self.flags.elite { wave / 5 + 1 } else { 0 };
        self.boss_pending = self.flags.boss;
        self.spawn_timer = 0.0;
        self.phase_timer = self.config.prepare_time;
        self.phase = WavePhase::Preparing;

        info!(
            wave,
            quota = self.quota,
            boss = self.flags.boss,
            elite = self.flags.elite,
            swarm = self.flags.swarm,
            "Wave announced"
        );
        events.publish(GameEvent::WaveAnnounced {
            wave,
            flags: self.flags,
        });
        true
    }

    /// Leave `Reward` and schedule the next wave after the resume delay.
    pub fn resume(&mut self) -> bool {
        if self.phase != WavePhase::Reward {
            return false;
        }
        self.phase = WavePhase::Idle;
        self.resume_timer = Some(self.config.resume_delay);
        debug!(wave = self.wave, delay = self.config.resume_delay, "Wave resume scheduled");
        true
    }

    /// Advance timers and perform due spawns around `player`.
    ///
    /// Returns the handles spawned this call.
    pub fn update(
        &mut self,
        dt: f32,
        player: Vec2,
        spawner: &mut dyn Spawner,
        events: &EventBus,
    ) -> Vec<EnemyHandle> {
        let mut spawned = Vec::new();
        match self.phase {
            WavePhase::Idle => {
                if let Some(timer) = self.resume_timer.as_mut() {
                    *timer -= dt;
                    if *timer <= 0.0 {
                        self.start_next_wave(events);
                    }
                }
            }
            WavePhase::Preparing => {
                self.phase_timer -= dt;
                if self.phase_timer <= 0.0 {
                    self.begin_fight(player, spawner, events, &mut spawned);
                }
            }
            WavePhase::Fighting => {
                self.spawn_timer += dt;
                if self.spawn_timer >= self.interval && self.regular_spawned < self.regular_quota {
                    self.spawn_timer = 0.0;
                    let kind = self.pick_kind();
                    let config = EnemyTypeConfig::base(kind).scaled(&self.difficulty);
                    let position = self.spawn_position(player);
                    if let Some(handle) = self.place(spawner, position, &config) {
                        self.regular_spawned += 1;
                        spawned.push(handle);
                    }
                }
                self.spawn_due_boss(player, spawner, &mut spawned);
                self.spawn_due_elite(player, spawner, &mut spawned);
            }
            WavePhase::Reward => {}
        }
        spawned
    }

    /// Spawn an enemy outside the regular cadence (split children).
    ///
    /// A successful spawn adds one to the quota.
    pub fn spawn_extra(
        &mut self,
        spawner: &mut dyn Spawner,
        position: Vec2,
        config: &EnemyTypeConfig,
    ) -> Option<EnemyHandle> {
        if self.phase != WavePhase::Fighting {
            return None;
        }
        let position = self.bounds.clamp(position, self.edge_margin);
        let handle = self.place(spawner, position, config)?;
        self.quota += 1;
        Some(handle)
    }

    /// Count a kill. Returns the wave report when this kill clears the wave.
    pub fn on_enemy_killed(&mut self, kind: EnemyKind, events: &EventBus) -> Option<WaveReport> {
        if self.phase != WavePhase::Fighting {
            return None;
        }
        self.killed += 1;
        debug!(wave = self.wave, kind = kind.name(), remaining = self.remaining(), "Kill counted");

        let regulars_done = self.regular_spawned >= self.regular_quota;
        let spawns_done = regulars_done && !self.boss_pending && self.spawned >= self.quota;
        if self.remaining() > 0 || !spawns_done {
            return None;
        }

        self.phase = WavePhase::Reward;
        let report = WaveReport {
            wave: self.wave,
            kills: self.killed,
            flags: self.flags,
            milestone: Milestone::for_wave(self.wave),
        };
        info!(
            wave = report.wave,
            kills = report.kills,
            milestone = report.milestone.map(Milestone::name),
            "Wave complete"
        );
        events.publish(GameEvent::WaveComplete {
            wave: report.wave,
            kills: report.kills,
            milestone: report.milestone,
        });
        Some(report)
    }

    fn begin_fight(
        &mut self,
        player: Vec2,
        spawner: &mut dyn Spawner,
        events: &EventBus,
        spawned: &mut Vec<EnemyHandle>,
    ) {
        self.phase = WavePhase::Fighting;
        self.spawn_timer = 0.0;
        self.spawn_due_boss(player, spawner, spawned);

        info!(wave = self.wave, quota = self.quota, "Wave started");
        events.publish(GameEvent::WaveStarted {
            wave: self.wave,
            quota: self.quota,
        });
    }

    /// Place the wave's boss. A dropped request stays pending for the next tick.
    fn spawn_due_boss(
        &mut self,
        player: Vec2,
        spawner: &mut dyn Spawner,
        spawned: &mut Vec<EnemyHandle>,
    ) {
        if !self.boss_pending {
            return;
        }
        let boss = EnemyTypeConfig::base(EnemyKind::Boss).scaled(&self.special_difficulty());
        let position = self.spawn_position(player);
        match self.place(spawner, position, &boss) {
            Some(handle) => {
                self.boss_pending = false;
                self.quota += 1;
                spawned.push(handle);
                info!(wave = self.wave, hp = boss.hp, "Boss spawned");
            }
            None => debug!(wave = self.wave, "Boss spawn dropped, retrying"),
        }
    }

    fn spawn_due_elite(
        &mut self,
        player: Vec2,
        spawner: &mut dyn Spawner,
        spawned: &mut Vec<EnemyHandle>,
    ) {
        let every = self.config.elite_spawn_every.max(1);
        let mark = self.regular_spawned;
        if self.elites_pending == 0 || mark == 0 || mark % every != 0 || mark == self.last_elite_mark
        {
            return;
        }
        let elite = EnemyTypeConfig::base(EnemyKind::Elite).scaled(&self.special_difficulty());
        let position = self.spawn_position(player);
        if let Some(handle) = self.place(spawner, position, &elite) {
            self.last_elite_mark = mark;
            self.elites_pending -= 1;
            self.quota += 1;
            spawned.push(handle);
            debug!(wave = self.wave, pending = self.elites_pending, "Elite spawned");
        }
    }

    fn place(
        &mut self,
        spawner: &mut dyn Spawner,
        position: Vec2,
        config: &EnemyTypeConfig,
    ) -> Option<EnemyHandle> {
        let handle = spawner.spawn_enemy(position, config)?;
        self.spawned += 1;
        Some(handle)
    }

    /// Bosses and elites scale hp and atk only.
    fn special_difficulty(&self) -> Difficulty {
        Difficulty {
            speed: 1.0,
            ..self.difficulty
        }
    }

    fn pick_kind(&mut self) -> EnemyKind {
        let total: u32 = self.weights.iter().map(|(_, w)| w).sum();
        if total == 0 {
            return EnemyKind::Shadow;
        }
        let mut roll = self.rng.u32(..total);
        for &(kind, weight) in &self.weights {
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        EnemyKind::Shadow
    }

    fn spawn_position(&mut self, player: Vec2) -> Vec2 {
        let angle = self.rng.f32() * TAU;
        let span = self.spawn_max_distance - self.spawn_min_distance;
        let distance = self.spawn_min_distance + self.rng.f32() * span;
        self.bounds
            .clamp(player + direction(angle) * distance, self.edge_margin)
    }
}
