//! Headless runner.
//!
//! Drives a [`Run`] with a fixed timestep and a simple autopilot in place of
//! a human player. Used for balance checks and smoke runs.

use anyhow::{Context, Result};
use glam::Vec2;
use serde::Serialize;
use tracing::{debug, info};
use wavebound_common::angle_between;
use wavebound_gameplay::prelude::*;

use crate::config::EngineConfig;

/// HP fraction under which the autopilot heals.
const HEAL_BELOW: f32 = 0.4;
/// Enemies touching the player before the autopilot shields.
const CROWD_SIZE: usize = 3;
/// Extra radius counted as "adjacent".
const CROWD_MARGIN: f32 = 40.0;
/// Distance band the autopilot tries to hold around its target.
const KITE_SLACK: f32 = 20.0;

// ============================================================================
// Autopilot
// ============================================================================

/// Scripted player: kites the nearest enemy and keeps itself alive.
#[derive(Debug, Clone)]
pub struct Autopilot {
    preferred_distance: f32,
    strafe: f32,
}

impl Autopilot {
    /// Autopilot that holds `preferred_distance` from its target.
    #[must_use]
    pub fn new(preferred_distance: f32) -> Self {
        Self {
            preferred_distance: preferred_distance.max(KITE_SLACK * 2.0),
            strafe: 1.0,
        }
    }

    /// Commands for the coming tick.
    pub fn decide<W: EnemyWorld + Spawner>(&mut self, run: &Run<W>) -> Vec<Command> {
        let character = run.character();
        let position = character.position;
        let enemies = run.world().active_enemies();
        let mut commands = Vec::new();

        if character.hp_fraction() < HEAL_BELOW && run.skills().is_ready(SkillSlot::Heal) {
            commands.push(Command::CastSkill(SkillSlot::Heal));
        }

        let crowd = run
            .world()
            .overlapping(position, character.base().size + CROWD_MARGIN)
            .len();
        if crowd >= CROWD_SIZE {
            if run.skills().is_ready(SkillSlot::Shield) {
                commands.push(Command::CastSkill(SkillSlot::Shield));
            } else if run.skills().is_ready(SkillSlot::Dash) && !run.skills().is_shielded() {
                commands.push(Command::CastSkill(SkillSlot::Dash));
            }
        }

        let Some(target) = nearest_enemy(&enemies, position, f32::INFINITY, |_| false) else {
            commands.push(Command::Move(Vec2::ZERO));
            return commands;
        };

        commands.push(Command::Aim(angle_between(position, target.position)));

        let offset = target.position - position;
        let distance = offset.length();
        let toward = offset.normalize_or_zero();
        let heading = if distance > self.preferred_distance + KITE_SLACK {
            toward
        } else if distance < self.preferred_distance - KITE_SLACK {
            if run.skills().is_ready(SkillSlot::SpeedBoost) && crowd > 0 {
                commands.push(Command::CastSkill(SkillSlot::SpeedBoost));
            }
            -toward
        } else {
            // circle the target, flipping direction at the walls
            let bounds = run.config().world.bounds();
            let margin = run.config().world.edge_margin;
            let side = toward.perp() * self.strafe;
            if bounds.clamp(position + side * margin, margin) != position + side * margin {
                self.strafe = -self.strafe;
            }
            toward.perp() * self.strafe
        };
        commands.push(Command::Move(heading));
        commands
    }
}

// ============================================================================
// Event Log
// ============================================================================

/// Presentation sink that tallies what a headless run would have shown.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventLog {
    /// Events received
    pub total: usize,
    /// Waves cleared
    pub waves_cleared: u32,
    /// Level-ups
    pub level_ups: u32,
    /// Crits landed
    pub crits: u32,
    /// Revives used
    pub revives: u32,
}

impl PresentationSink for EventLog {
    fn handle(&mut self, event: &GameEvent) {
        self.total += 1;
        match *event {
            GameEvent::WaveComplete { wave, kills, .. } => {
                self.waves_cleared += 1;
                info!(wave, kills, "Wave cleared");
            },
            GameEvent::LevelUp { .. } => self.level_ups += 1,
            GameEvent::DamageDealt { is_crit: true, .. } => self.crits += 1,
            GameEvent::PlayerRevived { hp } => {
                self.revives += 1;
                info!(hp, "Revived");
            },
            GameEvent::BuffAcquired { id, stacks } => {
                debug!(buff = %id, stacks, "Buff acquired");
            },
            _ => {},
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Why a headless run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The character died
    GameOver,
    /// The configured wave count was cleared
    WaveLimit,
    /// The simulated time budget ran out
    TimeLimit,
    /// A choice is open and autopick is off
    AwaitingChoice,
}

/// Result of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct HeadlessReport {
    /// Why the run stopped
    pub stop: StopReason,
    /// Final statistics
    pub stats: RunStats,
    /// Event tallies
    pub events: EventLog,
    /// Buffs held at the end, by id
    pub buffs: Vec<(String, u32)>,
    /// Attacks held at the end
    pub attacks: Vec<AttackInfo>,
}

/// Play one run to completion under the autopilot.
pub fn run_headless(config: &EngineConfig) -> Result<HeadlessReport> {
    let world = EnemyPool::new(config.game.pools.enemy_capacity);
    let mut run = Run::new(config.game.clone(), config.starting_archetype, world)
        .context("Failed to start run")?;
    info!(
        run = %run.id(),
        attack = %config.starting_archetype,
        tick_rate = config.tick_rate,
        "Headless run starting"
    );

    let dt = config.fixed_dt();
    let mut pilot = Autopilot::new(run.character().base().attack_range * 0.8);
    let mut log = EventLog::default();
    run.command(Command::SetAutoAttack(true));

    let stop = loop {
        run.drain_events(&mut log);

        if run.is_over() {
            break StopReason::GameOver;
        }
        if config.max_waves > 0 && log.waves_cleared >= config.max_waves {
            break StopReason::WaveLimit;
        }
        if config.max_sim_seconds > 0.0 && run.stats().survival_time >= config.max_sim_seconds {
            break StopReason::TimeLimit;
        }

        if let Some(prompt) = run.pending_choice() {
            if !config.autopick {
                break StopReason::AwaitingChoice;
            }
            let pick = prompt
                .options
                .first()
                .map(|id| id.as_str())
                .context("Prompt offered no buffs")?;
            run.select_buff(pick)
                .with_context(|| format!("Failed to take offered buff {pick}"))?;
            continue;
        }

        for command in pilot.decide(&run) {
            run.command(command);
        }
        run.tick(dt);
    };

    let stats = run.stats().clone();
    info!(
        ?stop,
        wave = stats.highest_wave,
        kills = stats.total_kills,
        level = stats.level,
        "Headless run finished"
    );

    let buffs = run
        .buffs()
        .active()
        .iter()
        .map(|held| (held.id.as_str().to_owned(), held.stacks))
        .collect();

    Ok(HeadlessReport {
        stop,
        stats,
        events: log,
        buffs,
        attacks: run.attacks().infos(),
    })
}
