//! Enemy roster and behavior state machines.
//!
//! This module provides:
//! - Enemy kinds with base stats and difficulty scaling
//! - The pooled enemy record used by the built-in world
//! - Per-enemy AI ("brains") that turn the player position into steering
//!   and fire requests

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::pool::Poolable;
use crate::spatial::EnemySnapshot;

// ============================================================================
// Enemy Kinds
// ============================================================================

/// Enemy archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Basic chaser.
    #[default]
    Shadow,
    /// Fast charger.
    Wolf,
    /// Ranged kiter.
    Snake,
    /// Splits on death.
    Wraith,
    /// Tough lunging chaser.
    Elite,
    /// Wave boss.
    Boss,
}

impl EnemyKind {
    /// Behavior tag driving this kind's AI.
    #[must_use]
    pub const fn behavior(self) -> Behavior {
        match self {
            Self::Shadow => Behavior::Chase,
            Self::Wolf => Behavior::Charge,
            Self::Snake => Behavior::Ranged,
            Self::Wraith => Behavior::Split,
            Self::Elite => Behavior::Elite,
            Self::Boss => Behavior::Boss,
        }
    }

    /// Check if this is a boss.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(self, Self::Boss)
    }

    /// Check if this is an elite.
    #[must_use]
    pub const fn is_elite(self) -> bool {
        matches!(self, Self::Elite)
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::Wolf => "wolf",
            Self::Snake => "snake",
            Self::Wraith => "wraith",
            Self::Elite => "elite",
            Self::Boss => "boss",
        }
    }
}

/// AI behavior tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behavior {
    /// Walk straight at the player.
    Chase,
    /// Approach, wind up, lunge, recover.
    Charge,
    /// Keep distance and fire bolts.
    Ranged,
    /// Chase; splits into two on death.
    Split,
    /// Chase with periodic lunges.
    Elite,
    /// Chase with periodic radial volleys.
    Boss,
}

// ============================================================================
// Type Configs and Scaling
// ============================================================================

/// Wave difficulty multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    /// HP multiplier
    pub hp: f32,
    /// Attack multiplier
    pub atk: f32,
    /// Speed multiplier
    pub speed: f32,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            hp: 1.0,
            atk: 1.0,
            speed: 1.0,
        }
    }
}

/// Stats an enemy is spawned with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyTypeConfig {
    /// Archetype
    pub kind: EnemyKind,
    /// Max HP
    pub hp: i32,
    /// Contact and bolt damage
    pub atk: i32,
    /// Movement speed
    pub speed: f32,
    /// Collision radius
    pub size: f32,
    /// Spawned by a split (does not split again)
    pub split_child: bool,
}

impl EnemyTypeConfig {
    /// Unscaled stats for a kind.
    #[must_use]
    pub const fn base(kind: EnemyKind) -> Self {
        let (hp, atk, speed, size) = match kind {
            EnemyKind::Shadow => (30, 10, 80.0, 18.0),
            EnemyKind::Wolf => (25, 12, 140.0, 16.0),
            EnemyKind::Snake => (20, 8, 60.0, 14.0),
            EnemyKind::Wraith => (40, 10, 70.0, 20.0),
            EnemyKind::Elite => (150, 20, 90.0, 28.0),
            EnemyKind::Boss => (800, 30, 60.0, 48.0),
        };
        Self {
            kind,
            hp,
            atk,
            speed,
            size,
            split_child: false,
        }
    }

    /// Stats scaled by a difficulty (each value floored).
    #[must_use]
    pub fn scaled(mut self, difficulty: &Difficulty) -> Self {
        self.hp = (scale_floor(self.hp as f32, difficulty.hp) as i32).max(1);
        self.atk = scale_floor(self.atk as f32, difficulty.atk) as i32;
        self.speed = scale_floor(self.speed, difficulty.speed) as f32;
        self
    }

    /// Half-HP shadow spawned when a splitter dies.
    #[must_use]
    pub fn split_child(parent: &EnemySnapshot) -> Self {
        let mut child = Self::base(EnemyKind::Shadow);
        child.hp = (parent.max_hp / 2).max(1);
        child.atk = parent.atk;
        child.split_child = true;
        child
    }
}

fn scale_floor(value: f32, multiplier: f32) -> f64 {
    (f64::from(value) * f64::from(multiplier) + 1e-6).floor()
}

// ============================================================================
// Pooled Enemy Record
// ============================================================================

/// Live enemy state held by the built-in world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enemy {
    /// Archetype
    pub kind: EnemyKind,
    /// Position
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Current HP
    pub hp: i32,
    /// Max HP
    pub max_hp: i32,
    /// Attack
    pub atk: i32,
    /// Movement speed
    pub speed: f32,
    /// Collision radius
    pub size: f32,
    /// Spawned by a split
    pub split_child: bool,
}

impl Enemy {
    /// Initialize a pristine record from a type config.
    pub fn spawn(&mut self, position: Vec2, config: &EnemyTypeConfig) {
        self.kind = config.kind;
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.hp = config.hp;
        self.max_hp = config.hp;
        self.atk = config.atk;
        self.speed = config.speed;
        self.size = config.size;
        self.split_child = config.split_child;
    }
}

impl Poolable for Enemy {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn is_reset(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// AI
// ============================================================================

/// Charge: start winding up inside this distance.
pub const CHARGE_TRIGGER_RANGE: f32 = 250.0;
/// Charge: wind-up time.
pub const CHARGE_WINDUP: f32 = 0.5;
/// Charge: lunge time.
pub const CHARGE_LUNGE: f32 = 0.4;
/// Charge: recovery time.
pub const CHARGE_RECOVER: f32 = 0.6;
/// Charge: lunge speed multiplier.
pub const CHARGE_SPEED_MULTIPLIER: f32 = 3.0;
/// Ranged: preferred minimum distance.
pub const RANGED_MIN_DISTANCE: f32 = 200.0;
/// Ranged: preferred maximum distance.
pub const RANGED_MAX_DISTANCE: f32 = 300.0;
/// Ranged: maximum firing distance.
pub const RANGED_FIRE_RANGE: f32 = 400.0;
/// Ranged: seconds between bolts.
pub const RANGED_FIRE_INTERVAL: f32 = 2.0;
/// Elite: seconds between lunges.
pub const ELITE_LUNGE_INTERVAL: f32 = 4.0;
/// Boss: seconds between volleys.
pub const BOSS_VOLLEY_INTERVAL: f32 = 3.0;
/// Boss: bolts per volley.
pub const BOSS_VOLLEY_COUNT: u32 = 8;

/// Hostile shot requested by an enemy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostileShot {
    /// Spawn point
    pub origin: Vec2,
    /// Unit direction
    pub direction: Vec2,
    /// Damage on hit
    pub damage: i32,
}

/// Output of one AI step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Steering {
    /// Velocity to apply
    pub velocity: Vec2,
    /// Shots fired this step
    pub shots: Vec<HostileShot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Approach,
    Windup,
    Lunge,
    Recover,
}

/// Per-enemy AI state.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyBrain {
    behavior: Behavior,
    phase: Phase,
    phase_timer: f32,
    action_timer: f32,
    locked_direction: Vec2,
}

impl EnemyBrain {
    /// Fresh brain for a behavior.
    #[must_use]
    pub fn new(behavior: Behavior) -> Self {
        let action_timer = match behavior {
            Behavior::Ranged => RANGED_FIRE_INTERVAL,
            Behavior::Elite => ELITE_LUNGE_INTERVAL,
            Behavior::Boss => BOSS_VOLLEY_INTERVAL,
            _ => 0.0,
        };
        Self {
            behavior,
            phase: Phase::Approach,
            phase_timer: 0.0,
            action_timer,
            locked_direction: Vec2::ZERO,
        }
    }

    /// Behavior tag.
    #[must_use]
    pub const fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Check whether the enemy is mid-lunge.
    #[must_use]
    pub fn is_lunging(&self) -> bool {
        self.phase == Phase::Lunge
    }

    /// Advance the state machine and produce steering.
    pub fn think(&mut self, enemy: &EnemySnapshot, player: Vec2, dt: f32) -> Steering {
        let to_player = player - enemy.position;
        let distance = to_player.length();
        let toward = to_player.normalize_or_zero();
        let chase = toward * enemy.speed;

        match self.behavior {
            Behavior::Chase | Behavior::Split => Steering {
                velocity: chase,
                shots: Vec::new(),
            },
            Behavior::Charge => Steering {
                velocity: self.charge(toward, distance, enemy.speed, dt),
                shots: Vec::new(),
            },
            Behavior::Ranged => self.ranged(enemy, toward, distance, dt),
            Behavior::Elite => {
                if self.phase == Phase::Approach {
                    self.action_timer -= dt;
                    if self.action_timer <= 0.0 {
                        self.action_timer = ELITE_LUNGE_INTERVAL;
                        self.enter(Phase::Windup, CHARGE_WINDUP);
                    }
                    return Steering {
                        velocity: chase,
                        shots: Vec::new(),
                    };
                }
                Steering {
                    velocity: self.charge(toward, f32::INFINITY, enemy.speed, dt),
                    shots: Vec::new(),
                }
            }
            Behavior::Boss => {
                let mut shots = Vec::new();
                self.action_timer -= dt;
                if self.action_timer <= 0.0 {
                    self.action_timer = BOSS_VOLLEY_INTERVAL;
                    let base = toward.y.atan2(toward.x);
                    for i in 0..BOSS_VOLLEY_COUNT {
                        let angle = base + TAU * i as f32 / BOSS_VOLLEY_COUNT as f32;
                        shots.push(HostileShot {
                            origin: enemy.position,
                            direction: Vec2::new(angle.cos(), angle.sin()),
                            damage: enemy.atk,
                        });
                    }
                }
                Steering {
                    velocity: chase,
                    shots,
                }
            }
        }
    }

    fn enter(&mut self, phase: Phase, duration: f32) {
        self.phase = phase;
        self.phase_timer = duration;
    }

    fn charge(&mut self, toward: Vec2, distance: f32, speed: f32, dt: f32) -> Vec2 {
        self.phase_timer -= dt;
        match self.phase {
            Phase::Approach => {
                if distance <= CHARGE_TRIGGER_RANGE {
                    self.enter(Phase::Windup, CHARGE_WINDUP);
                    Vec2::ZERO
                } else {
                    toward * speed
                }
            }
            Phase::Windup => {
                if self.phase_timer <= 0.0 {
                    self.locked_direction = toward;
                    self.enter(Phase::Lunge, CHARGE_LUNGE);
                    self.locked_direction * speed * CHARGE_SPEED_MULTIPLIER
                } else {
                    Vec2::ZERO
                }
            }
            Phase::Lunge => {
                if self.phase_timer <= 0.0 {
                    self.enter(Phase::Recover, CHARGE_RECOVER);
                    Vec2::ZERO
                } else {
                    self.locked_direction * speed * CHARGE_SPEED_MULTIPLIER
                }
            }
            Phase::Recover => {
                if self.phase_timer <= 0.0 {
                    self.enter(Phase::Approach, 0.0);
                }
                Vec2::ZERO
            }
        }
    }

    fn ranged(&mut self, enemy: &EnemySnapshot, toward: Vec2, distance: f32, dt: f32) -> Steering {
        let velocity = if distance > RANGED_MAX_DISTANCE {
            toward * enemy.speed
        } else if distance < RANGED_MIN_DISTANCE {
            -toward * enemy.speed
        } else {
            Vec2::ZERO
        };

        let mut shots = Vec::new();
        self.action_timer -= dt;
        if self.action_timer <= 0.0 && distance <= RANGED_FIRE_RANGE && toward != Vec2::ZERO {
            self.action_timer = RANGED_FIRE_INTERVAL;
            shots.push(HostileShot {
                origin: enemy.position,
                direction: toward,
                damage: enemy.atk,
            });
        }
        self.action_timer = self.action_timer.max(0.0);
        Steering { velocity, shots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavebound_common::EnemyHandle;

    fn snapshot(kind: EnemyKind, position: Vec2) -> EnemySnapshot {
        let config = EnemyTypeConfig::base(kind);
        EnemySnapshot {
            handle: EnemyHandle::new(0, 0),
            kind,
            position,
            velocity: Vec2::ZERO,
            hp: config.hp,
            max_hp: config.hp,
            atk: config.atk,
            speed: config.speed,
            size: config.size,
            split_child: false,
        }
    }

    #[test]
    fn test_scaling_floors() {
        let difficulty = Difficulty {
            hp: 1.55,
            atk: 1.4,
            speed: 1.1,
        };
        let config = EnemyTypeConfig::base(EnemyKind::Shadow).scaled(&difficulty);
        // 30 * 1.55 = 46.5, 10 * 1.4 = 14, 80 * 1.1 = 88
        assert_eq!(config.hp, 46);
        assert_eq!(config.atk, 14);
        assert!((config.speed - 88.0).abs() < 1e-4);
    }

    #[test]
    fn test_chase_heads_to_player() {
        let mut brain = EnemyBrain::new(Behavior::Chase);
        let steer = brain.think(
            &snapshot(EnemyKind::Shadow, Vec2::ZERO),
            Vec2::new(100.0, 0.0),
            0.016,
        );
        assert!((steer.velocity - Vec2::new(80.0, 0.0)).length() < 1e-3);
        assert!(steer.shots.is_empty());
    }

    #[test]
    fn test_charge_cycle() {
        let mut brain = EnemyBrain::new(Behavior::Charge);
        let wolf = snapshot(EnemyKind::Wolf, Vec2::ZERO);
        let player = Vec2::new(200.0, 0.0);

        // In range: stop and wind up
        assert_eq!(brain.think(&wolf, player, 0.1).velocity, Vec2::ZERO);
        // Wind-up runs out: lunge at 3x speed
        let lunge = brain.think(&wolf, player, 0.5).velocity;
        assert!((lunge.x - 420.0).abs() < 1e-3);
        assert!(brain.is_lunging());
        // Lunge ends, recovery
        assert_eq!(brain.think(&wolf, player, 0.5).velocity, Vec2::ZERO);
        assert!(!brain.is_lunging());
    }

    #[test]
    fn test_ranged_keeps_distance_and_fires() {
        let mut brain = EnemyBrain::new(Behavior::Ranged);
        let snake = snapshot(EnemyKind::Snake, Vec2::ZERO);

        let close = brain.think(&snake, Vec2::new(100.0, 0.0), 0.1);
        assert!(close.velocity.x < 0.0);

        let steer = brain.think(&snake, Vec2::new(250.0, 0.0), 2.0);
        assert_eq!(steer.velocity, Vec2::ZERO);
        assert_eq!(steer.shots.len(), 1);
        assert_eq!(steer.shots[0].damage, 8);
    }

    #[test]
    fn test_boss_volley() {
        let mut brain = EnemyBrain::new(Behavior::Boss);
        let boss = snapshot(EnemyKind::Boss, Vec2::ZERO);
        assert!(brain.think(&boss, Vec2::X * 500.0, 1.0).shots.is_empty());
        let volley = brain.think(&boss, Vec2::X * 500.0, 2.0).shots;
        assert_eq!(volley.len(), BOSS_VOLLEY_COUNT as usize);
    }

    #[test]
    fn test_split_child_halves_hp() {
        let mut parent = snapshot(EnemyKind::Wraith, Vec2::ZERO);
        parent.max_hp = 45;
        let child = EnemyTypeConfig::split_child(&parent);
        assert_eq!(child.kind, EnemyKind::Shadow);
        assert_eq!(child.hp, 22);
        assert!(child.split_child);
    }

    #[test]
    fn test_enemy_reset_is_pristine() {
        let mut enemy = Enemy::default();
        enemy.spawn(Vec2::ONE, &EnemyTypeConfig::base(EnemyKind::Boss));
        assert!(!enemy.is_reset());
        enemy.reset();
        assert!(enemy.is_reset());
    }
}
