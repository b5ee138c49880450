//! Orbiting minions that shoot bolts at nearby enemies.

use std::f32::consts::TAU;

use glam::Vec2;
use wavebound_common::direction;

use super::{
    AttackBehavior, AttackBuff, AttackCore, CombatServices, Launch, Pierce, ProjectileSet,
    Striker,
};
use crate::pool::{Pool, Poolable};
use crate::spatial::{nearest_enemy, EnemyQuery, EnemyWorld};

/// Minion lifetime.
pub const SUMMON_DURATION: f32 = 6.0;
/// Seconds between minion shots.
pub const SUMMON_INTERVAL: f32 = 1.0;
/// Shortest shot interval.
pub const MIN_SUMMON_INTERVAL: f32 = 0.2;
/// Orbit radius around the owner.
pub const ORBIT_RADIUS: f32 = 60.0;
/// Follow speed.
pub const FOLLOW_SPEED: f32 = 150.0;
/// Bolt speed.
pub const BOLT_SPEED: f32 = 400.0;
/// Bolt collision radius.
pub const BOLT_RADIUS: f32 = 5.0;

const SPAWN_DISTANCE: f32 = 50.0;
const ARRIVE_DISTANCE: f32 = 5.0;

/// One minion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Minion {
    /// Position
    pub position: Vec2,
    /// Lifetime left
    pub remaining: f32,
    /// Time until the next shot
    pub attack_timer: f32,
}

impl Poolable for Minion {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn is_reset(&self) -> bool {
        *self == Self::default()
    }
}

/// Summon payload.
#[derive(Debug, Clone)]
pub struct SummonAttack {
    summon_count: u32,
    duration_bonus: f32,
    attack_speed_bonus: f32,
    clock: f32,
    minions: Pool<Minion>,
    bolts: ProjectileSet,
}

impl SummonAttack {
    /// One minion per cast.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            summon_count: 1,
            duration_bonus: 0.0,
            attack_speed_bonus: 0.0,
            clock: 0.0,
            minions: Pool::new(capacity),
            bolts: ProjectileSet::new(capacity),
        }
    }

    /// Minions per cast.
    #[must_use]
    pub const fn summon_count(&self) -> u32 {
        self.summon_count
    }

    /// Minion lifetime with bonuses.
    #[must_use]
    pub fn duration(&self) -> f32 {
        SUMMON_DURATION * (1.0 + self.duration_bonus)
    }

    /// Shot interval with bonuses.
    #[must_use]
    pub fn interval(&self) -> f32 {
        (SUMMON_INTERVAL / (1.0 + self.attack_speed_bonus)).max(MIN_SUMMON_INTERVAL)
    }

    /// Live minions.
    pub fn minions(&self) -> impl Iterator<Item = &Minion> {
        self.minions.iter().map(|(_, m)| m)
    }

    /// Bolts in flight.
    #[must_use]
    pub const fn bolts(&self) -> &ProjectileSet {
        &self.bolts
    }

    fn move_minions(&mut self, dt: f32, owner: Vec2) {
        let count = self.minions.len().max(1) as f32;
        let clock = self.clock;
        for (index, (_, minion)) in self.minions.iter_mut().enumerate() {
            let angle = clock + index as f32 * TAU / count;
            let slot = owner + direction(angle) * ORBIT_RADIUS;
            let to = slot - minion.position;
            let distance = to.length();
            if distance > ARRIVE_DISTANCE {
                let step = (FOLLOW_SPEED * dt).min(distance);
                minion.position += to / distance * step;
            }
        }
    }
}

impl AttackBehavior for SummonAttack {
    fn execute(
        &mut self,
        _core: &AttackCore,
        striker: &Striker<'_>,
        _world: &mut dyn EnemyWorld,
        _services: &mut CombatServices,
    ) -> bool {
        let duration = self.duration();
        for i in 0..self.summon_count {
            let angle = i as f32 / self.summon_count as f32 * TAU;
            let Some((_, minion)) = self.minions.acquire() else {
                break;
            };
            minion.position = striker.position + direction(angle) * SPAWN_DISTANCE;
            minion.remaining = duration;
            minion.attack_timer = 0.0;
        }
        true
    }

    fn update(
        &mut self,
        dt: f32,
        core: &AttackCore,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) {
        self.clock += dt;

        let mut expired = Vec::new();
        for (key, minion) in self.minions.iter_mut() {
            minion.remaining -= dt;
            if minion.remaining <= 0.0 {
                expired.push(key);
            }
        }
        for key in expired {
            self.minions.release(key);
        }

        self.move_minions(dt, striker.position);

        if !self.minions.is_empty() {
            let range = core.computed_range(striker.range_scale);
            let damage = striker.scaled_damage(core.computed_damage());
            let interval = self.interval();
            let enemies = world.active_enemies();
            let mut shots = Vec::new();
            for (_, minion) in self.minions.iter_mut() {
                minion.attack_timer -= dt;
                if minion.attack_timer > 0.0 {
                    continue;
                }
                let Some(target) = nearest_enemy(&enemies, minion.position, range, |_| false)
                else {
                    continue;
                };
                minion.attack_timer = interval;
                let to = target.position - minion.position;
                if to.length_squared() > f32::EPSILON {
                    shots.push((minion.position, to.normalize() * BOLT_SPEED));
                }
            }
            for (origin, velocity) in shots {
                self.bolts.spawn(&Launch {
                    origin,
                    velocity,
                    radius: BOLT_RADIUS,
                    damage,
                    pierce: Pierce::Limited(0),
                    max_range: range,
                    target: None,
                });
            }
        }

        self.bolts.advance(dt);
        self.bolts.resolve_hits(striker, world, services);
    }

    fn apply_buff(&mut self, buff: AttackBuff) -> bool {
        match buff {
            AttackBuff::SummonCount(n) => self.summon_count += n,
            AttackBuff::SummonDuration(v) => self.duration_bonus += v,
            AttackBuff::SummonAttackSpeed(v) => self.attack_speed_bonus += v,
            _ => return false,
        }
        true
    }

    fn live_count(&self) -> usize {
        self.minions.len() + self.bolts.len()
    }

    fn clear(&mut self) {
        self.minions.clear();
        self.bolts.clear();
    }
}
