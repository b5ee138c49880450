//! Homing orbs.
//!
//! Orbs need a target in range to launch. In flight they home on their
//! target and pick the nearest enemy they have not hit yet once it dies or
//! has been hit. With nothing left to chase they keep flying straight until
//! they leave their range.

use glam::Vec2;
use wavebound_common::{angle_between, direction};

use super::{
    AttackBehavior, AttackBuff, AttackCore, CombatServices, Launch, Pierce, ProjectileSet,
    Striker,
};
use crate::spatial::{nearest_enemy, EnemyQuery, EnemySnapshot, EnemyWorld};

/// Orb flight speed.
pub const ORB_SPEED: f32 = 250.0;
/// Orb collision radius.
pub const ORB_RADIUS: f32 = 10.0;
/// Launch angle between sibling orbs.
const SIBLING_SPREAD: f32 = 0.2;

/// Orb payload.
#[derive(Debug, Clone)]
pub struct OrbAttack {
    speed: f32,
    orb_count: u32,
    pierce: u32,
    orbs: ProjectileSet,
}

impl OrbAttack {
    /// One orb per cast.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            speed: ORB_SPEED,
            orb_count: 1,
            pierce: 0,
            orbs: ProjectileSet::new(capacity),
        }
    }

    /// Orbs per cast.
    #[must_use]
    pub const fn orb_count(&self) -> u32 {
        self.orb_count
    }

    /// Flight speed.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Orbs in flight.
    #[must_use]
    pub const fn orbs(&self) -> &ProjectileSet {
        &self.orbs
    }

    fn steer_all(&mut self, enemies: &[EnemySnapshot]) {
        let speed = self.speed;
        self.orbs.steer(|orb| {
            let live_target = orb
                .target
                .filter(|handle| !orb.has_hit(*handle))
                .and_then(|handle| enemies.iter().find(|e| e.handle == handle));
            let target = match live_target {
                Some(target) => Some(*target),
                None => nearest_enemy(enemies, orb.position, f32::INFINITY, |h| orb.has_hit(h)),
            };
            orb.target = target.map(|t| t.handle);
            match target {
                Some(target) => {
                    let to = target.position - orb.position;
                    if to.length_squared() > f32::EPSILON {
                        orb.velocity = to.normalize() * speed;
                    }
                }
                None if orb.velocity == Vec2::ZERO => orb.velocity = Vec2::new(speed, 0.0),
                None => {}
            }
        });
    }
}

impl AttackBehavior for OrbAttack {
    fn execute(
        &mut self,
        core: &AttackCore,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        _services: &mut CombatServices,
    ) -> bool {
        let range = core.computed_range(striker.range_scale);
        let enemies = world.active_enemies();
        let Some(target) = nearest_enemy(&enemies, striker.position, range, |_| false) else {
            return false;
        };

        let damage = striker.scaled_damage(core.computed_damage());
        let aim = angle_between(striker.position, target.position);
        let middle = (self.orb_count - 1) as f32 / 2.0;
        for i in 0..self.orb_count {
            let angle = aim + (i as f32 - middle) * SIBLING_SPREAD;
            self.orbs.spawn(&Launch {
                origin: striker.position,
                velocity: direction(angle) * self.speed,
                radius: ORB_RADIUS,
                damage,
                pierce: Pierce::Limited(self.pierce),
                max_range: range,
                target: Some(target.handle),
            });
        }
        true
    }

    fn update(
        &mut self,
        dt: f32,
        _core: &AttackCore,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) {
        if self.orbs.is_empty() {
            return;
        }
        let enemies = world.active_enemies();
        self.steer_all(&enemies);
        self.orbs.advance(dt);
        self.orbs.resolve_hits(striker, world, services);
    }

    fn apply_buff(&mut self, buff: AttackBuff) -> bool {
        match buff {
            AttackBuff::OrbCount(n) => self.orb_count += n,
            AttackBuff::Pierce(n) => self.pierce += n,
            AttackBuff::TrackingSpeed(v) => self.speed *= 1.0 + v,
            _ => return false,
        }
        true
    }

    fn live_count(&self) -> usize {
        self.orbs.len()
    }

    fn clear(&mut self) {
        self.orbs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attacks::test_support::{neutral_striker, services, spawn_with_hp};
    use crate::attacks::{Archetype, Attack};
    use crate::spatial::EnemyPool;
    use crate::stats::StatModifiers;

    #[test]
    fn test_no_target_is_silent_no_op() {
        let mut world = EnemyPool::new(4);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        spawn_with_hp(&mut world, Vec2::new(1000.0, 0.0), 10);

        let mut attack = Attack::new(Archetype::Orb, 8);
        assert!(!attack.execute(&striker, &mut world, &mut services));
        assert!(attack.can_fire());
        assert_eq!(attack.live_count(), 0);
    }

    #[test]
    fn test_homes_onto_off_axis_target() {
        let mut world = EnemyPool::new(4);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        let target = spawn_with_hp(&mut world, Vec2::new(100.0, 100.0), 8);

        let mut attack = Attack::new(Archetype::Orb, 8);
        assert!(attack.execute(&striker, &mut world, &mut services));
        for _ in 0..60 {
            attack.update(1.0 / 60.0, &striker, &mut world, &mut services);
        }
        assert!(world.snapshot(target).is_none());
        assert_eq!(attack.live_count(), 0);
    }

    #[test]
    fn test_retargets_after_kill() {
        let mut orb = OrbAttack::new(4);
        orb.apply_buff(AttackBuff::Pierce(1));
        let mut world = EnemyPool::new(4);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        let first = spawn_with_hp(&mut world, Vec2::new(60.0, 0.0), 5);
        let second = spawn_with_hp(&mut world, Vec2::new(60.0, 120.0), 5);

        let core = AttackCore::new(Archetype::Orb, Archetype::Orb.tuning());
        assert!(orb.execute(&core, &striker, &mut world, &mut services));
        for _ in 0..90 {
            orb.update(1.0 / 60.0, &core, &striker, &mut world, &mut services);
        }
        assert!(world.snapshot(first).is_none());
        assert!(world.snapshot(second).is_none());
        assert_eq!(services.take_kills().len(), 2);
    }

    #[test]
    fn test_straight_flight_without_targets() {
        let mut orb = OrbAttack::new(2);
        orb.orbs.spawn(&Launch {
            origin: Vec2::ZERO,
            velocity: Vec2::ZERO,
            radius: ORB_RADIUS,
            damage: 1.0,
            pierce: Pierce::Limited(0),
            max_range: 500.0,
            target: None,
        });
        orb.steer_all(&[]);
        let flying = orb.orbs().iter().next().unwrap();
        assert_eq!(flying.velocity, Vec2::new(ORB_SPEED, 0.0));
    }
}
