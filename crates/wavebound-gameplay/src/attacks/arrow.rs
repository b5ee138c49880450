//! Straight-flying arrows with multishot spread and pierce.

use std::f32::consts::PI;

use wavebound_common::direction;

use super::{
    AttackBehavior, AttackBuff, AttackCore, CombatServices, Launch, Pierce, ProjectileSet,
    Striker,
};
use crate::spatial::EnemyWorld;

/// Arrow flight speed.
pub const ARROW_SPEED: f32 = 500.0;
/// Arrow collision radius.
pub const ARROW_RADIUS: f32 = 6.0;
/// Spread added per extra arrow.
pub const SPREAD_PER_ARROW: f32 = PI / 6.0;

/// Arrow payload.
#[derive(Debug, Clone)]
pub struct ArrowAttack {
    speed: f32,
    pierce: u32,
    multishot: u32,
    spread: f32,
    arrows: ProjectileSet,
}

impl ArrowAttack {
    /// Single arrow, no pierce.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            speed: ARROW_SPEED,
            pierce: 0,
            multishot: 1,
            spread: 0.0,
            arrows: ProjectileSet::new(capacity),
        }
    }

    /// Arrow speed.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Arrows per volley.
    #[must_use]
    pub const fn multishot(&self) -> u32 {
        self.multishot
    }

    /// Extra enemies each arrow passes through.
    #[must_use]
    pub const fn pierce(&self) -> u32 {
        self.pierce
    }

    /// Total spread of a volley.
    #[must_use]
    pub const fn spread(&self) -> f32 {
        self.spread
    }

    /// Arrows in flight.
    #[must_use]
    pub const fn arrows(&self) -> &ProjectileSet {
        &self.arrows
    }

    fn volley_angles(&self, facing: f32) -> Vec<f32> {
        if self.multishot <= 1 {
            return vec![facing];
        }
        let step = self.spread / (self.multishot - 1) as f32;
        (0..self.multishot)
            .map(|i| facing - self.spread / 2.0 + step * i as f32)
            .collect()
    }
}

impl AttackBehavior for ArrowAttack {
    fn execute(
        &mut self,
        core: &AttackCore,
        striker: &Striker<'_>,
        _world: &mut dyn EnemyWorld,
        _services: &mut CombatServices,
    ) -> bool {
        let damage = striker.scaled_damage(core.computed_damage());
        let max_range = core.computed_range(striker.range_scale);
        for angle in self.volley_angles(striker.facing) {
            self.arrows.spawn(&Launch {
                origin: striker.position,
                velocity: direction(angle) * self.speed,
                radius: ARROW_RADIUS,
                damage,
                pierce: Pierce::Limited(self.pierce),
                max_range,
                target: None,
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
        self.arrows.advance(dt);
        self.arrows.resolve_hits(striker, world, services);
    }

    fn apply_buff(&mut self, buff: AttackBuff) -> bool {
        match buff {
            AttackBuff::Multishot(n) => {
                self.multishot += n;
                self.spread = SPREAD_PER_ARROW * (self.multishot - 1) as f32;
            }
            AttackBuff::Pierce(n) => self.pierce += n,
            AttackBuff::ProjectileSpeed(v) => self.speed *= 1.0 + v,
            _ => return false,
        }
        true
    }

    fn live_count(&self) -> usize {
        self.arrows.len()
    }

    fn clear(&mut self) {
        self.arrows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attacks::test_support::{neutral_striker, services, spawn_with_hp};
    use crate::attacks::{Archetype, Attack, AttackKind};
    use crate::spatial::{EnemyPool, EnemyQuery};
    use crate::stats::StatModifiers;
    use glam::Vec2;

    #[test]
    fn test_multishot_spread() {
        let mut arrow = ArrowAttack::new(8);
        arrow.apply_buff(AttackBuff::Multishot(2));
        assert_eq!(arrow.multishot(), 3);
        assert!((arrow.spread() - PI / 3.0).abs() < 1e-6);

        let angles = arrow.volley_angles(0.0);
        assert_eq!(angles.len(), 3);
        assert!((angles[0] + PI / 6.0).abs() < 1e-6);
        assert!(angles[1].abs() < 1e-6);
        assert!((angles[2] - PI / 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_fires_without_targets() {
        let mut world = EnemyPool::new(4);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::splat(500.0), 0.0, &mods);
        let mut attack = Attack::new(Archetype::Arrow, 16);

        assert!(attack.execute(&striker, &mut world, &mut services));
        assert_eq!(attack.live_count(), 1);
        assert!(!attack.can_fire());
    }

    #[test]
    fn test_volley_kills_target_ahead() {
        let mut world = EnemyPool::new(4);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        let ahead = spawn_with_hp(&mut world, Vec2::new(120.0, 0.0), 10);
        let behind = spawn_with_hp(&mut world, Vec2::new(-120.0, 0.0), 10);

        let mut attack = Attack::new(Archetype::Arrow, 16);
        attack.execute(&striker, &mut world, &mut services);
        for _ in 0..30 {
            attack.update(1.0 / 60.0, &striker, &mut world, &mut services);
        }
        assert!(world.snapshot(ahead).is_none());
        assert!(world.snapshot(behind).is_some());
        assert_eq!(services.take_kills().len(), 1);
        assert!(matches!(attack.kind(), AttackKind::Arrow(a) if a.arrows().is_empty()));
    }
}
