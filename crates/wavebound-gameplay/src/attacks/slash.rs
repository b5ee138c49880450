//! Instant melee arc.

use std::f32::consts::PI;

use wavebound_common::{angle_between, direction, wrap_angle};

use super::{
    AttackBehavior, AttackBuff, AttackCore, CombatServices, Striker, MAX_SLASH_ARC,
};
use crate::spatial::{EnemyQuery, EnemyWorld};

/// Starting arc.
pub const DEFAULT_ARC: f32 = PI / 2.0;

/// Sweep a cone in front of the striker and hit every enemy inside it.
///
/// The hit point sits `size + range / 2` ahead of the striker. An enemy is
/// inside when it is within `range + size` of that point and its bearing is
/// within half the arc of the facing. Knockback pushes away from the
/// striker. Returns the number of enemies hit.
pub fn sweep(
    striker: &Striker<'_>,
    world: &mut dyn EnemyWorld,
    services: &mut CombatServices,
    range: f32,
    arc: f32,
    base: f32,
) -> usize {
    let point = striker.position + direction(striker.facing) * (striker.size + range * 0.5);
    let half_arc = arc * 0.5;
    let mut hit = 0;
    for enemy in world.active_enemies() {
        if point.distance(enemy.position) > range + enemy.size {
            continue;
        }
        let bearing = angle_between(striker.position, enemy.position);
        if wrap_angle(bearing - striker.facing).abs() > half_arc {
            continue;
        }
        if services
            .strike(world, striker, &enemy, base, Some(striker.position))
            .is_some()
        {
            hit += 1;
        }
    }
    hit
}

/// Slash payload.
#[derive(Debug, Clone)]
pub struct SlashAttack {
    arc: f32,
}

impl Default for SlashAttack {
    fn default() -> Self {
        Self::new()
    }
}

impl SlashAttack {
    /// Quarter-turn arc.
    #[must_use]
    pub const fn new() -> Self {
        Self { arc: DEFAULT_ARC }
    }

    /// Current arc (radians).
    #[must_use]
    pub const fn arc(&self) -> f32 {
        self.arc
    }
}

impl AttackBehavior for SlashAttack {
    fn execute(
        &mut self,
        core: &AttackCore,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) -> bool {
        let range = core.computed_range(striker.range_scale);
        let damage = striker.scaled_damage(core.computed_damage());
        sweep(striker, world, services, range, self.arc, damage);
        true
    }

    fn update(
        &mut self,
        _dt: f32,
        _core: &AttackCore,
        _striker: &Striker<'_>,
        _world: &mut dyn EnemyWorld,
        _services: &mut CombatServices,
    ) {
    }

    fn apply_buff(&mut self, buff: AttackBuff) -> bool {
        match buff {
            AttackBuff::Arc(v) => {
                self.arc = (self.arc + v).min(MAX_SLASH_ARC);
                true
            }
            _ => false,
        }
    }

    fn live_count(&self) -> usize {
        0
    }

    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attacks::test_support::{neutral_striker, services, spawn_with_hp};
    use crate::attacks::{Archetype, Attack};
    use crate::stats::StatModifiers;
    use crate::spatial::EnemyPool;
    use glam::Vec2;

    #[test]
    fn test_hits_only_inside_cone() {
        let mut world = EnemyPool::new(8);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::new(500.0, 500.0), 0.0, &mods);
        let front = spawn_with_hp(&mut world, Vec2::new(560.0, 500.0), 100);
        let back = spawn_with_hp(&mut world, Vec2::new(440.0, 500.0), 100);
        let far = spawn_with_hp(&mut world, Vec2::new(800.0, 500.0), 100);

        let hit = sweep(&striker, &mut world, &mut services, 80.0, DEFAULT_ARC, 15.0);
        assert_eq!(hit, 1);
        assert_eq!(world.snapshot(front).unwrap().hp, 85);
        assert_eq!(world.snapshot(back).unwrap().hp, 100);
        assert_eq!(world.snapshot(far).unwrap().hp, 100);
    }

    #[test]
    fn test_fires_with_no_enemies() {
        let mut world = EnemyPool::new(4);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        let mut attack = Attack::new(Archetype::Slash, 0);

        assert!(attack.execute(&striker, &mut world, &mut services));
        assert!(!attack.can_fire());
        assert_eq!(attack.live_count(), 0);
    }

    #[test]
    fn test_arc_capped() {
        let mut slash = SlashAttack::new();
        for _ in 0..20 {
            slash.apply_buff(AttackBuff::Arc(PI / 6.0));
        }
        assert!((slash.arc() - MAX_SLASH_ARC).abs() < 1e-6);
        assert!(!slash.apply_buff(AttackBuff::Pierce(1)));
    }
}
