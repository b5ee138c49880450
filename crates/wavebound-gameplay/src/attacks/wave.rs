//! Piercing waves. Never removed by hits, only by range.

use wavebound_common::direction;

use super::{
    AttackBehavior, AttackBuff, AttackCore, CombatServices, Launch, Pierce, ProjectileSet,
    Striker,
};
use crate::spatial::EnemyWorld;

/// Wave travel speed.
pub const WAVE_SPEED: f32 = 300.0;
/// Wave width.
pub const WAVE_WIDTH: f32 = 60.0;
/// Angle between sibling waves.
const SIBLING_OFFSET: f32 = 0.2;

/// Wave payload.
#[derive(Debug, Clone)]
pub struct WaveAttack {
    speed: f32,
    width: f32,
    wave_count: u32,
    waves: ProjectileSet,
}

impl WaveAttack {
    /// One wave per cast.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            speed: WAVE_SPEED,
            width: WAVE_WIDTH,
            wave_count: 1,
            waves: ProjectileSet::new(capacity),
        }
    }

    /// Current width.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Waves per cast.
    #[must_use]
    pub const fn wave_count(&self) -> u32 {
        self.wave_count
    }
}

impl AttackBehavior for WaveAttack {
    fn execute(
        &mut self,
        core: &AttackCore,
        striker: &Striker<'_>,
        _world: &mut dyn EnemyWorld,
        _services: &mut CombatServices,
    ) -> bool {
        let damage = striker.scaled_damage(core.computed_damage());
        let max_range = core.computed_range(striker.range_scale);
        let middle = (self.wave_count - 1) as f32 / 2.0;
        for i in 0..self.wave_count {
            let angle = striker.facing + (i as f32 - middle) * SIBLING_OFFSET;
            self.waves.spawn(&Launch {
                origin: striker.position,
                velocity: direction(angle) * self.speed,
                radius: self.width / 2.0,
                damage,
                pierce: Pierce::Unlimited,
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
        self.waves.advance(dt);
        self.waves.resolve_hits(striker, world, services);
    }

    fn apply_buff(&mut self, buff: AttackBuff) -> bool {
        match buff {
            AttackBuff::WaveCount(n) => self.wave_count += n,
            AttackBuff::Width(v) => self.width *= 1.0 + v,
            AttackBuff::ProjectileSpeed(v) => self.speed *= 1.0 + v,
            _ => return false,
        }
        true
    }

    fn live_count(&self) -> usize {
        self.waves.len()
    }

    fn clear(&mut self) {
        self.waves.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attacks::test_support::{neutral_striker, services, spawn_with_hp};
    use crate::attacks::{Archetype, Attack};
    use crate::spatial::{EnemyPool, EnemyQuery};
    use crate::stats::StatModifiers;
    use glam::Vec2;

    #[test]
    fn test_passes_through_every_enemy_in_line() {
        let mut world = EnemyPool::new(8);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        for x in [60.0, 120.0, 180.0, 240.0] {
            spawn_with_hp(&mut world, Vec2::new(x, 0.0), 1000);
        }

        let mut attack = Attack::new(Archetype::Wave, 4);
        attack.execute(&striker, &mut world, &mut services);
        for _ in 0..60 {
            attack.update(1.0 / 60.0, &striker, &mut world, &mut services);
        }
        let damaged = world
            .active_enemies()
            .iter()
            .filter(|e| e.hp < e.max_hp)
            .count();
        assert_eq!(damaged, 4);
        assert_eq!(services.take_dealt().len(), 4);
    }

    #[test]
    fn test_removed_only_by_range() {
        let mut world = EnemyPool::new(2);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        let mut attack = Attack::new(Archetype::Wave, 4);
        attack.execute(&striker, &mut world, &mut services);

        // 350 range at 300/s
        attack.update(1.0, &striker, &mut world, &mut services);
        assert_eq!(attack.live_count(), 1);
        attack.update(0.2, &striker, &mut world, &mut services);
        assert_eq!(attack.live_count(), 0);
    }

    #[test]
    fn test_width_buff_widens_radius() {
        let mut wave = WaveAttack::new(2);
        assert!(wave.apply_buff(AttackBuff::Width(0.3)));
        assert!((wave.width() - 78.0).abs() < 1e-4);
        assert!(wave.apply_buff(AttackBuff::WaveCount(1)));
        assert_eq!(wave.wave_count(), 2);
        assert!(!wave.apply_buff(AttackBuff::ChainCount(1)));
    }
}
