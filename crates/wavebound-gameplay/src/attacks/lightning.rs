//! Chain lightning, resolved synchronously at cast time.

use ahash::AHashSet;
use glam::Vec2;

use super::{AttackBehavior, AttackBuff, AttackCore, CombatServices, Striker};
use crate::spatial::{nearest_enemy, EnemyQuery, EnemyWorld};

/// Hop radius.
pub const CHAIN_RANGE: f32 = 150.0;
/// Extra hops after the first strike.
pub const CHAIN_COUNT: u32 = 3;
/// Damage factor per hop.
pub const CHAIN_DECAY: f32 = 0.8;

/// Lightning payload.
#[derive(Debug, Clone)]
pub struct LightningAttack {
    chain_range: f32,
    chain_count: u32,
    decay: f32,
    last_path: Vec<Vec2>,
}

impl Default for LightningAttack {
    fn default() -> Self {
        Self::new()
    }
}

impl LightningAttack {
    /// Three hops, 0.8 decay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chain_range: CHAIN_RANGE,
            chain_count: CHAIN_COUNT,
            decay: CHAIN_DECAY,
            last_path: Vec::new(),
        }
    }

    /// Hop radius.
    #[must_use]
    pub const fn chain_range(&self) -> f32 {
        self.chain_range
    }

    /// Extra hops.
    #[must_use]
    pub const fn chain_count(&self) -> u32 {
        self.chain_count
    }

    /// Damage factor per hop.
    #[must_use]
    pub const fn decay(&self) -> f32 {
        self.decay
    }

    /// Positions struck by the last cast, in order.
    #[must_use]
    pub fn last_path(&self) -> &[Vec2] {
        &self.last_path
    }
}

impl AttackBehavior for LightningAttack {
    fn execute(
        &mut self,
        core: &AttackCore,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) -> bool {
        let range = core.computed_range(striker.range_scale);
        let enemies = world.active_enemies();
        let Some(mut current) = nearest_enemy(&enemies, striker.position, range, |_| false) else {
            return false;
        };

        self.last_path.clear();
        let mut visited = AHashSet::new();
        let mut damage = striker.scaled_damage(core.computed_damage());
        let mut hop = 0;
        loop {
            visited.insert(current.handle);
            self.last_path.push(current.position);
            services.strike(world, striker, &current, damage, None);

            hop += 1;
            if hop > self.chain_count {
                break;
            }
            damage = damage * self.decay;
            if damage.floor() <= 0.0 {
                break;
            }
            let remaining = world.active_enemies();
            let Some(next) = nearest_enemy(&remaining, current.position, self.chain_range, |h| {
                visited.contains(&h)
            }) else {
                break;
            };
            current = next;
        }
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
            AttackBuff::ChainCount(n) => self.chain_count += n,
            AttackBuff::ChainRange(v) => self.chain_range *= 1.0 + v,
            AttackBuff::ChainDecay(v) => self.decay = (self.decay + v).min(1.0),
            _ => return false,
        }
        true
    }

    fn live_count(&self) -> usize {
        0
    }

    fn clear(&mut self) {
        self.last_path.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attacks::test_support::{neutral_striker, services, spawn_with_hp};
    use crate::attacks::{Archetype, Attack, AttackKind};
    use crate::spatial::EnemyPool;
    use crate::stats::StatModifiers;

    #[test]
    fn test_chain_decays_per_hop() {
        let mut world = EnemyPool::new(8);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        for x in [100.0, 200.0, 300.0, 400.0, 500.0] {
            spawn_with_hp(&mut world, Vec2::new(x, 0.0), 1000);
        }

        let mut attack = Attack::new(Archetype::Lightning, 0);
        assert!(attack.execute(&striker, &mut world, &mut services));
        // 12, then 9.6, 7.68, 6.144 with combo 1.0, 1.05, 1.10, 1.15
        assert_eq!(services.take_dealt(), vec![12, 10, 8, 7]);
        let AttackKind::Lightning(lightning) = attack.kind() else {
            panic!("wrong payload");
        };
        assert_eq!(lightning.last_path().len(), 4);
    }

    #[test]
    fn test_chain_stops_without_neighbour() {
        let mut world = EnemyPool::new(8);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        spawn_with_hp(&mut world, Vec2::new(100.0, 0.0), 1000);
        spawn_with_hp(&mut world, Vec2::new(400.0, 0.0), 1000);

        let mut attack = Attack::new(Archetype::Lightning, 0);
        attack.execute(&striker, &mut world, &mut services);
        assert_eq!(services.take_dealt().len(), 1);
    }

    #[test]
    fn test_no_target_costs_nothing() {
        let mut world = EnemyPool::new(2);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        let mut attack = Attack::new(Archetype::Lightning, 0);
        assert!(!attack.execute(&striker, &mut world, &mut services));
        assert!(attack.can_fire());
    }

    #[test]
    fn test_decay_capped_at_one() {
        let mut lightning = LightningAttack::new();
        lightning.apply_buff(AttackBuff::ChainDecay(0.5));
        assert!((lightning.decay() - 1.0).abs() < f32::EPSILON);
    }
}
