//! The equipped attack set.
//!
//! Besides the equipped archetypes the registry owns the character's own
//! basic attack (a 90° sweep on a short cooldown) and the hidden attacks
//! that on-cast procs fire.

use std::f32::consts::FRAC_PI_2;

use tracing::{debug, info};

use super::slash::sweep;
use super::{
    floor_i32, Archetype, Attack, AttackBuff, AttackInfo, AttackTuning, CombatServices,
    ProcAction, Striker,
};
use crate::character::BaseStats;
use crate::events::GameEvent;
use crate::spatial::EnemyWorld;
use crate::stats::Proc;

/// Basic attack cooldown.
pub const BASIC_ATTACK_COOLDOWN: f32 = 0.4;
/// Basic attack arc.
pub const BASIC_ATTACK_ARC: f32 = FRAC_PI_2;

/// Tuning of the homing sword fired by procs.
pub const HOMING_SWORD: AttackTuning = AttackTuning {
    damage: 15,
    cooldown: 0.1,
    range: 400.0,
};

/// Equipped attacks in equip order.
#[derive(Debug, Clone)]
pub struct AttackRegistry {
    attacks: Vec<Attack>,
    capacity: usize,
    base_attack: f32,
    base_range: f32,
    basic_remaining: f32,
    sword: Attack,
    extra_slash: Attack,
    procs: fastrand::Rng,
}

impl AttackRegistry {
    /// Empty registry. `capacity` caps each attack's projectile pool.
    #[must_use]
    pub fn new(capacity: usize, base: &BaseStats) -> Self {
        Self {
            attacks: Vec::new(),
            capacity,
            base_attack: base.attack,
            base_range: base.attack_range,
            basic_remaining: 0.0,
            sword: Attack::with_tuning(Archetype::Orb, HOMING_SWORD, capacity),
            extra_slash: Attack::new(Archetype::Slash, 0),
            procs: fastrand::Rng::with_seed(0),
        }
    }

    /// Use `rng` for on-cast proc rolls.
    #[must_use]
    pub fn with_proc_rng(mut self, rng: fastrand::Rng) -> Self {
        self.procs = rng;
        self
    }

    /// Equip an archetype, or upgrade it if already equipped.
    ///
    /// Returns the level after the call.
    pub fn equip(&mut self, archetype: Archetype) -> u32 {
        if let Some(attack) = self.get_mut(archetype) {
            attack.upgrade();
            let level = attack.core().level();
            info!(attack = %archetype, level, "Attack upgraded");
            return level;
        }
        self.attacks.push(Attack::new(archetype, self.capacity));
        info!(attack = %archetype, "Attack equipped");
        1
    }

    /// Check whether an archetype is equipped.
    #[must_use]
    pub fn has(&self, archetype: Archetype) -> bool {
        self.attacks.iter().any(|a| a.archetype() == archetype)
    }

    /// Equipped attack for an archetype.
    #[must_use]
    pub fn get(&self, archetype: Archetype) -> Option<&Attack> {
        self.attacks.iter().find(|a| a.archetype() == archetype)
    }

    /// Mutable equipped attack for an archetype.
    pub fn get_mut(&mut self, archetype: Archetype) -> Option<&mut Attack> {
        self.attacks.iter_mut().find(|a| a.archetype() == archetype)
    }

    /// Equipped archetypes in equip order.
    #[must_use]
    pub fn archetypes(&self) -> Vec<Archetype> {
        self.attacks.iter().map(Attack::archetype).collect()
    }

    /// Advance cooldowns and everything in flight.
    pub fn update(
        &mut self,
        dt: f32,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) {
        self.basic_remaining = (self.basic_remaining - dt).max(0.0);
        for attack in &mut self.attacks {
            attack.update(dt, striker, world, services);
        }
        self.sword.update(dt, striker, world, services);
        self.extra_slash.update(dt, striker, world, services);
    }

    /// Fire every ready attack. Returns how many fired.
    pub fn execute_all(
        &mut self,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) -> usize {
        let mut fired = 0;
        for attack in &mut self.attacks {
            if attack.execute(striker, world, services) {
                fired += 1;
            }
        }
        fired
    }

    /// Check whether the basic attack is off cooldown.
    #[must_use]
    pub fn basic_ready(&self) -> bool {
        self.basic_remaining <= 0.0
    }

    /// Cast the basic attack and roll on-cast procs.
    ///
    /// Returns the number of enemies hit by the sweep, or `None` while on
    /// cooldown.
    pub fn cast_basic(
        &mut self,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) -> Option<usize> {
        if !self.basic_ready() {
            return None;
        }
        self.basic_remaining = BASIC_ATTACK_COOLDOWN;

        let damage =
            floor_i32(f64::from(self.base_attack) * f64::from(striker.attack_scale)) as f32;
        let range = self.base_range * striker.range_scale;
        let hit = sweep(striker, world, services, range, BASIC_ATTACK_ARC, damage);

        let procs: Vec<Proc> = striker.modifiers.procs().to_vec();
        for proc_ in procs {
            if proc_.chance <= 0.0 || self.procs.f32() >= proc_.chance {
                continue;
            }
            let fired = match proc_.action {
                ProcAction::HomingSword => self.sword.fire(striker, world, services),
                ProcAction::ExtraSlash => self.extra_slash.fire(striker, world, services),
            };
            if fired {
                debug!(action = ?proc_.action, "Proc triggered");
                services.events.publish(GameEvent::ProcTriggered {
                    action: proc_.action,
                });
            }
        }
        Some(hit)
    }

    /// Apply a buff to one archetype. No-op returning false if unequipped.
    pub fn apply_buff_to(&mut self, archetype: Archetype, buff: AttackBuff) -> bool {
        self.get_mut(archetype)
            .is_some_and(|attack| attack.apply_buff(buff))
    }

    /// Apply a buff to every attack equipped right now. Returns how many
    /// accepted it.
    pub fn apply_buff_to_all(&mut self, buff: AttackBuff) -> usize {
        let mut accepted = 0;
        for attack in &mut self.attacks {
            if attack.apply_buff(buff) {
                accepted += 1;
            }
        }
        accepted
    }

    /// UI summaries in equip order.
    #[must_use]
    pub fn infos(&self) -> Vec<AttackInfo> {
        self.attacks.iter().map(Attack::info).collect()
    }

    /// Drop everything in flight, keeping the equipped set.
    pub fn clear(&mut self) {
        for attack in &mut self.attacks {
            attack.clear();
        }
        self.sword.clear();
        self.extra_slash.clear();
    }

    /// Equipped attack count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attacks.len()
    }

    /// Check whether nothing is equipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }

    /// Live projectiles and minions across every attack.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.attacks.iter().map(Attack::live_count).sum::<usize>()
            + self.sword.live_count()
            + self.extra_slash.live_count()
    }
}
