//! Equipped basic attacks.
//!
//! This module provides:
//! - The closed set of attack archetypes and their tuning
//! - `AttackCore`, the cooldown/level/buff state every archetype shares
//! - `CombatServices`, the damage pipeline attacks and skills strike through
//! - `Attack`, one equipped archetype with its own projectile or minion pool
//! - `AttackRegistry`, the equipped set plus on-cast procs

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tracing::trace;

use crate::character::Character;
use crate::combo::ComboTracker;
use crate::damage::{DamageResolver, KnockbackTracker};
use crate::events::{EventBus, GameEvent};
use crate::spatial::{DamageOutcome, EnemyQuery, EnemySnapshot, EnemyWorld};
use crate::stats::{StatKind, StatModifiers};

pub mod arrow;
pub mod lightning;
pub mod orb;
pub mod projectile;
pub mod registry;
pub mod slash;
pub mod summon;
pub mod wave;

pub use arrow::ArrowAttack;
pub use lightning::LightningAttack;
pub use orb::OrbAttack;
pub use projectile::{Launch, Pierce, Projectile, ProjectileSet};
pub use registry::AttackRegistry;
pub use slash::SlashAttack;
pub use summon::SummonAttack;
pub use wave::WaveAttack;

/// Shortest cooldown any attack can reach.
pub const MIN_COOLDOWN: f32 = 0.1;

const FLOOR_EPSILON: f64 = 1e-6;

pub(crate) fn floor_i32(value: f64) -> i32 {
    (value.max(0.0) + FLOOR_EPSILON).floor() as i32
}

// ============================================================================
// Archetypes
// ============================================================================

/// Basic-attack behavior patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Straight projectile
    Arrow,
    /// Melee arc
    Slash,
    /// Homing projectile
    Orb,
    /// Unlimited-pierce wave
    Wave,
    /// Chain lightning
    Lightning,
    /// Orbiting minions
    Summon,
}

/// Base damage, cooldown and range for an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackTuning {
    /// Base damage
    pub damage: i32,
    /// Base cooldown (seconds)
    pub cooldown: f32,
    /// Base range
    pub range: f32,
}

impl Archetype {
    /// Every archetype.
    pub const ALL: [Self; 6] = [
        Self::Arrow,
        Self::Slash,
        Self::Orb,
        Self::Wave,
        Self::Lightning,
        Self::Summon,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Arrow => "arrow",
            Self::Slash => "slash",
            Self::Orb => "orb",
            Self::Wave => "wave",
            Self::Lightning => "lightning",
            Self::Summon => "summon",
        }
    }

    /// Parse a lowercase name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// Default tuning.
    #[must_use]
    pub const fn tuning(self) -> AttackTuning {
        let (damage, cooldown, range) = match self {
            Self::Arrow => (10, 0.5, 400.0),
            Self::Slash => (15, 0.6, 80.0),
            Self::Orb => (8, 0.8, 350.0),
            Self::Wave => (12, 1.2, 350.0),
            Self::Lightning => (12, 1.5, 250.0),
            Self::Summon => (6, 8.0, 200.0),
        };
        AttackTuning {
            damage,
            cooldown,
            range,
        }
    }

    /// Whether the attack needs a target in range to fire.
    #[must_use]
    pub const fn requires_target(self) -> bool {
        matches!(self, Self::Orb | Self::Lightning)
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Extra strike fired by a chance roll when the basic attack is cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcAction {
    /// A homing sword projectile.
    HomingSword,
    /// An additional melee arc.
    ExtraSlash,
}

/// Archetype-targeted upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttackBuff {
    /// Damage bonus fraction
    Damage(f32),
    /// Cooldown reduction fraction
    Cooldown(f32),
    /// Range bonus fraction
    Range(f32),
    /// Extra arrows per volley
    Multishot(u32),
    /// Extra enemies a projectile may pass through
    Pierce(u32),
    /// Projectile speed bonus fraction
    ProjectileSpeed(f32),
    /// Slash arc (radians)
    Arc(f32),
    /// Extra orbs per cast
    OrbCount(u32),
    /// Orb speed bonus fraction
    TrackingSpeed(f32),
    /// Extra waves per cast
    WaveCount(u32),
    /// Wave width bonus fraction
    Width(f32),
    /// Extra chain hops
    ChainCount(u32),
    /// Chain radius bonus fraction
    ChainRange(f32),
    /// Added to the per-hop damage factor
    ChainDecay(f32),
    /// Extra minions per cast
    SummonCount(u32),
    /// Minion lifetime bonus fraction
    SummonDuration(f32),
    /// Minion attack-rate bonus fraction
    SummonAttackSpeed(f32),
}

// ============================================================================
// Shared Attack State
// ============================================================================

/// Cooldown, level and generic bonuses shared by every archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackCore {
    archetype: Archetype,
    tuning: AttackTuning,
    level: u32,
    damage: i32,
    cooldown: f32,
    cooldown_remaining: f32,
    damage_bonus: f32,
    cooldown_reduction: f32,
    range_bonus: f32,
    enabled: bool,
}

impl AttackCore {
    /// Level-1 state for an archetype.
    #[must_use]
    pub fn new(archetype: Archetype, tuning: AttackTuning) -> Self {
        Self {
            archetype,
            tuning,
            level: 1,
            damage: tuning.damage,
            cooldown: tuning.cooldown.max(MIN_COOLDOWN),
            cooldown_remaining: 0.0,
            damage_bonus: 0.0,
            cooldown_reduction: 0.0,
            range_bonus: 0.0,
            enabled: true,
        }
    }

    /// Archetype.
    #[must_use]
    pub const fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Cooldown before reductions.
    #[must_use]
    pub const fn cooldown(&self) -> f32 {
        self.cooldown
    }

    /// Cooldown left.
    #[must_use]
    pub const fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }

    /// The attack's own cooldown reduction before the ceiling.
    #[must_use]
    pub const fn cooldown_reduction(&self) -> f32 {
        self.cooldown_reduction
    }

    /// Enable or disable firing.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Check whether the attack can fire.
    #[must_use]
    pub fn can_fire(&self) -> bool {
        self.enabled && self.cooldown_remaining <= 0.0
    }

    /// Count the cooldown down. Never goes negative.
    pub fn tick(&mut self, dt: f32) {
        if self.cooldown_remaining > 0.0 {
            self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
        }
        debug_assert!(self.cooldown_remaining >= 0.0);
    }

    /// Start the cooldown with the character's reduction folded in.
    ///
    /// The attack's own reduction and the character's are summed and clamped
    /// together at `cap`.
    pub fn start_cooldown(&mut self, character_reduction: f32, cap: f32) {
        let reduction = (self.cooldown_reduction + character_reduction).clamp(0.0, cap);
        self.cooldown_remaining = (self.cooldown * (1.0 - reduction)).max(MIN_COOLDOWN);
    }

    /// `floor(damage * (1 + bonus))`
    #[must_use]
    pub fn computed_damage(&self) -> i32 {
        floor_i32(f64::from(self.damage) * (1.0 + f64::from(self.damage_bonus)))
    }

    /// Range with this attack's bonus and the character's range scale.
    #[must_use]
    pub fn computed_range(&self, range_scale: f32) -> f32 {
        self.tuning.range * (1.0 + self.range_bonus) * range_scale
    }

    /// Raise the level and re-derive damage and cooldown.
    pub fn upgrade(&mut self) {
        self.level += 1;
        let steps = f64::from(self.level - 1);
        self.damage = floor_i32(f64::from(self.tuning.damage) * (1.0 + 0.1 * steps));
        self.cooldown =
            ((f64::from(self.tuning.cooldown) * (1.0 - 0.05 * steps)) as f32).max(MIN_COOLDOWN);
    }

    /// Apply a generic bonus. Returns false for archetype-specific buffs.
    pub fn apply_buff(&mut self, buff: AttackBuff) -> bool {
        match buff {
            AttackBuff::Damage(v) => self.damage_bonus += v,
            AttackBuff::Cooldown(v) => {
                self.cooldown_reduction = (self.cooldown_reduction + v).min(1.0);
            }
            AttackBuff::Range(v) => self.range_bonus += v,
            _ => return false,
        }
        true
    }
}

// ============================================================================
// Combat Services
// ============================================================================

/// Character-derived numbers an attack needs for one tick.
#[derive(Debug, Clone, Copy)]
pub struct Striker<'a> {
    /// Owner position
    pub position: Vec2,
    /// Owner facing
    pub facing: f32,
    /// Owner collision radius
    pub size: f32,
    /// Computed attack over base attack
    pub attack_scale: f32,
    /// Computed crit chance
    pub crit_chance: f32,
    /// Computed crit multiplier
    pub crit_multiplier: f32,
    /// Computed attack range over base attack range
    pub range_scale: f32,
    /// Character cooldown reduction after the ceiling
    pub cooldown_reduction: f32,
    /// Modifiers for per-target bonuses
    pub modifiers: &'a StatModifiers,
}

impl<'a> Striker<'a> {
    /// Snapshot a character for the current combo count.
    #[must_use]
    pub fn from_character(character: &'a Character, combo_count: u32) -> Self {
        let base = character.base();
        let ratio = |stat: StatKind, base_value: f32| {
            if base_value > 0.0 {
                character.stat(stat, combo_count) / base_value
            } else {
                1.0
            }
        };
        Self {
            position: character.position,
            facing: character.facing,
            size: base.size,
            attack_scale: ratio(StatKind::Attack, base.attack),
            crit_chance: character.stat(StatKind::CritChance, combo_count).clamp(0.0, 1.0),
            crit_multiplier: character.stat(StatKind::CritMultiplier, combo_count),
            range_scale: ratio(StatKind::AttackRange, base.attack_range),
            cooldown_reduction: character.modifiers.effective_cooldown_reduction(),
            modifiers: &character.modifiers,
        }
    }

    /// `floor(damage * attack_scale)`
    #[must_use]
    pub fn scaled_damage(&self, damage: i32) -> f32 {
        floor_i32(f64::from(damage) * f64::from(self.attack_scale)) as f32
    }
}

/// One landed hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikeOutcome {
    /// Final damage
    pub amount: i32,
    /// Crit flag
    pub is_crit: bool,
    /// Target died
    pub killed: bool,
}

/// A kill waiting to be processed by the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KillRecord {
    /// Enemy as it was when struck
    pub enemy: EnemySnapshot,
}

/// Damage pipeline shared by attacks and skills.
///
/// Owned by the run and passed by reference; kills and dealt damage are
/// queued here and drained once per tick.
#[derive(Debug)]
pub struct CombatServices {
    /// Crit rolls and damage formulas
    pub resolver: DamageResolver,
    /// Hit streak
    pub combo: ComboTracker,
    /// Knockback windows
    pub knockback: KnockbackTracker,
    /// Presentation queue
    pub events: EventBus,
    kills: Vec<KillRecord>,
    dealt: Vec<i32>,
}

impl CombatServices {
    /// Bundle the services.
    #[must_use]
    pub fn new(
        resolver: DamageResolver,
        combo: ComboTracker,
        knockback: KnockbackTracker,
        events: EventBus,
    ) -> Self {
        Self {
            resolver,
            combo,
            knockback,
            events,
            kills: Vec::new(),
            dealt: Vec::new(),
        }
    }

    /// Land one hit on an enemy.
    ///
    /// Registers the combo, rolls damage, applies the per-target bonus,
    /// applies the damage and knockback, and queues the kill. Returns `None`
    /// if the enemy is no longer live.
    pub fn strike(
        &mut self,
        world: &mut dyn EnemyWorld,
        striker: &Striker<'_>,
        target: &EnemySnapshot,
        base: f32,
        knockback_from: Option<Vec2>,
    ) -> Option<StrikeOutcome> {
        let current = world.snapshot(target.handle)?;

        let combo = self.combo.register_hit();
        self.events.publish(GameEvent::ComboChanged {
            count: combo.count,
            multiplier: combo.multiplier,
        });

        let roll = self.resolver.compute_damage(
            base,
            combo.multiplier,
            striker.crit_chance,
            striker.crit_multiplier,
        );
        let bonus = striker
            .modifiers
            .damage_multiplier_against(current.hp_fraction());
        let amount = floor_i32(f64::from(roll.amount) * f64::from(bonus));

        let outcome = world.apply_damage(current.handle, amount);
        self.dealt.push(amount);
        self.events.publish(GameEvent::DamageDealt {
            target: current.handle,
            position: current.position,
            amount,
            is_crit: roll.is_crit,
        });
        if roll.is_crit {
            self.events.publish(GameEvent::ScreenShake {
                intensity: 0.003,
                duration: 0.05,
            });
        }
        trace!(enemy = %current.handle, amount, crit = roll.is_crit, "hit");

        let killed = match outcome {
            DamageOutcome::Killed => {
                self.knockback.forget(current.handle);
                self.kills.push(KillRecord { enemy: current });
                self.events.publish(GameEvent::EnemyKilled {
                    handle: current.handle,
                    kind: current.kind,
                    position: current.position,
                });
                true
            }
            DamageOutcome::Hit { .. } => {
                if let Some(from) = knockback_from {
                    let impulse = self.resolver.compute_knockback(current.position, from);
                    self.knockback.apply(world, current.handle, impulse);
                }
                false
            }
            DamageOutcome::Missing => false,
        };

        Some(StrikeOutcome {
            amount,
            is_crit: roll.is_crit,
            killed,
        })
    }

    /// Take the kills queued since the last drain.
    pub fn take_kills(&mut self) -> Vec<KillRecord> {
        std::mem::take(&mut self.kills)
    }

    /// Take the damage amounts dealt since the last drain.
    pub fn take_dealt(&mut self) -> Vec<i32> {
        std::mem::take(&mut self.dealt)
    }
}

// ============================================================================
// Attack
// ============================================================================

/// Archetype-specific behavior behind [`Attack`].
pub trait AttackBehavior {
    /// Fire once. Returns false when nothing was fired (no cooldown cost).
    fn execute(
        &mut self,
        core: &AttackCore,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) -> bool;

    /// Advance in-flight projectiles or minions and resolve their hits.
    fn update(
        &mut self,
        dt: f32,
        core: &AttackCore,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    );

    /// Apply an archetype-specific buff. Returns false if it does not apply.
    fn apply_buff(&mut self, buff: AttackBuff) -> bool;

    /// Live projectiles or minions.
    fn live_count(&self) -> usize;

    /// Drop everything in flight.
    fn clear(&mut self);
}

/// Archetype payload.
#[derive(Debug, Clone)]
pub enum AttackKind {
    /// Arrow state
    Arrow(ArrowAttack),
    /// Slash state
    Slash(SlashAttack),
    /// Orb state
    Orb(OrbAttack),
    /// Wave state
    Wave(WaveAttack),
    /// Lightning state
    Lightning(LightningAttack),
    /// Summon state
    Summon(SummonAttack),
}

impl AttackKind {
    fn new(archetype: Archetype, capacity: usize) -> Self {
        match archetype {
            Archetype::Arrow => Self::Arrow(ArrowAttack::new(capacity)),
            Archetype::Slash => Self::Slash(SlashAttack::new()),
            Archetype::Orb => Self::Orb(OrbAttack::new(capacity)),
            Archetype::Wave => Self::Wave(WaveAttack::new(capacity)),
            Archetype::Lightning => Self::Lightning(LightningAttack::new()),
            Archetype::Summon => Self::Summon(SummonAttack::new(capacity)),
        }
    }

    fn behavior(&self) -> &dyn AttackBehavior {
        match self {
            Self::Arrow(a) => a,
            Self::Slash(a) => a,
            Self::Orb(a) => a,
            Self::Wave(a) => a,
            Self::Lightning(a) => a,
            Self::Summon(a) => a,
        }
    }

    fn behavior_mut(&mut self) -> &mut dyn AttackBehavior {
        match self {
            Self::Arrow(a) => a,
            Self::Slash(a) => a,
            Self::Orb(a) => a,
            Self::Wave(a) => a,
            Self::Lightning(a) => a,
            Self::Summon(a) => a,
        }
    }
}

/// UI summary of an equipped attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackInfo {
    /// Archetype
    pub archetype: Archetype,
    /// Level
    pub level: u32,
    /// Computed damage
    pub damage: i32,
    /// Cooldown before reductions
    pub cooldown: f32,
    /// Cooldown left
    pub cooldown_remaining: f32,
    /// Live projectiles or minions
    pub live: usize,
}

/// One equipped archetype.
#[derive(Debug, Clone)]
pub struct Attack {
    core: AttackCore,
    kind: AttackKind,
}

impl Attack {
    /// Level-1 attack with default tuning.
    #[must_use]
    pub fn new(archetype: Archetype, capacity: usize) -> Self {
        Self::with_tuning(archetype, archetype.tuning(), capacity)
    }

    /// Level-1 attack with explicit tuning.
    #[must_use]
    pub fn with_tuning(archetype: Archetype, tuning: AttackTuning, capacity: usize) -> Self {
        Self {
            core: AttackCore::new(archetype, tuning),
            kind: AttackKind::new(archetype, capacity),
        }
    }

    /// Archetype.
    #[must_use]
    pub const fn archetype(&self) -> Archetype {
        self.core.archetype
    }

    /// Shared state.
    #[must_use]
    pub const fn core(&self) -> &AttackCore {
        &self.core
    }

    /// Archetype payload.
    #[must_use]
    pub const fn kind(&self) -> &AttackKind {
        &self.kind
    }

    /// Check whether the attack can fire.
    #[must_use]
    pub fn can_fire(&self) -> bool {
        self.core.can_fire()
    }

    /// Fire if ready. Starts the cooldown only when something was fired.
    pub fn execute(
        &mut self,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) -> bool {
        if !self.core.can_fire() {
            return false;
        }
        let fired = self.fire(striker, world, services);
        if fired {
            self.core
                .start_cooldown(striker.cooldown_reduction, striker.modifiers.reduction_cap());
        }
        fired
    }

    /// Fire ignoring the cooldown (procs).
    pub fn fire(
        &mut self,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) -> bool {
        self.kind
            .behavior_mut()
            .execute(&self.core, striker, world, services)
    }

    /// Advance cooldown and in-flight state.
    pub fn update(
        &mut self,
        dt: f32,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) {
        self.core.tick(dt);
        self.kind
            .behavior_mut()
            .update(dt, &self.core, striker, world, services);
    }

    /// Apply a buff to the shared state or the payload.
    pub fn apply_buff(&mut self, buff: AttackBuff) -> bool {
        self.core.apply_buff(buff) || self.kind.behavior_mut().apply_buff(buff)
    }

    /// Level up.
    pub fn upgrade(&mut self) {
        self.core.upgrade();
    }

    /// Live projectiles or minions.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.kind.behavior().live_count()
    }

    /// Drop everything in flight.
    pub fn clear(&mut self) {
        self.kind.behavior_mut().clear();
    }

    /// UI summary.
    #[must_use]
    pub fn info(&self) -> AttackInfo {
        AttackInfo {
            archetype: self.core.archetype,
            level: self.core.level,
            damage: self.core.computed_damage(),
            cooldown: self.core.cooldown,
            cooldown_remaining: self.core.cooldown_remaining,
            live: self.live_count(),
        }
    }
}

/// Slash arc ceiling.
pub const MAX_SLASH_ARC: f32 = 1.5 * PI;


#[cfg(test)]
mod tests {
    use super::test_support::{neutral_striker, services, spawn_with_hp};
    use super::*;
    use crate::character::BaseStats;
    use crate::config::PlayerConfig;
    use crate::spatial::EnemyPool;

    #[test]
    fn test_upgrade_formula() {
        let mut core = AttackCore::new(Archetype::Slash, Archetype::Slash.tuning());
        core.upgrade();
        core.upgrade();
        // floor(15 * 1.2) = 18, 0.6 * 0.9 = 0.54
        assert_eq!(core.level(), 3);
        assert_eq!(core.computed_damage(), 18);
        assert!((core.cooldown() - 0.54).abs() < 1e-5);
    }

    #[test]
    fn test_cooldown_floor_and_reduction_cap() {
        let mut core = AttackCore::new(Archetype::Arrow, Archetype::Arrow.tuning());
        core.apply_buff(AttackBuff::Cooldown(0.5));
        core.start_cooldown(0.5, 0.75);
        // 0.5 * (1 - 0.75)
        assert!((core.cooldown_remaining() - 0.125).abs() < 1e-6);

        // A tighter ceiling binds the attack's own share too
        core.start_cooldown(0.0, 0.3);
        assert!((core.cooldown_remaining() - 0.35).abs() < 1e-6);

        let mut fast = AttackCore::new(
            Archetype::Arrow,
            AttackTuning {
                damage: 1,
                cooldown: 0.2,
                range: 10.0,
            },
        );
        fast.start_cooldown(0.75, 0.75);
        assert!((fast.cooldown_remaining() - MIN_COOLDOWN).abs() < 1e-6);
    }

    #[test]
    fn test_tick_never_negative() {
        let mut core = AttackCore::new(Archetype::Orb, Archetype::Orb.tuning());
        core.start_cooldown(0.0, 0.75);
        core.tick(5.0);
        assert!(core.cooldown_remaining().abs() < f32::EPSILON);
        assert!(core.can_fire());
    }

    #[test]
    fn test_configured_cap_limits_character_reduction() {
        let base = BaseStats::from(&PlayerConfig::default());
        let mut mods = StatModifiers::new(0.5);
        mods.cooldown_reduction = 0.9;
        let character = Character::new(base, Vec2::new(300.0, 300.0), mods);
        let striker = Striker::from_character(&character, 0);
        assert!((striker.cooldown_reduction - 0.5).abs() < 1e-6);

        let mut world = EnemyPool::new(4);
        let mut services = services();
        let mut arrow = Attack::new(Archetype::Arrow, 8);
        assert!(arrow.execute(&striker, &mut world, &mut services));
        // 0.5 * (1 - 0.5), not the default 0.75 ceiling
        assert!((arrow.core().cooldown_remaining() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_generic_buffs() {
        let mut core = AttackCore::new(Archetype::Slash, Archetype::Slash.tuning());
        assert!(core.apply_buff(AttackBuff::Damage(0.25)));
        assert!(core.apply_buff(AttackBuff::Range(0.5)));
        assert!(!core.apply_buff(AttackBuff::Pierce(1)));
        // floor(15 * 1.25)
        assert_eq!(core.computed_damage(), 18);
        assert!((core.computed_range(1.0) - 120.0).abs() < 1e-4);
    }

    #[test]
    fn test_archetype_names_round_trip() {
        for archetype in Archetype::ALL {
            assert_eq!(Archetype::from_name(archetype.name()), Some(archetype));
        }
        assert_eq!(Archetype::from_name("boomerang"), None);
    }

    #[test]
    fn test_strike_kills_and_queues() {
        let mut world = EnemyPool::new(8);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        let handle = spawn_with_hp(&mut world, Vec2::new(30.0, 0.0), 10);
        let target = world.snapshot(handle).unwrap();

        let outcome = services
            .strike(&mut world, &striker, &target, 10.0, Some(Vec2::ZERO))
            .unwrap();
        assert!(outcome.killed);
        assert_eq!(outcome.amount, 10);
        assert!(world.snapshot(handle).is_none());
        assert_eq!(services.take_kills().len(), 1);
        assert_eq!(services.take_dealt(), vec![10]);

        // Dead enemies cannot be struck again
        assert!(services
            .strike(&mut world, &striker, &target, 10.0, None)
            .is_none());
    }

    #[test]
    fn test_strike_applies_execute_bonus_and_knockback() {
        let mut world = EnemyPool::new(8);
        let mut services = services();
        let mut mods = StatModifiers::default();
        mods.add_execute_bonus(0.3, 0.5);
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        let handle = spawn_with_hp(&mut world, Vec2::new(30.0, 0.0), 100);

        // 100 hp: no bonus
        let target = world.snapshot(handle).unwrap();
        let first = services
            .strike(&mut world, &striker, &target, 75.0, Some(Vec2::ZERO))
            .unwrap();
        assert_eq!(first.amount, 75);
        assert!(services.knockback.is_active(handle));
        assert!(world.velocity(handle).unwrap().x > 0.0);

        // 25 hp left (< 30%): +50%, combo 1.05 -> floor(10 * 1.05) = 10 -> 15
        let target = world.snapshot(handle).unwrap();
        let second = services
            .strike(&mut world, &striker, &target, 10.0, None)
            .unwrap();
        assert_eq!(second.amount, 15);
        assert!(!second.killed);
    }
}
