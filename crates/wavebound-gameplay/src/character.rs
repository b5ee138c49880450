//! The player-controlled unit.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wavebound_common::WorldBounds;

use crate::config::PlayerConfig;
use crate::stats::{StatContext, StatKind, StatModifiers};

/// Invincibility granted by a revive.
pub const REVIVE_INVINCIBILITY: f32 = 2.0;

/// Base statistics before any buff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    /// Attack power
    pub attack: f32,
    /// Max HP
    pub max_hp: i32,
    /// Movement speed
    pub speed: f32,
    /// Defense
    pub defense: f32,
    /// Crit chance
    pub crit_chance: f32,
    /// Crit multiplier
    pub crit_multiplier: f32,
    /// Basic attack reach
    pub attack_range: f32,
    /// Collision radius
    pub size: f32,
}

impl From<&PlayerConfig> for BaseStats {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            attack: config.attack,
            max_hp: config.max_hp,
            speed: config.speed,
            defense: config.defense,
            crit_chance: config.crit_chance,
            crit_multiplier: config.crit_multiplier,
            attack_range: config.attack_range,
            size: config.size,
        }
    }
}

impl BaseStats {
    /// Base value for a stat kind.
    #[must_use]
    pub fn value(&self, stat: StatKind) -> f32 {
        match stat {
            StatKind::Attack => self.attack,
            StatKind::MaxHp => self.max_hp as f32,
            StatKind::Speed => self.speed,
            StatKind::Defense => self.defense,
            StatKind::CritChance => self.crit_chance,
            StatKind::CritMultiplier => self.crit_multiplier,
            StatKind::AttackRange => self.attack_range,
        }
    }
}

/// Outcome of an incoming hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResult {
    /// The hit landed during an invincibility window.
    Ignored,
    /// HP was reduced and the character survives.
    Damaged {
        /// HP after the hit
        remaining: i32,
    },
    /// HP reached zero.
    Died,
}

/// The player character.
#[derive(Debug, Clone)]
pub struct Character {
    /// World position
    pub position: Vec2,
    /// Facing angle (radians)
    pub facing: f32,
    /// Requested movement direction (not necessarily normalized)
    pub move_intent: Vec2,
    /// Accumulated buff modifiers
    pub modifiers: StatModifiers,
    base: BaseStats,
    hp: i32,
    max_hp: i32,
    invincible_timer: f32,
    hit_invincibility: f32,
    revive_used: bool,
    speed_multiplier: f32,
    regen_clock: f32,
}

impl Character {
    /// Create a character at full HP.
    #[must_use]
    pub fn new(base: BaseStats, position: Vec2, modifiers: StatModifiers) -> Self {
        Self {
            position,
            facing: 0.0,
            move_intent: Vec2::ZERO,
            modifiers,
            base,
            hp: base.max_hp,
            max_hp: base.max_hp,
            invincible_timer: 0.0,
            hit_invincibility: 0.5,
            revive_used: false,
            speed_multiplier: 1.0,
            regen_clock: 0.0,
        }
    }

    /// Set how long a landed hit grants invincibility.
    #[must_use]
    pub fn with_hit_invincibility(mut self, seconds: f32) -> Self {
        self.hit_invincibility = seconds.max(0.0);
        self
    }

    /// Current HP.
    #[must_use]
    pub const fn hp(&self) -> i32 {
        self.hp
    }

    /// Max HP as of the last recompute.
    #[must_use]
    pub const fn max_hp(&self) -> i32 {
        self.max_hp
    }

    /// Base stats.
    #[must_use]
    pub const fn base(&self) -> &BaseStats {
        &self.base
    }

    /// HP as a fraction of max HP.
    #[must_use]
    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        self.hp as f32 / self.max_hp as f32
    }

    /// Stat context for a given combo count.
    #[must_use]
    pub fn context(&self, combo_count: u32) -> StatContext {
        StatContext {
            combo_count,
            hp_fraction: self.hp_fraction(),
        }
    }

    /// Computed value of a stat.
    #[must_use]
    pub fn stat(&self, stat: StatKind, combo_count: u32) -> f32 {
        self.modifiers
            .computed(self.base.value(stat), stat, &self.context(combo_count))
    }

    /// Computed movement speed including any active skill multiplier.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.stat(StatKind::Speed, 0) * self.speed_multiplier
    }

    /// Current skill speed multiplier.
    #[must_use]
    pub const fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Replace the skill speed multiplier.
    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier;
    }

    /// Damage reduction for the current HP.
    #[must_use]
    pub fn damage_reduction(&self) -> f32 {
        self.modifiers.effective_damage_reduction(self.hp_fraction())
    }

    /// Re-derive max HP after a buff.
    ///
    /// An increase is also added to current HP. Current HP never drops
    /// because of a recompute. Returns the max HP gained.
    pub fn recompute_max_hp(&mut self) -> i32 {
        let computed = self.stat(StatKind::MaxHp, 0).floor() as i32;
        let new_max = computed.max(1);
        let gained = new_max - self.max_hp;
        let before = self.hp;
        if gained > 0 {
            self.hp += gained;
        }
        self.max_hp = new_max;
        self.hp = self.hp.min(self.max_hp).max(before.min(self.max_hp));
        if gained != 0 {
            debug!(max_hp = self.max_hp, hp = self.hp, "max HP recomputed");
        }
        gained.max(0)
    }

    /// Check whether hits are currently ignored.
    #[must_use]
    pub fn is_invincible(&self) -> bool {
        self.invincible_timer > 0.0
    }

    /// Extend invincibility to at least `seconds` from now.
    pub fn grant_invincibility(&mut self, seconds: f32) {
        self.invincible_timer = self.invincible_timer.max(seconds);
    }

    /// Apply an already-reduced hit.
    pub fn take_damage(&mut self, amount: i32) -> HitResult {
        if self.is_invincible() || self.is_dead() {
            return HitResult::Ignored;
        }
        self.hp = (self.hp - amount.max(0)).max(0);
        self.invincible_timer = self.hit_invincibility;
        if self.hp == 0 {
            HitResult::Died
        } else {
            HitResult::Damaged { remaining: self.hp }
        }
    }

    /// Check whether HP has reached zero.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.hp <= 0
    }

    /// Check whether the one-shot revive has been spent.
    #[must_use]
    pub const fn revive_used(&self) -> bool {
        self.revive_used
    }

    /// Spend the revive if one is held. Returns true when revived.
    pub fn try_revive(&mut self) -> bool {
        if !self.is_dead() || !self.modifiers.has_revive || self.revive_used {
            return false;
        }
        self.revive_used = true;
        self.hp = ((self.max_hp as f32 * self.modifiers.revive_fraction).floor() as i32).max(1);
        self.invincible_timer = REVIVE_INVINCIBILITY;
        info!(hp = self.hp, "revived");
        true
    }

    /// Restore HP, capped at max. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 || self.is_dead() {
            return 0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount).min(self.max_hp);
        self.hp - before
    }

    /// Restore HP to max.
    pub fn full_heal(&mut self) -> i32 {
        self.heal(self.max_hp)
    }

    /// Heal from lifesteal on a dealt hit.
    pub fn lifesteal(&mut self, damage_dealt: i32) -> i32 {
        let amount = (damage_dealt as f32 * self.modifiers.lifesteal_percent).floor() as i32;
        self.heal(amount)
    }

    /// Heal from a kill.
    pub fn on_kill(&mut self) -> i32 {
        self.heal(self.modifiers.heal_on_kill)
    }

    /// Advance timers. Returns HP regenerated this step.
    pub fn update(&mut self, dt: f32) -> i32 {
        self.invincible_timer = (self.invincible_timer - dt).max(0.0);

        if self.modifiers.regen_per_second <= 0.0 {
            self.regen_clock = 0.0;
            return 0;
        }
        self.regen_clock += dt;
        let mut healed = 0;
        while self.regen_clock >= 1.0 {
            self.regen_clock -= 1.0;
            healed += self.heal(self.modifiers.regen_per_second.floor() as i32);
        }
        healed
    }

    /// Move along the current intent and stay inside the world.
    pub fn integrate(&mut self, dt: f32, bounds: &WorldBounds) {
        let dir = self.move_intent.normalize_or_zero();
        self.position += dir * self.speed() * dt;
        self.position = bounds.clamp(self.position, self.base.size);
    }

    /// Teleport, clamped to the world with the given edge margin.
    pub fn teleport(&mut self, target: Vec2, bounds: &WorldBounds, margin: f32) {
        self.position = bounds.clamp(target, margin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character() -> Character {
        Character::new(
            BaseStats::from(&PlayerConfig::default()),
            Vec2::new(1000.0, 1000.0),
            StatModifiers::default(),
        )
    }

    #[test]
    fn test_hit_starts_invincibility() {
        let mut c = character();
        assert_eq!(c.take_damage(30), HitResult::Damaged { remaining: 70 });
        // Second hit inside the window is ignored
        assert_eq!(c.take_damage(30), HitResult::Ignored);
        assert_eq!(c.hp(), 70);

        c.update(0.6);
        assert_eq!(c.take_damage(30), HitResult::Damaged { remaining: 40 });
    }

    #[test]
    fn test_max_hp_increase_raises_current() {
        let mut c = character();
        c.take_damage(50);
        c.modifiers.add_flat(StatKind::MaxHp, 15.0);
        let gained = c.recompute_max_hp();

        assert_eq!(gained, 15);
        assert_eq!(c.max_hp(), 115);
        assert_eq!(c.hp(), 65);
    }

    #[test]
    fn test_recompute_never_lowers_hp() {
        let mut c = character();
        c.modifiers.add_percent(StatKind::MaxHp, 0.3);
        c.recompute_max_hp();
        assert_eq!(c.max_hp(), 130);
        assert_eq!(c.hp(), 130);

        // Recompute without change keeps HP
        c.recompute_max_hp();
        assert_eq!(c.hp(), 130);
    }

    #[test]
    fn test_revive_once() {
        let mut c = character();
        c.modifiers.has_revive = true;
        assert_eq!(c.take_damage(500), HitResult::Died);
        assert!(c.try_revive());
        assert_eq!(c.hp(), 30);
        assert!(c.is_invincible());

        c.update(REVIVE_INVINCIBILITY + 0.1);
        assert_eq!(c.take_damage(500), HitResult::Died);
        assert!(!c.try_revive());
    }

    #[test]
    fn test_regen_ticks_per_whole_second() {
        let mut c = character();
        c.modifiers.regen_per_second = 2.0;
        c.take_damage(20);

        assert_eq!(c.update(0.5), 0);
        assert_eq!(c.update(0.6), 2);
        assert_eq!(c.hp(), 82);
    }

    #[test]
    fn test_lifesteal_floors() {
        let mut c = character();
        c.modifiers.lifesteal_percent = 0.03;
        c.take_damage(50);
        // floor(99 * 0.03) = 2
        assert_eq!(c.lifesteal(99), 2);
        assert_eq!(c.hp(), 52);
    }

    #[test]
    fn test_heal_capped() {
        let mut c = character();
        c.take_damage(10);
        assert_eq!(c.heal(50), 10);
        assert_eq!(c.hp(), 100);
    }

    #[test]
    fn test_teleport_clamped() {
        let mut c = character();
        let bounds = WorldBounds::new(2000.0, 2000.0);
        c.teleport(Vec2::new(1990.0, -300.0), &bounds, 50.0);
        assert_eq!(c.position, Vec2::new(1950.0, 50.0));
    }
}
