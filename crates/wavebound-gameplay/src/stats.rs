//! Stat aggregation.
//!
//! This module provides:
//! - Named character stats and their base values
//! - Additive and percentage accumulators filled in by buffs
//! - Conditional bonuses evaluated against the live combat context
//! - Scalar modifiers (cooldown/damage reduction, lifesteal, regen...)
//!
//! Derived values are never cached: every query folds the accumulators
//! against the base value, so the order buffs were picked in is irrelevant.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::attacks::ProcAction;
use crate::skills::{SkillField, SkillFlag, SkillSlot};

/// Default ceiling for cooldown and damage reduction.
pub const DEFAULT_REDUCTION_CAP: f32 = 0.75;

// ============================================================================
// Stat Kinds
// ============================================================================

/// Character statistics that buffs can modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    /// Attack power.
    Attack,
    /// Maximum health.
    MaxHp,
    /// Movement speed.
    Speed,
    /// Flat defense, converted to reduction by `def / (def + k)`.
    Defense,
    /// Probability of a critical hit.
    CritChance,
    /// Damage multiplier on a critical hit.
    CritMultiplier,
    /// Reach of the basic attack.
    AttackRange,
}

impl StatKind {
    /// All stat kinds.
    pub const ALL: [Self; 7] = [
        Self::Attack,
        Self::MaxHp,
        Self::Speed,
        Self::Defense,
        Self::CritChance,
        Self::CritMultiplier,
        Self::AttackRange,
    ];

    /// Looks up a stat by its short name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "atk" | "attack" => Some(Self::Attack),
            "maxHp" | "max_hp" => Some(Self::MaxHp),
            "speed" => Some(Self::Speed),
            "def" | "defense" => Some(Self::Defense),
            "critChance" | "crit_chance" => Some(Self::CritChance),
            "critMultiplier" | "crit_multiplier" => Some(Self::CritMultiplier),
            "attackRange" | "attack_range" => Some(Self::AttackRange),
            _ => None,
        }
    }

    /// Short display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Attack => "atk",
            Self::MaxHp => "max_hp",
            Self::Speed => "speed",
            Self::Defense => "def",
            Self::CritChance => "crit_chance",
            Self::CritMultiplier => "crit_multiplier",
            Self::AttackRange => "attack_range",
        }
    }
}

// ============================================================================
// Conditions
// ============================================================================

/// Live combat state conditional modifiers are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatContext {
    /// Current combo count.
    pub combo_count: u32,
    /// Current HP as a fraction of max HP.
    pub hp_fraction: f32,
}

impl Default for StatContext {
    fn default() -> Self {
        Self {
            combo_count: 0,
            hp_fraction: 1.0,
        }
    }
}

/// Predicate over the combat context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Combo count at or above the threshold.
    ComboAtLeast(u32),
    /// HP fraction strictly below the threshold.
    HpBelow(f32),
}

impl Condition {
    /// Check the condition against a context.
    #[must_use]
    pub fn holds(&self, ctx: &StatContext) -> bool {
        match *self {
            Self::ComboAtLeast(n) => ctx.combo_count >= n,
            Self::HpBelow(fraction) => ctx.hp_fraction < fraction,
        }
    }
}

/// Percentage bonus to one stat that only applies while a condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBonus {
    /// When the bonus applies.
    pub condition: Condition,
    /// Stat affected.
    pub stat: StatKind,
    /// Bonus fraction (0.1 = +10%).
    pub percent: f32,
}

/// Chance-based action fired when the basic attack is cast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Proc {
    /// Probability per cast.
    pub chance: f32,
    /// What to fire.
    pub action: ProcAction,
}

// ============================================================================
// Modifier Record
// ============================================================================

/// Accumulated buff modifiers for one character.
#[derive(Debug, Clone, PartialEq)]
pub struct StatModifiers {
    flat: AHashMap<StatKind, f32>,
    percent: AHashMap<StatKind, f32>,
    conditionals: Vec<ConditionalBonus>,
    /// Sum of cooldown reduction (clamped on read).
    pub cooldown_reduction: f32,
    /// Sum of damage reduction (clamped on read).
    pub damage_reduction: f32,
    /// Bonus multiplier on skill damage.
    pub skill_damage: f32,
    /// HP regenerated per second.
    pub regen_per_second: f32,
    /// Fraction of dealt damage returned as HP.
    pub lifesteal_percent: f32,
    /// HP restored per kill.
    pub heal_on_kill: i32,
    /// A one-shot revive is held.
    pub has_revive: bool,
    /// HP fraction restored on revive.
    pub revive_fraction: f32,
    /// Combo count that grants contact immunity.
    pub combo_invincible_at: Option<u32>,
    low_hp_guards: Vec<(f32, f32)>,
    execute_bonuses: Vec<(f32, f32)>,
    skill_enhancements: AHashMap<SkillSlot, AHashMap<SkillField, f32>>,
    skill_flags: AHashSet<SkillFlag>,
    procs: Vec<Proc>,
    reduction_cap: f32,
}

impl Default for StatModifiers {
    fn default() -> Self {
        Self::new(DEFAULT_REDUCTION_CAP)
    }
}

impl StatModifiers {
    /// Create an empty record with the given reduction ceiling.
    #[must_use]
    pub fn new(reduction_cap: f32) -> Self {
        Self {
            flat: AHashMap::new(),
            percent: AHashMap::new(),
            conditionals: Vec::new(),
            cooldown_reduction: 0.0,
            damage_reduction: 0.0,
            skill_damage: 0.0,
            regen_per_second: 0.0,
            lifesteal_percent: 0.0,
            heal_on_kill: 0,
            has_revive: false,
            revive_fraction: 0.3,
            combo_invincible_at: None,
            low_hp_guards: Vec::new(),
            execute_bonuses: Vec::new(),
            skill_enhancements: AHashMap::new(),
            skill_flags: AHashSet::new(),
            procs: Vec::new(),
            reduction_cap,
        }
    }

    /// Add a flat amount to a stat.
    pub fn add_flat(&mut self, stat: StatKind, value: f32) {
        *self.flat.entry(stat).or_insert(0.0) += value;
    }

    /// Add a percentage to a stat.
    pub fn add_percent(&mut self, stat: StatKind, value: f32) {
        *self.percent.entry(stat).or_insert(0.0) += value;
    }

    /// Register a conditional bonus.
    pub fn add_conditional(&mut self, bonus: ConditionalBonus) {
        self.conditionals.push(bonus);
    }

    /// Register extra damage reduction while HP is below a fraction.
    pub fn add_low_hp_guard(&mut self, hp_below: f32, reduction: f32) {
        self.low_hp_guards.push((hp_below, reduction));
    }

    /// Register bonus damage against enemies below an HP fraction.
    pub fn add_execute_bonus(&mut self, enemy_hp_below: f32, bonus: f32) {
        self.execute_bonuses.push((enemy_hp_below, bonus));
    }

    /// Add a numeric delta to a skill field.
    pub fn add_skill_enhancement(&mut self, skill: SkillSlot, field: SkillField, value: f32) {
        *self
            .skill_enhancements
            .entry(skill)
            .or_default()
            .entry(field)
            .or_insert(0.0) += value;
    }

    /// Set a behavior flag.
    pub fn set_skill_flag(&mut self, flag: SkillFlag) {
        self.skill_flags.insert(flag);
    }

    /// Register an on-cast proc.
    pub fn add_proc(&mut self, proc_: Proc) {
        self.procs.push(proc_);
    }

    /// Flat accumulator for a stat.
    #[must_use]
    pub fn flat(&self, stat: StatKind) -> f32 {
        self.flat.get(&stat).copied().unwrap_or(0.0)
    }

    /// Percentage accumulator for a stat.
    #[must_use]
    pub fn percent(&self, stat: StatKind) -> f32 {
        self.percent.get(&stat).copied().unwrap_or(0.0)
    }

    /// Fold modifiers into a base value.
    ///
    /// `(base + flat) * (1 + percent) * (1 + active conditionals)`
    #[must_use]
    pub fn computed(&self, base: f32, stat: StatKind, ctx: &StatContext) -> f32 {
        let conditional: f32 = self
            .conditionals
            .iter()
            .filter(|c| c.stat == stat && c.condition.holds(ctx))
            .map(|c| c.percent)
            .sum();
        (base + self.flat(stat)) * (1.0 + self.percent(stat)) * (1.0 + conditional)
    }

    /// Same as [`Self::computed`], looking the stat up by name.
    ///
    /// Unknown names return `base` unchanged.
    #[must_use]
    pub fn computed_by_name(&self, base: f32, name: &str, ctx: &StatContext) -> f32 {
        match StatKind::from_name(name) {
            Some(stat) => self.computed(base, stat, ctx),
            None => base,
        }
    }

    /// Cooldown reduction after the ceiling.
    #[must_use]
    pub fn effective_cooldown_reduction(&self) -> f32 {
        self.cooldown_reduction.clamp(0.0, self.reduction_cap)
    }

    /// Damage reduction for the current HP fraction, after the ceiling.
    #[must_use]
    pub fn effective_damage_reduction(&self, hp_fraction: f32) -> f32 {
        let guard: f32 = self
            .low_hp_guards
            .iter()
            .filter(|(below, _)| hp_fraction < *below)
            .map(|(_, bonus)| bonus)
            .sum();
        (self.damage_reduction + guard).clamp(0.0, self.reduction_cap)
    }

    /// Outgoing damage multiplier against an enemy at the given HP fraction.
    #[must_use]
    pub fn damage_multiplier_against(&self, enemy_hp_fraction: f32) -> f32 {
        1.0 + self
            .execute_bonuses
            .iter()
            .filter(|(below, _)| enemy_hp_fraction < *below)
            .map(|(_, bonus)| bonus)
            .sum::<f32>()
    }

    /// Check whether the combo currently grants contact immunity.
    #[must_use]
    pub fn is_combo_invincible(&self, combo_count: u32) -> bool {
        self.combo_invincible_at
            .is_some_and(|threshold| combo_count >= threshold)
    }

    /// Accumulated delta for a skill field.
    #[must_use]
    pub fn skill_enhancement(&self, skill: SkillSlot, field: SkillField) -> f32 {
        self.skill_enhancements
            .get(&skill)
            .and_then(|fields| fields.get(&field))
            .copied()
            .unwrap_or(0.0)
    }

    /// Check a behavior flag.
    #[must_use]
    pub fn has_skill_flag(&self, flag: SkillFlag) -> bool {
        self.skill_flags.contains(&flag)
    }

    /// On-cast procs.
    #[must_use]
    pub fn procs(&self) -> &[Proc] {
        &self.procs
    }

    /// Ceiling applied to reductions.
    #[must_use]
    pub const fn reduction_cap(&self) -> f32 {
        self.reduction_cap
    }
}
