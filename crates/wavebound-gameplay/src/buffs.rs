//! Buff catalog and runtime engine.
//!
//! This module provides:
//! - The static catalog of obtainable buffs (rarity, category, stacks, effect)
//! - Rarity rolls with per-rarity pity counters
//! - Choice generation that filters maxed, held and unusable buffs
//! - `BuffEngine`, which applies effects to the character and attacks

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attacks::{Archetype, AttackBuff, AttackRegistry, ProcAction};
use crate::character::Character;
use crate::skills::{SkillField, SkillFlag, SkillSlot};
use crate::stats::{Condition, ConditionalBonus, Proc, StatKind};

/// Buffs offered per prompt.
pub const CHOICES_PER_ROLL: usize = 3;

// ============================================================================
// Catalog Types
// ============================================================================

/// Buff rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    /// Most frequent.
    Common,
    /// Uncommon.
    Rare,
    /// Scarce.
    Epic,
    /// Very scarce.
    Legendary,
}

impl Rarity {
    /// Every rarity, lowest first.
    pub const ALL: [Self; 4] = [Self::Common, Self::Rare, Self::Epic, Self::Legendary];

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

/// Catalog grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffCategory {
    /// Core stats.
    Attribute,
    /// Skills and cooldowns.
    Skill,
    /// Triggered and conditional effects.
    Effect,
    /// Health and mitigation.
    Survival,
    /// Upgrades for one equipped archetype.
    AttackSpecific,
}

/// Catalog key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BuffId(pub &'static str);

impl BuffId {
    /// The raw id.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for BuffId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// One additive stat change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatDelta {
    /// Added to the stat before percentages.
    Flat(StatKind, f32),
    /// Summed into the stat's percentage accumulator.
    Percent(StatKind, f32),
    /// Cooldown reduction fraction.
    CooldownReduction(f32),
    /// Damage reduction fraction.
    DamageReduction(f32),
    /// Skill damage bonus fraction.
    SkillDamage(f32),
    /// HP per second.
    Regen(f32),
}

/// Event-driven effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// HP restored per kill.
    HealOnKill(i32),
    /// Fraction of dealt damage returned as HP.
    Lifesteal(f32),
    /// One-shot revive at a fraction of max HP.
    Revive(f32),
    /// Chance-based strike on basic-attack cast.
    OnAttack(Proc),
}

/// What a buff does when applied (once per stack).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuffEffect {
    /// One stat change.
    Stat(StatDelta),
    /// Several stat changes.
    MultiStat(&'static [StatDelta]),
    /// Triggered action.
    Trigger(Trigger),
    /// Percent bonus while a condition holds.
    Conditional(ConditionalBonus),
    /// Extra damage against enemies below an HP fraction.
    ExecuteBonus {
        /// Enemy HP fraction threshold
        enemy_hp_below: f32,
        /// Damage bonus fraction
        bonus: f32,
    },
    /// Contact immunity at a combo count.
    ComboInvincible(u32),
    /// Extra damage reduction below an HP fraction.
    LowHpGuard {
        /// HP fraction threshold
        hp_below: f32,
        /// Reduction added
        reduction: f32,
    },
    /// Numeric skill deltas.
    SkillEnhance(&'static [(SkillSlot, SkillField, f32)]),
    /// Skill behavior switch.
    SkillFlag(SkillFlag),
    /// Buffs routed to one equipped archetype.
    AttackSpecific {
        /// Archetype that must be equipped
        archetype: Archetype,
        /// Buffs applied to it
        buffs: &'static [AttackBuff],
    },
    /// Buffs routed to every archetype equipped when taken.
    AllAttacks(&'static [AttackBuff]),
}

impl BuffEffect {
    /// Archetype this effect needs equipped, if any.
    #[must_use]
    pub const fn required_archetype(&self) -> Option<Archetype> {
        match self {
            Self::AttackSpecific { archetype, .. } => Some(*archetype),
            _ => None,
        }
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuffDef {
    /// Key
    pub id: BuffId,
    /// Display name
    pub name: &'static str,
    /// Rarity
    pub rarity: Rarity,
    /// Category
    pub category: BuffCategory,
    /// Whether it can be taken more than once
    pub stackable: bool,
    /// Stack ceiling (1 for unique buffs)
    pub max_stacks: u32,
    /// Effect per stack
    pub effect: BuffEffect,
    /// First wave it may be offered on
    pub unlock_wave: u32,
}

impl BuffDef {
    /// Stackable entry.
    #[must_use]
    pub const fn stacking(
        id: &'static str,
        name: &'static str,
        rarity: Rarity,
        category: BuffCategory,
        max_stacks: u32,
        effect: BuffEffect,
    ) -> Self {
        Self {
            id: BuffId(id),
            name,
            rarity,
            category,
            stackable: true,
            max_stacks,
            effect,
            unlock_wave: 0,
        }
    }

    /// Take-once entry.
    #[must_use]
    pub const fn unique(
        id: &'static str,
        name: &'static str,
        rarity: Rarity,
        category: BuffCategory,
        effect: BuffEffect,
    ) -> Self {
        Self {
            id: BuffId(id),
            name,
            rarity,
            category,
            stackable: false,
            max_stacks: 1,
            effect,
            unlock_wave: 0,
        }
    }

    /// Hide until the given wave.
    #[must_use]
    pub const fn unlocks_at(mut self, wave: u32) -> Self {
        self.unlock_wave = wave;
        self
    }

    /// Stack ceiling honoring the stackable flag.
    #[must_use]
    pub const fn stack_limit(&self) -> u32 {
        if self.stackable {
            self.max_stacks
        } else {
            1
        }
    }
}

// ============================================================================
// Standard Catalog
// ============================================================================

use BuffCategory::{Attribute, AttackSpecific, Effect, Skill, Survival};
use Rarity::{Common, Epic, Legendary, Rare};

const fn flat(stat: StatKind, value: f32) -> BuffEffect {
    BuffEffect::Stat(StatDelta::Flat(stat, value))
}

const fn attack(archetype: Archetype, buffs: &'static [AttackBuff]) -> BuffEffect {
    BuffEffect::AttackSpecific { archetype, buffs }
}

const STANDARD: &[BuffDef] = &[
    // Attribute
    BuffDef::stacking("A01", "Keen Edge", Common, Attribute, 10, flat(StatKind::Attack, 3.0)),
    BuffDef::stacking("A02", "Toughness", Common, Attribute, 10, flat(StatKind::MaxHp, 15.0)),
    BuffDef::stacking("A03", "Swiftness", Common, Attribute, 10, flat(StatKind::Speed, 15.0)),
    BuffDef::stacking("A04", "Focus", Rare, Attribute, 10, flat(StatKind::CritChance, 0.05)),
    BuffDef::stacking("A05", "Heavy Blow", Rare, Attribute, 10, flat(StatKind::CritMultiplier, 0.2)),
    BuffDef::stacking(
        "A06",
        "Blade Heart",
        Epic,
        Attribute,
        5,
        BuffEffect::MultiStat(&[
            StatDelta::Flat(StatKind::Attack, 10.0),
            StatDelta::Flat(StatKind::CritChance, 0.03),
        ]),
    ),
    BuffDef::unique(
        "A07",
        "Immovable King",
        Legendary,
        Attribute,
        BuffEffect::MultiStat(&[
            StatDelta::Percent(StatKind::Attack, 0.2),
            StatDelta::Percent(StatKind::MaxHp, 0.3),
        ]),
    ),
    // Skill
    BuffDef::stacking(
        "S01",
        "Long Reach",
        Common,
        Skill,
        5,
        BuffEffect::Stat(StatDelta::Percent(StatKind::AttackRange, 0.2)),
    ),
    BuffDef::stacking(
        "S02",
        "Quick Recovery",
        Common,
        Skill,
        8,
        BuffEffect::Stat(StatDelta::CooldownReduction(0.08)),
    ),
    BuffDef::unique(
        "S03",
        "Second Wind",
        Rare,
        Skill,
        BuffEffect::SkillEnhance(&[(SkillSlot::SpeedBoost, SkillField::DurationPercent, 0.5)]),
    ),
    BuffDef::unique(
        "S04",
        "Piercing Step",
        Rare,
        Skill,
        BuffEffect::SkillFlag(SkillFlag::DashPenetrate),
    ),
    BuffDef::unique(
        "S05",
        "Recoil Guard",
        Rare,
        Skill,
        BuffEffect::SkillEnhance(&[(SkillSlot::Shield, SkillField::Reflect, 1.0)]),
    ),
    BuffDef::unique(
        "S06",
        "Bulwark",
        Epic,
        Skill,
        BuffEffect::SkillEnhance(&[
            (SkillSlot::Shield, SkillField::Duration, 1.0),
            (SkillSlot::Shield, SkillField::Reflect, 0.5),
        ]),
    ),
    BuffDef::unique(
        "S07",
        "Thousand Swords",
        Legendary,
        Skill,
        BuffEffect::Trigger(Trigger::OnAttack(Proc {
            chance: 0.2,
            action: ProcAction::HomingSword,
        })),
    ),
    // Effect
    BuffDef::unique(
        "E01",
        "Chain Cutter",
        Common,
        Effect,
        BuffEffect::Conditional(ConditionalBonus {
            condition: Condition::ComboAtLeast(50),
            stat: StatKind::Attack,
            percent: 0.1,
        }),
    ),
    BuffDef::stacking(
        "E02",
        "Bloodthirst",
        Rare,
        Effect,
        5,
        BuffEffect::Trigger(Trigger::HealOnKill(2)),
    ),
    BuffDef::unique(
        "E03",
        "Overflow",
        Rare,
        Effect,
        BuffEffect::Trigger(Trigger::OnAttack(Proc {
            chance: 0.15,
            action: ProcAction::ExtraSlash,
        })),
    ),
    BuffDef::unique(
        "E04",
        "Executioner",
        Epic,
        Effect,
        BuffEffect::ExecuteBonus {
            enemy_hp_below: 0.3,
            bonus: 0.5,
        },
    ),
    BuffDef::unique("E05", "Unrivaled", Epic, Effect, BuffEffect::ComboInvincible(100)),
    BuffDef::unique(
        "E06",
        "Samsara",
        Legendary,
        Effect,
        BuffEffect::Trigger(Trigger::Revive(0.3)),
    ),
    BuffDef::unique(
        "E07",
        "Way of the Sword",
        Legendary,
        Effect,
        BuffEffect::MultiStat(&[StatDelta::SkillDamage(0.3), StatDelta::CooldownReduction(0.2)]),
    ),
    // Survival
    BuffDef::stacking("H01", "Vigor", Common, Survival, 10, flat(StatKind::MaxHp, 25.0)),
    BuffDef::stacking("H02", "Iron Shirt", Common, Survival, 10, flat(StatKind::Defense, 3.0)),
    BuffDef::stacking(
        "H03",
        "Renewal",
        Rare,
        Survival,
        5,
        BuffEffect::Stat(StatDelta::Regen(1.0)),
    ),
    BuffDef::stacking(
        "H04",
        "Leech",
        Rare,
        Survival,
        5,
        BuffEffect::Trigger(Trigger::Lifesteal(0.03)),
    ),
    BuffDef::unique(
        "H05",
        "Golden Bell",
        Epic,
        Survival,
        BuffEffect::Stat(StatDelta::DamageReduction(0.15)),
    ),
    BuffDef::unique(
        "H06",
        "Undying Body",
        Legendary,
        Survival,
        BuffEffect::LowHpGuard {
            hp_below: 0.1,
            reduction: 0.5,
        },
    ),
    // Attack-specific
    BuffDef::stacking(
        "AR1",
        "Split Shot",
        Rare,
        AttackSpecific,
        4,
        attack(Archetype::Arrow, &[AttackBuff::Multishot(1)]),
    ),
    BuffDef::stacking(
        "AR2",
        "Broadhead",
        Rare,
        AttackSpecific,
        3,
        attack(Archetype::Arrow, &[AttackBuff::Pierce(1)]),
    ),
    BuffDef::stacking(
        "SL1",
        "Wide Swing",
        Common,
        AttackSpecific,
        6,
        attack(Archetype::Slash, &[AttackBuff::Arc(std::f32::consts::FRAC_PI_6)]),
    ),
    BuffDef::stacking(
        "SL2",
        "Honed Blade",
        Rare,
        AttackSpecific,
        4,
        attack(Archetype::Slash, &[AttackBuff::Damage(0.25)]),
    ),
    BuffDef::stacking(
        "OR1",
        "Twin Orbs",
        Rare,
        AttackSpecific,
        3,
        attack(Archetype::Orb, &[AttackBuff::OrbCount(1)]),
    ),
    BuffDef::stacking(
        "OR2",
        "Seeker Core",
        Epic,
        AttackSpecific,
        2,
        attack(
            Archetype::Orb,
            &[AttackBuff::Pierce(1), AttackBuff::TrackingSpeed(0.2)],
        ),
    ),
    BuffDef::stacking(
        "WV1",
        "Echo",
        Rare,
        AttackSpecific,
        3,
        attack(Archetype::Wave, &[AttackBuff::WaveCount(1)]),
    ),
    BuffDef::stacking(
        "WV2",
        "Swell",
        Common,
        AttackSpecific,
        4,
        attack(Archetype::Wave, &[AttackBuff::Width(0.3)]),
    ),
    BuffDef::stacking(
        "LT1",
        "Forked Bolt",
        Rare,
        AttackSpecific,
        4,
        attack(Archetype::Lightning, &[AttackBuff::ChainCount(1)]),
    ),
    BuffDef::stacking(
        "LT2",
        "Conductor",
        Epic,
        AttackSpecific,
        2,
        attack(
            Archetype::Lightning,
            &[AttackBuff::ChainRange(0.25), AttackBuff::ChainDecay(0.05)],
        ),
    ),
    BuffDef::stacking(
        "SM1",
        "Legion",
        Epic,
        AttackSpecific,
        3,
        attack(Archetype::Summon, &[AttackBuff::SummonCount(1)]),
    ),
    BuffDef::stacking(
        "SM2",
        "Bound Spirits",
        Rare,
        AttackSpecific,
        3,
        attack(
            Archetype::Summon,
            &[AttackBuff::SummonDuration(0.3), AttackBuff::SummonAttackSpeed(0.2)],
        ),
    ),
    // Unlocked by the wave 20 milestone
    BuffDef::unique(
        "X01",
        "Warlord's Edge",
        Legendary,
        Attribute,
        BuffEffect::MultiStat(&[
            StatDelta::Percent(StatKind::Attack, 0.25),
            StatDelta::Flat(StatKind::CritChance, 0.1),
        ]),
    )
    .unlocks_at(20),
    BuffDef::unique(
        "X02",
        "Warlord's Heart",
        Legendary,
        Survival,
        BuffEffect::MultiStat(&[StatDelta::Percent(StatKind::MaxHp, 0.4), StatDelta::Regen(3.0)]),
    )
    .unlocks_at(20),
    BuffDef::unique(
        "X03",
        "Warlord's Tempo",
        Legendary,
        AttackSpecific,
        BuffEffect::AllAttacks(&[
            AttackBuff::Cooldown(0.15),
            AttackBuff::Range(0.15),
            AttackBuff::ProjectileSpeed(0.2),
        ]),
    )
    .unlocks_at(20),
];

/// Lookup table of obtainable buffs.
#[derive(Debug, Clone)]
pub struct BuffCatalog {
    defs: Vec<BuffDef>,
}

impl Default for BuffCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl BuffCatalog {
    /// The built-in catalog.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_defs(STANDARD.to_vec())
    }

    /// Catalog from explicit entries.
    #[must_use]
    pub fn from_defs(defs: Vec<BuffDef>) -> Self {
        Self { defs }
    }

    /// Entry by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&BuffDef> {
        self.defs.iter().find(|d| d.id.0 == id)
    }

    /// All entries.
    pub fn iter(&self) -> impl Iterator<Item = &BuffDef> {
        self.defs.iter()
    }

    /// Entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Check whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

// ============================================================================
// Rarity Rolls
// ============================================================================

/// Probability (or pity step) per non-common rarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RarityWeights {
    /// Rare
    pub rare: f32,
    /// Epic
    pub epic: f32,
    /// Legendary
    pub legendary: f32,
}

/// Base probabilities and pity steps for both roll kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RarityTable {
    /// Standard roll base chances (common takes the rest)
    pub standard: RarityWeights,
    /// Standard roll increase per pity point
    pub standard_pity: RarityWeights,
    /// Rare-or-better roll base chances (rare takes the rest)
    pub guaranteed: RarityWeights,
    /// Rare-or-better roll increase per pity point
    pub guaranteed_pity: RarityWeights,
}

impl Default for RarityTable {
    fn default() -> Self {
        Self {
            standard: RarityWeights {
                rare: 0.25,
                epic: 0.12,
                legendary: 0.03,
            },
            standard_pity: RarityWeights {
                rare: 0.04,
                epic: 0.015,
                legendary: 0.005,
            },
            guaranteed: RarityWeights {
                rare: 0.0,
                epic: 0.12,
                legendary: 0.03,
            },
            guaranteed_pity: RarityWeights {
                rare: 0.0,
                epic: 0.02,
                legendary: 0.01,
            },
        }
    }
}

impl RarityTable {
    /// Same base chances with pity disabled.
    #[must_use]
    pub fn without_pity(mut self) -> Self {
        let zero = RarityWeights {
            rare: 0.0,
            epic: 0.0,
            legendary: 0.0,
        };
        self.standard_pity = zero;
        self.guaranteed_pity = zero;
        self
    }
}

/// Misses since each rarity was last rolled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PityCounters {
    /// Rare
    pub rare: u32,
    /// Epic
    pub epic: u32,
    /// Legendary
    pub legendary: u32,
}

impl PityCounters {
    /// Reset the hit rarity and every non-common rarity below it; bump the rest.
    fn record(&mut self, hit: Rarity) {
        let bump = |counter: &mut u32, reset: bool| {
            if reset {
                *counter = 0;
            } else {
                *counter += 1;
            }
        };
        bump(&mut self.rare, hit >= Rarity::Rare);
        bump(&mut self.epic, hit >= Rarity::Epic);
        bump(&mut self.legendary, hit >= Rarity::Legendary);
    }
}

/// Floor on the rarity of the first offered slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollGuarantee {
    /// Normal odds.
    #[default]
    Standard,
    /// Rare, epic or legendary.
    RareOrBetter,
    /// Legendary.
    Legendary,
}

// ============================================================================
// Buff Engine
// ============================================================================

/// A held buff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveBuff {
    /// Buff id
    pub id: BuffId,
    /// Stacks held
    pub stacks: u32,
}

/// Held buffs, effect application and choice rolls for one run.
#[derive(Debug, Clone)]
pub struct BuffEngine {
    catalog: BuffCatalog,
    table: RarityTable,
    pity: PityCounters,
    active: Vec<ActiveBuff>,
    rng: fastrand::Rng,
}

impl BuffEngine {
    /// Engine over a catalog with its own RNG stream.
    #[must_use]
    pub fn new(catalog: BuffCatalog, table: RarityTable, rng: fastrand::Rng) -> Self {
        Self {
            catalog,
            table,
            pity: PityCounters::default(),
            active: Vec::new(),
            rng,
        }
    }

    /// Catalog in use.
    #[must_use]
    pub const fn catalog(&self) -> &BuffCatalog {
        &self.catalog
    }

    /// Current pity counters.
    #[must_use]
    pub const fn pity(&self) -> PityCounters {
        self.pity
    }

    /// Held buffs in acquisition order.
    #[must_use]
    pub fn active(&self) -> &[ActiveBuff] {
        &self.active
    }

    /// Stacks held of a buff.
    #[must_use]
    pub fn stacks(&self, id: &str) -> u32 {
        self.active
            .iter()
            .find(|b| b.id.0 == id)
            .map_or(0, |b| b.stacks)
    }

    /// Check whether a buff is held.
    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        self.stacks(id) > 0
    }

    /// Total stacks held across all buffs.
    #[must_use]
    pub fn total_stacks(&self) -> u32 {
        self.active.iter().map(|b| b.stacks).sum()
    }

    /// Add one stack of a buff and apply its effect once.
    ///
    /// Returns false for unknown ids, maxed or already-held unique buffs, and
    /// attack-specific buffs whose archetype is not equipped.
    pub fn add_buff(
        &mut self,
        id: &str,
        character: &mut Character,
        attacks: &mut AttackRegistry,
    ) -> bool {
        let Some(def) = self.catalog.get(id).copied() else {
            warn!(buff = id, "Unknown buff id");
            return false;
        };
        let held = self.stacks(id);
        if held >= def.stack_limit() {
            debug!(buff = id, stacks = held, "Buff rejected: at stack limit");
            return false;
        }
        if let Some(archetype) = def.effect.required_archetype() {
            if !attacks.has(archetype) {
                debug!(buff = id, attack = %archetype, "Buff rejected: archetype not equipped");
                return false;
            }
        }

        apply_effect(&def.effect, character, attacks);

        let stacks = held + 1;
        match self.active.iter_mut().find(|b| b.id == def.id) {
            Some(active) => active.stacks = stacks,
            None => self.active.push(ActiveBuff { id: def.id, stacks }),
        }
        debug_assert!(stacks <= def.stack_limit());
        info!(buff = %def.id, name = def.name, stacks, "Buff acquired");
        true
    }

    fn eligible(&self, def: &BuffDef, wave: u32, equipped: &[Archetype]) -> bool {
        def.unlock_wave <= wave
            && self.stacks(def.id.0) < def.stack_limit()
            && def
                .effect
                .required_archetype()
                .map_or(true, |a| equipped.contains(&a))
    }

    /// Offer up to three distinct buffs.
    ///
    /// The guarantee applies to the first slot only. When no eligible buff
    /// has the rolled rarity, any eligible buff is offered instead.
    pub fn roll_choices(
        &mut self,
        wave: u32,
        guarantee: RollGuarantee,
        equipped: &[Archetype],
    ) -> Vec<BuffId> {
        let mut choices: Vec<BuffId> = Vec::with_capacity(CHOICES_PER_ROLL);
        for slot in 0..CHOICES_PER_ROLL {
            let slot_guarantee = if slot == 0 {
                guarantee
            } else {
                RollGuarantee::Standard
            };
            let rarity = self.roll_rarity(slot_guarantee);

            let open: Vec<BuffId> = self
                .catalog
                .iter()
                .filter(|d| d.rarity == rarity)
                .filter(|d| !choices.contains(&d.id) && self.eligible(d, wave, equipped))
                .map(|d| d.id)
                .collect();
            let pool = if open.is_empty() {
                self.catalog
                    .iter()
                    .filter(|d| !choices.contains(&d.id) && self.eligible(d, wave, equipped))
                    .map(|d| d.id)
                    .collect()
            } else {
                open
            };
            if pool.is_empty() {
                break;
            }
            choices.push(pool[self.rng.usize(..pool.len())]);
        }
        debug!(wave, ?guarantee, choices = ?choices, "Rolled buff choices");
        choices
    }

    /// Draw a rarity and update the pity counters.
    pub fn roll_rarity(&mut self, guarantee: RollGuarantee) -> Rarity {
        let rarity = match guarantee {
            RollGuarantee::Legendary => Rarity::Legendary,
            RollGuarantee::RareOrBetter => {
                let chances = self.chances(self.table.guaranteed, self.table.guaranteed_pity);
                self.draw(chances, Rarity::Rare)
            }
            RollGuarantee::Standard => {
                let chances = self.chances(self.table.standard, self.table.standard_pity);
                self.draw(chances, Rarity::Common)
            }
        };
        self.pity.record(rarity);
        rarity
    }

    fn chances(&self, base: RarityWeights, step: RarityWeights) -> [(Rarity, f32); 3] {
        [
            (
                Rarity::Legendary,
                base.legendary + self.pity.legendary as f32 * step.legendary,
            ),
            (Rarity::Epic, base.epic + self.pity.epic as f32 * step.epic),
            (Rarity::Rare, base.rare + self.pity.rare as f32 * step.rare),
        ]
    }

    fn draw(&mut self, chances: [(Rarity, f32); 3], fallback: Rarity) -> Rarity {
        let mut roll = self.rng.f32();
        for (rarity, chance) in chances {
            if roll < chance {
                return rarity;
            }
            roll -= chance;
        }
        fallback
    }
}

fn apply_delta(delta: StatDelta, character: &mut Character) {
    let mods = &mut character.modifiers;
    match delta {
        StatDelta::Flat(stat, value) => mods.add_flat(stat, value),
        StatDelta::Percent(stat, value) => mods.add_percent(stat, value),
        StatDelta::CooldownReduction(value) => mods.cooldown_reduction += value,
        StatDelta::DamageReduction(value) => mods.damage_reduction += value,
        StatDelta::SkillDamage(value) => mods.skill_damage += value,
        StatDelta::Regen(value) => mods.regen_per_second += value,
    }
}

fn apply_effect(effect: &BuffEffect, character: &mut Character, attacks: &mut AttackRegistry) {
    match *effect {
        BuffEffect::Stat(delta) => apply_delta(delta, character),
        BuffEffect::MultiStat(deltas) => {
            for delta in deltas {
                apply_delta(*delta, character);
            }
        }
        BuffEffect::Trigger(trigger) => match trigger {
            Trigger::HealOnKill(amount) => character.modifiers.heal_on_kill += amount,
            Trigger::Lifesteal(fraction) => character.modifiers.lifesteal_percent += fraction,
            Trigger::Revive(fraction) => {
                character.modifiers.has_revive = true;
                character.modifiers.revive_fraction = fraction;
            }
            Trigger::OnAttack(proc_) => character.modifiers.add_proc(proc_),
        },
        BuffEffect::Conditional(bonus) => character.modifiers.add_conditional(bonus),
        BuffEffect::ExecuteBonus {
            enemy_hp_below,
            bonus,
        } => character.modifiers.add_execute_bonus(enemy_hp_below, bonus),
        BuffEffect::ComboInvincible(threshold) => {
            character.modifiers.combo_invincible_at = Some(threshold);
        }
        BuffEffect::LowHpGuard {
            hp_below,
            reduction,
        } => character.modifiers.add_low_hp_guard(hp_below, reduction),
        BuffEffect::SkillEnhance(changes) => {
            for &(slot, field, value) in changes {
                character.modifiers.add_skill_enhancement(slot, field, value);
            }
        }
        BuffEffect::SkillFlag(flag) => character.modifiers.set_skill_flag(flag),
        BuffEffect::AttackSpecific { archetype, buffs } => {
            for buff in buffs {
                attacks.apply_buff_to(archetype, *buff);
            }
        }
        BuffEffect::AllAttacks(buffs) => {
            for buff in buffs {
                attacks.apply_buff_to_all(*buff);
            }
        }
    }
    character.recompute_max_hp();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attacks::AttackKind;
    use crate::character::BaseStats;
    use crate::config::PlayerConfig;
    use crate::stats::StatModifiers;
    use glam::Vec2;
    use proptest::prelude::*;

    fn setup() -> (Character, AttackRegistry) {
        let base = BaseStats::from(&PlayerConfig::default());
        (
            Character::new(base, Vec2::ZERO, StatModifiers::default()),
            AttackRegistry::new(16, &base),
        )
    }

    fn engine() -> BuffEngine {
        BuffEngine::new(
            BuffCatalog::standard(),
            RarityTable::default(),
            fastrand::Rng::with_seed(11),
        )
    }

    #[test]
    fn test_standard_catalog_shape() {
        let catalog = BuffCatalog::standard();
        assert_eq!(catalog.len(), 42);
        assert_eq!(
            catalog
                .iter()
                .filter(|d| d.category == BuffCategory::AttackSpecific)
                .count(),
            13
        );
        assert_eq!(catalog.get("X01").unwrap().unlock_wave, 20);
        assert!(catalog.get("Z99").is_none());
    }

    #[test]
    fn test_stack_cap_of_three() {
        let capped = BuffDef::stacking(
            "T01",
            "Test",
            Common,
            Attribute,
            3,
            flat(StatKind::Attack, 1.0),
        );
        let mut engine = BuffEngine::new(
            BuffCatalog::from_defs(vec![capped]),
            RarityTable::default(),
            fastrand::Rng::with_seed(1),
        );
        let (mut character, mut attacks) = setup();
        for _ in 0..3 {
            assert!(engine.add_buff("T01", &mut character, &mut attacks));
        }
        assert!(!engine.add_buff("T01", &mut character, &mut attacks));
        assert_eq!(engine.stacks("T01"), 3);
        assert!((character.modifiers.flat(StatKind::Attack) - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unique_buff_once() {
        let mut engine = engine();
        let (mut character, mut attacks) = setup();
        assert!(engine.add_buff("H05", &mut character, &mut attacks));
        assert!(!engine.add_buff("H05", &mut character, &mut attacks));
        assert!((character.modifiers.damage_reduction - 0.15).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_id_is_no_op() {
        let mut engine = engine();
        let (mut character, mut attacks) = setup();
        assert!(!engine.add_buff("nope", &mut character, &mut attacks));
        assert!(engine.active().is_empty());
    }

    #[test]
    fn test_max_hp_buff_raises_current_hp() {
        let mut engine = engine();
        let (mut character, mut attacks) = setup();
        character.take_damage(30);
        assert!(engine.add_buff("A02", &mut character, &mut attacks));
        assert_eq!(character.max_hp(), 115);
        assert_eq!(character.hp(), 85);
    }

    #[test]
    fn test_attack_buff_needs_archetype() {
        let mut engine = engine();
        let (mut character, mut attacks) = setup();
        assert!(!engine.add_buff("AR2", &mut character, &mut attacks));
        attacks.equip(Archetype::Arrow);
        assert!(engine.add_buff("AR2", &mut character, &mut attacks));
        let AttackKind::Arrow(arrow) = attacks.get(Archetype::Arrow).unwrap().kind() else {
            panic!("wrong payload");
        };
        assert_eq!(arrow.pierce(), 1);
    }

    #[test]
    fn test_all_attacks_buff_reaches_every_equipped() {
        let mut engine = engine();
        let (mut character, mut attacks) = setup();
        attacks.equip(Archetype::Arrow);
        attacks.equip(Archetype::Slash);
        assert!(engine.add_buff("X03", &mut character, &mut attacks));

        for archetype in [Archetype::Arrow, Archetype::Slash] {
            let core = attacks.get(archetype).unwrap().core();
            assert!((core.cooldown_reduction() - 0.15).abs() < 1e-6);
        }
        let slash = attacks.get(Archetype::Slash).unwrap().core();
        // 80 * 1.15
        assert!((slash.computed_range(1.0) - 92.0).abs() < 1e-3);
        let AttackKind::Arrow(arrow) = attacks.get(Archetype::Arrow).unwrap().kind() else {
            panic!("wrong payload");
        };
        // 500 * 1.2
        assert!((arrow.speed() - 600.0).abs() < 1e-3);
    }

    #[test]
    fn test_choices_are_distinct_and_filtered() {
        let mut engine = engine();
        for _ in 0..200 {
            let choices = engine.roll_choices(1, RollGuarantee::Standard, &[Archetype::Slash]);
            assert_eq!(choices.len(), 3);
            assert_ne!(choices[0], choices[1]);
            assert_ne!(choices[1], choices[2]);
            assert_ne!(choices[0], choices[2]);
            for id in choices {
                let def = engine.catalog().get(id.0).unwrap();
                assert_eq!(def.unlock_wave, 0);
                if let Some(archetype) = def.effect.required_archetype() {
                    assert_eq!(archetype, Archetype::Slash);
                }
            }
        }
    }

    #[test]
    fn test_choices_degrade_when_pool_small() {
        let only = vec![
            BuffDef::unique("U1", "One", Legendary, Effect, flat(StatKind::Attack, 1.0)),
            BuffDef::unique("U2", "Two", Legendary, Effect, flat(StatKind::Attack, 1.0)),
        ];
        let mut engine = BuffEngine::new(
            BuffCatalog::from_defs(only),
            RarityTable::default(),
            fastrand::Rng::with_seed(3),
        );
        let choices = engine.roll_choices(1, RollGuarantee::Standard, &[]);
        assert_eq!(choices.len(), 2);
        assert_ne!(choices[0], choices[1]);
    }

    #[test]
    fn test_legendary_guarantee_on_first_slot() {
        let mut engine = engine();
        let choices = engine.roll_choices(10, RollGuarantee::Legendary, &[]);
        let first = engine.catalog().get(choices[0].0).unwrap();
        assert_eq!(first.rarity, Legendary);
    }

    #[test]
    fn test_rare_or_better_never_common() {
        let mut engine = engine();
        for _ in 0..1000 {
            assert_ne!(engine.roll_rarity(RollGuarantee::RareOrBetter), Common);
        }
    }

    #[test]
    fn test_legendary_frequency_without_pity() {
        let mut engine = BuffEngine::new(
            BuffCatalog::standard(),
            RarityTable::default().without_pity(),
            fastrand::Rng::with_seed(2024),
        );
        let rolls = 100_000;
        let legendary = (0..rolls)
            .filter(|_| engine.roll_rarity(RollGuarantee::Standard) == Legendary)
            .count();
        let frequency = legendary as f64 / f64::from(rolls);
        assert!((frequency - 0.03).abs() < 0.003, "frequency {frequency}");
    }

    #[test]
    fn test_pity_counters() {
        let mut pity = PityCounters::default();
        pity.record(Common);
        pity.record(Common);
        assert_eq!(
            pity,
            PityCounters {
                rare: 2,
                epic: 2,
                legendary: 2
            }
        );
        pity.record(Epic);
        assert_eq!(
            pity,
            PityCounters {
                rare: 0,
                epic: 0,
                legendary: 3
            }
        );
        pity.record(Legendary);
        assert_eq!(pity, PityCounters::default());
    }

    proptest! {
        #[test]
        fn prop_stacks_never_exceed_limit(picks in proptest::collection::vec(0usize..42, 0..200)) {
            let mut engine = engine();
            let (mut character, mut attacks) = setup();
            for archetype in Archetype::ALL {
                attacks.equip(archetype);
            }
            let ids: Vec<&'static str> = engine.catalog().iter().map(|d| d.id.0).collect();
            for pick in picks {
                engine.add_buff(ids[pick], &mut character, &mut attacks);
            }
            for active in engine.active() {
                let def = engine.catalog().get(active.id.0).unwrap();
                prop_assert!(active.stacks <= def.stack_limit());
            }
        }
    }
}
