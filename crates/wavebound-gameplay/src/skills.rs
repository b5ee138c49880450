//! Active skills.
//!
//! Four fixed slots, each with its own cooldown and active window:
//! - Speed boost: temporary speed multiplier, restored exactly on expiry
//! - Dash: teleport along facing, clamped to the world, briefly invulnerable
//! - Shield: full damage immunity for a duration
//! - Heal: instant heal by a fraction of max HP
//!
//! Slots share no state. A cast on cooldown is rejected without cost.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wavebound_common::{direction, WorldBounds};

use crate::character::Character;
use crate::config::SkillConfig;
use crate::spatial::EnemySnapshot;

// ============================================================================
// Slots, Fields, Flags
// ============================================================================

/// Skill slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillSlot {
    /// Temporary speed multiplier.
    SpeedBoost,
    /// Short teleport.
    Dash,
    /// Damage immunity window.
    Shield,
    /// Instant heal.
    Heal,
}

impl SkillSlot {
    /// All slots in binding order.
    pub const ALL: [Self; 4] = [Self::SpeedBoost, Self::Dash, Self::Shield, Self::Heal];

    /// Position in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::SpeedBoost => 0,
            Self::Dash => 1,
            Self::Shield => 2,
            Self::Heal => 3,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SpeedBoost => "speed_boost",
            Self::Dash => "dash",
            Self::Shield => "shield",
            Self::Heal => "heal",
        }
    }
}

/// Numeric skill parameters buffs can enhance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillField {
    /// Seconds added to the active window.
    Duration,
    /// Fraction added to the active window.
    DurationPercent,
    /// Units added to the dash.
    Distance,
    /// Fraction of max HP added to the heal.
    HealPercent,
    /// Fraction of blocked contact damage returned to the attacker.
    Reflect,
}

/// Behavior switches buffs can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillFlag {
    /// Dash damages every enemy along its path.
    DashPenetrate,
}

// ============================================================================
// Controller
// ============================================================================

/// What a successful cast did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SkillEffect {
    /// Speed multiplied for a duration.
    SpeedBoost {
        /// Multiplier applied
        multiplier: f32,
        /// Seconds
        duration: f32,
    },
    /// Teleported.
    Dash {
        /// Start position
        from: Vec2,
        /// End position after clamping
        to: Vec2,
    },
    /// Immune for a duration.
    Shield {
        /// Seconds
        duration: f32,
    },
    /// Healed.
    Heal {
        /// HP actually restored
        amount: i32,
    },
}

/// Per-slot UI state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillStatus {
    /// Slot
    pub slot: SkillSlot,
    /// Full cooldown
    pub cooldown: f32,
    /// Cooldown left
    pub remaining: f32,
    /// Castable now
    pub ready: bool,
    /// Effect currently running
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SlotState {
    cooldown: f32,
    active: f32,
}

/// Cooldowns and active windows for the four skills.
#[derive(Debug, Clone)]
pub struct SkillController {
    config: SkillConfig,
    slots: [SlotState; 4],
    restore_speed: Option<f32>,
}

impl SkillController {
    /// Create a controller with every slot ready.
    #[must_use]
    pub fn new(config: SkillConfig) -> Self {
        Self {
            config,
            slots: [SlotState::default(); 4],
            restore_speed: None,
        }
    }

    /// Full cooldown of a slot.
    #[must_use]
    pub fn cooldown(&self, slot: SkillSlot) -> f32 {
        match slot {
            SkillSlot::SpeedBoost => self.config.speed_boost_cooldown,
            SkillSlot::Dash => self.config.dash_cooldown,
            SkillSlot::Shield => self.config.shield_cooldown,
            SkillSlot::Heal => self.config.heal_cooldown,
        }
    }

    /// Cooldown left on a slot.
    #[must_use]
    pub fn remaining(&self, slot: SkillSlot) -> f32 {
        self.slots[slot.index()].cooldown
    }

    /// Check whether a slot can be cast.
    #[must_use]
    pub fn is_ready(&self, slot: SkillSlot) -> bool {
        self.slots[slot.index()].cooldown <= 0.0
    }

    /// Check whether a slot's effect is running.
    #[must_use]
    pub fn is_active(&self, slot: SkillSlot) -> bool {
        self.slots[slot.index()].active > 0.0
    }

    /// Check whether the shield is up.
    #[must_use]
    pub fn is_shielded(&self) -> bool {
        self.is_active(SkillSlot::Shield)
    }

    /// Tuning in use.
    #[must_use]
    pub const fn config(&self) -> &SkillConfig {
        &self.config
    }

    /// Cast a skill. Returns `None` if the slot is cooling down.
    pub fn cast(
        &mut self,
        slot: SkillSlot,
        character: &mut Character,
        bounds: &WorldBounds,
        margin: f32,
    ) -> Option<SkillEffect> {
        if !self.is_ready(slot) {
            return None;
        }
        let cooldown = self.cooldown(slot);
        self.slots[slot.index()].cooldown = cooldown;

        let mods = &character.modifiers;
        let effect = match slot {
            SkillSlot::SpeedBoost => {
                let duration = (self.config.speed_boost_duration
                    + mods.skill_enhancement(slot, SkillField::Duration))
                    * (1.0 + mods.skill_enhancement(slot, SkillField::DurationPercent));
                let multiplier = self.config.speed_boost_multiplier;
                if self.restore_speed.is_none() {
                    let original = character.speed_multiplier();
                    self.restore_speed = Some(original);
                    character.set_speed_multiplier(original * multiplier);
                }
                self.slots[slot.index()].active = duration;
                SkillEffect::SpeedBoost {
                    multiplier,
                    duration,
                }
            }
            SkillSlot::Dash => {
                let distance =
                    self.config.dash_distance + mods.skill_enhancement(slot, SkillField::Distance);
                let from = character.position;
                character.teleport(from + direction(character.facing) * distance, bounds, margin);
                let window = self.config.dash_duration;
                self.slots[slot.index()].active = window;
                character.grant_invincibility(window + self.config.trailing_invincibility);
                SkillEffect::Dash {
                    from,
                    to: character.position,
                }
            }
            SkillSlot::Shield => {
                let duration =
                    self.config.shield_duration + mods.skill_enhancement(slot, SkillField::Duration);
                self.slots[slot.index()].active = duration;
                character.grant_invincibility(duration + self.config.trailing_invincibility);
                SkillEffect::Shield { duration }
            }
            SkillSlot::Heal => {
                let percent =
                    self.config.heal_percent + mods.skill_enhancement(slot, SkillField::HealPercent);
                let amount = (character.max_hp() as f32 * percent).floor() as i32;
                SkillEffect::Heal {
                    amount: character.heal(amount),
                }
            }
        };
        debug!(skill = slot.name(), cooldown, "skill cast");
        Some(effect)
    }

    /// Advance cooldowns and active windows.
    ///
    /// Returns the slots that came off cooldown this step.
    pub fn update(&mut self, dt: f32, character: &mut Character) -> Vec<SkillSlot> {
        let mut ready = Vec::new();
        for slot in SkillSlot::ALL {
            let state = &mut self.slots[slot.index()];
            if state.cooldown > 0.0 {
                state.cooldown = (state.cooldown - dt).max(0.0);
                if state.cooldown <= 0.0 {
                    ready.push(slot);
                }
            }
            if state.active > 0.0 {
                state.active = (state.active - dt).max(0.0);
                if state.active <= 0.0 && slot == SkillSlot::SpeedBoost {
                    if let Some(original) = self.restore_speed.take() {
                        character.set_speed_multiplier(original);
                    }
                }
            }
        }
        ready
    }

    /// Reflect fraction while the shield is up.
    #[must_use]
    pub fn reflect_fraction(&self, character: &Character) -> f32 {
        if !self.is_shielded() {
            return 0.0;
        }
        character
            .modifiers
            .skill_enhancement(SkillSlot::Shield, SkillField::Reflect)
    }

    /// UI state for every slot.
    #[must_use]
    pub fn statuses(&self) -> [SkillStatus; 4] {
        SkillSlot::ALL.map(|slot| SkillStatus {
            slot,
            cooldown: self.cooldown(slot),
            remaining: self.remaining(slot),
            ready: self.is_ready(slot),
            active: self.is_active(slot),
        })
    }
}

/// Enemies whose circle touches the dash segment widened by `width`.
#[must_use]
pub fn dash_sweep(from: Vec2, to: Vec2, width: f32, enemies: &[EnemySnapshot]) -> Vec<EnemySnapshot> {
    let segment = to - from;
    let length_sq = segment.length_squared();
    enemies
        .iter()
        .filter(|enemy| {
            let t = if length_sq > 0.0 {
                ((enemy.position - from).dot(segment) / length_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let closest = from + segment * t;
            closest.distance(enemy.position) <= width + enemy.size
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::BaseStats;
    use crate::config::PlayerConfig;
    use crate::enemy::EnemyKind;
    use crate::stats::StatModifiers;
    use wavebound_common::EnemyHandle;

    fn character_at(position: Vec2) -> Character {
        Character::new(
            BaseStats::from(&PlayerConfig::default()),
            position,
            StatModifiers::default(),
        )
    }

    fn bounds() -> WorldBounds {
        WorldBounds::new(2000.0, 2000.0)
    }

    #[test]
    fn test_cast_on_cooldown_is_rejected() {
        let mut skills = SkillController::new(SkillConfig::default());
        let mut c = character_at(Vec2::splat(1000.0));
        assert!(skills.cast(SkillSlot::Heal, &mut c, &bounds(), 50.0).is_some());
        assert!(skills.cast(SkillSlot::Heal, &mut c, &bounds(), 50.0).is_none());
        assert!((skills.remaining(SkillSlot::Heal) - 15.0).abs() < 1e-6);
        // Other slots are independent
        assert!(skills.is_ready(SkillSlot::Dash));
    }

    #[test]
    fn test_speed_boost_restores_exactly() {
        let mut skills = SkillController::new(SkillConfig::default());
        let mut c = character_at(Vec2::splat(1000.0));
        let before = c.speed();

        skills.cast(SkillSlot::SpeedBoost, &mut c, &bounds(), 50.0);
        assert!((c.speed() - before * 1.5).abs() < 1e-3);

        skills.update(2.9, &mut c);
        assert!(skills.is_active(SkillSlot::SpeedBoost));
        skills.update(0.2, &mut c);
        assert!(!skills.is_active(SkillSlot::SpeedBoost));
        assert!((c.speed() - before).abs() < 1e-6);
    }

    #[test]
    fn test_speed_boost_duration_enhancement() {
        let mut skills = SkillController::new(SkillConfig::default());
        let mut c = character_at(Vec2::splat(1000.0));
        c.modifiers
            .add_skill_enhancement(SkillSlot::SpeedBoost, SkillField::DurationPercent, 0.5);
        match skills.cast(SkillSlot::SpeedBoost, &mut c, &bounds(), 50.0) {
            Some(SkillEffect::SpeedBoost { duration, .. }) => assert!((duration - 4.5).abs() < 1e-5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_dash_clamps_to_world() {
        let mut skills = SkillController::new(SkillConfig::default());
        let mut c = character_at(Vec2::new(1900.0, 1000.0));
        c.facing = 0.0;
        let effect = skills.cast(SkillSlot::Dash, &mut c, &bounds(), 50.0).unwrap();
        assert_eq!(
            effect,
            SkillEffect::Dash {
                from: Vec2::new(1900.0, 1000.0),
                to: Vec2::new(1950.0, 1000.0),
            }
        );
        assert!(c.is_invincible());
        skills.update(0.3, &mut c);
        c.update(0.36);
        assert!(!c.is_invincible());
    }

    #[test]
    fn test_shield_blocks_then_lapses() {
        let mut skills = SkillController::new(SkillConfig::default());
        let mut c = character_at(Vec2::splat(1000.0));
        skills.cast(SkillSlot::Shield, &mut c, &bounds(), 50.0);
        assert!(skills.is_shielded());
        assert!(c.is_invincible());

        skills.update(2.0, &mut c);
        c.update(2.0);
        assert!(!skills.is_shielded());
        // Trailing window still up
        assert!(c.is_invincible());
        c.update(0.25);
        assert!(!c.is_invincible());
    }

    #[test]
    fn test_heal_percent_of_max() {
        let mut skills = SkillController::new(SkillConfig::default());
        let mut c = character_at(Vec2::splat(1000.0));
        c.take_damage(60);
        let effect = skills.cast(SkillSlot::Heal, &mut c, &bounds(), 50.0);
        assert_eq!(effect, Some(SkillEffect::Heal { amount: 30 }));
        assert_eq!(c.hp(), 70);
    }

    #[test]
    fn test_update_reports_ready_once() {
        let mut skills = SkillController::new(SkillConfig::default());
        let mut c = character_at(Vec2::splat(1000.0));
        skills.cast(SkillSlot::Dash, &mut c, &bounds(), 50.0);
        assert!(skills.update(2.0, &mut c).is_empty());
        assert_eq!(skills.update(1.5, &mut c), vec![SkillSlot::Dash]);
        assert!(skills.update(1.0, &mut c).is_empty());
        assert!(skills.remaining(SkillSlot::Dash) >= 0.0);
    }

    #[test]
    fn test_reflect_only_while_shielded() {
        let mut skills = SkillController::new(SkillConfig::default());
        let mut c = character_at(Vec2::splat(1000.0));
        c.modifiers
            .add_skill_enhancement(SkillSlot::Shield, SkillField::Reflect, 1.0);
        assert!(skills.reflect_fraction(&c).abs() < 1e-6);
        skills.cast(SkillSlot::Shield, &mut c, &bounds(), 50.0);
        assert!((skills.reflect_fraction(&c) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dash_sweep_hits_path_only() {
        let snapshot = |index: u32, position: Vec2| EnemySnapshot {
            handle: EnemyHandle::new(index, 0),
            kind: EnemyKind::Shadow,
            position,
            velocity: Vec2::ZERO,
            hp: 30,
            max_hp: 30,
            atk: 10,
            speed: 80.0,
            size: 18.0,
            split_child: false,
        };
        let enemies = [
            snapshot(0, Vec2::new(50.0, 10.0)),
            snapshot(1, Vec2::new(50.0, 100.0)),
            snapshot(2, Vec2::new(-60.0, 0.0)),
        ];
        let hit = dash_sweep(Vec2::ZERO, Vec2::new(150.0, 0.0), 24.0, &enemies);
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].handle, EnemyHandle::new(0, 0));
    }
}
