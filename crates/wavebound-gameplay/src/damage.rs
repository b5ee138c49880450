//! Damage resolution.
//!
//! This module provides:
//! - Outgoing damage with combo multiplier and a crit roll
//! - Incoming damage after percent reduction and defense
//! - Knockback impulses and their expiry tracking
//!
//! The crit roll is the only random input and comes from an injected RNG.

use ahash::AHashMap;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use wavebound_common::EnemyHandle;

use crate::config::CombatConfig;
use crate::spatial::EnemyWorld;

/// Tolerance added before flooring so `f32` inputs like 0.2 floor the way
/// their decimal values would.
const FLOOR_EPSILON: f64 = 1e-6;

// ============================================================================
// Outgoing Damage
// ============================================================================

/// Result of one outgoing damage roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRoll {
    /// Final integer damage
    pub amount: i32,
    /// Whether the crit roll succeeded
    pub is_crit: bool,
}

/// Turns base damage into final damage.
#[derive(Debug, Clone)]
pub struct DamageResolver {
    rng: fastrand::Rng,
    reduction_cap: f32,
    defense_constant: f32,
    knockback_force: f32,
}

impl DamageResolver {
    /// Create a resolver that rolls crits from `rng`.
    #[must_use]
    pub fn new(rng: fastrand::Rng) -> Self {
        Self::from_config(rng, &CombatConfig::default())
    }

    /// Create a resolver with explicit tuning.
    #[must_use]
    pub fn from_config(rng: fastrand::Rng, config: &CombatConfig) -> Self {
        Self {
            rng,
            reduction_cap: config.reduction_cap,
            defense_constant: config.defense_constant,
            knockback_force: config.knockback_force,
        }
    }

    /// Roll final damage.
    ///
    /// `floor(base * combo * (crit ? crit_multiplier : 1))`, with one
    /// Bernoulli draw at `crit_chance`.
    pub fn compute_damage(
        &mut self,
        base: f32,
        combo_multiplier: f32,
        crit_chance: f32,
        crit_multiplier: f32,
    ) -> DamageRoll {
        let is_crit = crit_chance > 0.0 && self.rng.f32() < crit_chance;
        let crit = if is_crit { f64::from(crit_multiplier) } else { 1.0 };
        let raw = f64::from(base) * f64::from(combo_multiplier) * crit;
        DamageRoll {
            amount: (raw.max(0.0) + FLOOR_EPSILON).floor() as i32,
            is_crit,
        }
    }

    /// Damage left after reduction and defense.
    ///
    /// `floor(incoming * (1 - min(reduction, cap)) * (1 - def / (def + k)))`
    #[must_use]
    pub fn compute_damage_taken(&self, incoming: i32, reduction: f32, defense: f32) -> i32 {
        damage_taken(
            incoming,
            reduction,
            defense,
            self.reduction_cap,
            self.defense_constant,
        )
    }

    /// Impulse pushing `target` away from `source` with the configured force.
    #[must_use]
    pub fn compute_knockback(&self, target: Vec2, source: Vec2) -> Vec2 {
        compute_knockback(target, source, self.knockback_force)
    }

    /// Configured knockback force.
    #[must_use]
    pub const fn knockback_force(&self) -> f32 {
        self.knockback_force
    }

    /// Draw from the resolver's RNG (proc rolls share the crit stream).
    pub fn chance(&mut self, probability: f32) -> bool {
        probability > 0.0 && self.rng.f32() < probability
    }
}

/// Incoming damage formula with explicit constants.
#[must_use]
pub fn damage_taken(
    incoming: i32,
    reduction: f32,
    defense: f32,
    reduction_cap: f32,
    defense_constant: f32,
) -> i32 {
    let reduction = f64::from(reduction.clamp(0.0, reduction_cap));
    let defense = f64::from(defense.max(0.0));
    let defense_factor = 1.0 - defense / (defense + f64::from(defense_constant));
    let raw = f64::from(incoming.max(0)) * (1.0 - reduction) * defense_factor;
    (raw + FLOOR_EPSILON).floor() as i32
}

/// Unit direction from `source` to `target` scaled by `force`.
///
/// Coincident points push along +x.
#[must_use]
pub fn compute_knockback(target: Vec2, source: Vec2, force: f32) -> Vec2 {
    let dir = (target - source).try_normalize().unwrap_or(Vec2::X);
    dir * force
}

// ============================================================================
// Knockback Tracking
// ============================================================================

/// Knockback windows per enemy.
///
/// While a window is open the enemy's AI must not steer it. On expiry the
/// velocity is zeroed and the AI re-acquires motion on its next think.
#[derive(Debug, Clone, Default)]
pub struct KnockbackTracker {
    active: AHashMap<EnemyHandle, f32>,
    duration: f32,
}

impl KnockbackTracker {
    /// Create a tracker with the given window length.
    #[must_use]
    pub fn new(duration: f32) -> Self {
        Self {
            active: AHashMap::new(),
            duration,
        }
    }

    /// Push an enemy: set its velocity and open a window.
    pub fn apply(&mut self, world: &mut dyn EnemyWorld, handle: EnemyHandle, impulse: Vec2) {
        world.set_velocity(handle, impulse);
        self.active.insert(handle, self.duration);
    }

    /// Check whether an enemy is currently being knocked back.
    #[must_use]
    pub fn is_active(&self, handle: EnemyHandle) -> bool {
        self.active.contains_key(&handle)
    }

    /// Forget an enemy (died or recycled).
    pub fn forget(&mut self, handle: EnemyHandle) {
        self.active.remove(&handle);
    }

    /// Advance windows and zero the velocity of expired ones.
    pub fn update(&mut self, dt: f32, world: &mut dyn EnemyWorld) {
        let mut expired = Vec::new();
        for (handle, remaining) in &mut self.active {
            *remaining -= dt;
            if *remaining <= 0.0 {
                expired.push(*handle);
            }
        }
        for handle in expired {
            self.active.remove(&handle);
            world.set_velocity(handle, Vec2::ZERO);
        }
    }

    /// Number of open windows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Check whether no window is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemy::{EnemyKind, EnemyTypeConfig};
    use crate::spatial::{EnemyPool, Spawner};
    use proptest::prelude::*;

    #[test]
    fn test_no_crit_at_zero_chance() {
        let mut resolver = DamageResolver::new(fastrand::Rng::with_seed(1));
        for _ in 0..1000 {
            let roll = resolver.compute_damage(100.0, 1.0, 0.0, 2.0);
            assert_eq!(
                roll,
                DamageRoll {
                    amount: 100,
                    is_crit: false
                }
            );
        }
    }

    #[test]
    fn test_always_crit_at_full_chance() {
        let mut resolver = DamageResolver::new(fastrand::Rng::with_seed(2));
        for _ in 0..1000 {
            let roll = resolver.compute_damage(100.0, 1.0, 1.0, 2.0);
            assert_eq!(
                roll,
                DamageRoll {
                    amount: 200,
                    is_crit: true
                }
            );
        }
    }

    #[test]
    fn test_combo_multiplier_floors() {
        let mut resolver = DamageResolver::new(fastrand::Rng::with_seed(3));
        // 15 * 1.05 = 15.75
        assert_eq!(resolver.compute_damage(15.0, 1.05, 0.0, 1.5).amount, 15);
    }

    #[test]
    fn test_damage_taken_reduction() {
        let resolver = DamageResolver::new(fastrand::Rng::with_seed(4));
        assert_eq!(resolver.compute_damage_taken(50, 0.2, 0.0), 40);
    }

    #[test]
    fn test_damage_taken_defense_and_cap() {
        let resolver = DamageResolver::new(fastrand::Rng::with_seed(5));
        // def 50: factor 0.5
        assert_eq!(resolver.compute_damage_taken(100, 0.0, 50.0), 50);
        // reduction 0.9 clamps to 0.75
        assert_eq!(resolver.compute_damage_taken(100, 0.9, 0.0), 25);
    }

    #[test]
    fn test_knockback_direction() {
        let impulse = compute_knockback(Vec2::new(10.0, 0.0), Vec2::ZERO, 200.0);
        assert!((impulse - Vec2::new(200.0, 0.0)).length() < 1e-4);

        let coincident = compute_knockback(Vec2::ONE, Vec2::ONE, 50.0);
        assert!((coincident.length() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_knockback_zeroes_velocity_on_expiry() {
        let mut world = EnemyPool::new(8);
        let handle = world
            .spawn_enemy(Vec2::new(100.0, 100.0), &EnemyTypeConfig::base(EnemyKind::Shadow))
            .unwrap();
        let mut tracker = KnockbackTracker::new(0.15);

        tracker.apply(&mut world, handle, Vec2::new(200.0, 0.0));
        assert!(tracker.is_active(handle));
        assert_eq!(world.velocity(handle), Some(Vec2::new(200.0, 0.0)));

        tracker.update(0.1, &mut world);
        assert!(tracker.is_active(handle));

        tracker.update(0.1, &mut world);
        assert!(!tracker.is_active(handle));
        assert_eq!(world.velocity(handle), Some(Vec2::ZERO));
    }

    proptest! {
        #[test]
        fn prop_damage_taken_never_exceeds_incoming(
            incoming in 0i32..10_000,
            reduction in 0.0f32..2.0,
            defense in 0.0f32..500.0,
        ) {
            let taken = damage_taken(incoming, reduction, defense, 0.75, 50.0);
            prop_assert!(taken >= 0);
            prop_assert!(taken <= incoming);
        }
    }
}
