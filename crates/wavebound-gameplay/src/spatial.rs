//! Seams to the external physics and spawner.
//!
//! The combat core only sees plain position/velocity data through these
//! traits. [`EnemyPool`] is the in-process implementation used by the
//! headless runner, benches, and tests.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;
use wavebound_common::{circles_overlap, EnemyHandle, WorldBounds};

use crate::enemy::{Enemy, EnemyKind, EnemyTypeConfig};
use crate::pool::Pool;

/// Plain-data view of a live enemy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    /// Handle
    pub handle: EnemyHandle,
    /// Archetype
    pub kind: EnemyKind,
    /// Position
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Current HP
    pub hp: i32,
    /// Max HP
    pub max_hp: i32,
    /// Attack
    pub atk: i32,
    /// Movement speed
    pub speed: f32,
    /// Collision radius
    pub size: f32,
    /// Spawned by a split
    pub split_child: bool,
}

impl EnemySnapshot {
    /// HP as a fraction of max HP.
    #[must_use]
    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        self.hp as f32 / self.max_hp as f32
    }
}

/// Result of applying damage to an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// The handle no longer refers to a live enemy.
    Missing,
    /// The enemy survived.
    Hit {
        /// HP after the hit
        remaining: i32,
    },
    /// The enemy died and was removed from all queries.
    Killed,
}

/// Read-only spatial queries.
pub trait EnemyQuery {
    /// All live enemies.
    fn active_enemies(&self) -> Vec<EnemySnapshot>;

    /// One live enemy.
    fn snapshot(&self, handle: EnemyHandle) -> Option<EnemySnapshot>;

    /// Live enemies whose circle overlaps the given circle.
    fn overlapping(&self, center: Vec2, radius: f32) -> Vec<EnemySnapshot> {
        self.active_enemies()
            .into_iter()
            .filter(|e| circles_overlap(center, radius, e.position, e.size))
            .collect()
    }
}

/// Mutable access the combat core needs.
pub trait EnemyWorld: EnemyQuery {
    /// Set an enemy's velocity.
    fn set_velocity(&mut self, handle: EnemyHandle, velocity: Vec2);

    /// Subtract HP. Killed enemies must leave every query immediately.
    fn apply_damage(&mut self, handle: EnemyHandle, amount: i32) -> DamageOutcome;

    /// Move enemies along their velocities. Hosts that run their own
    /// physics keep the default no-op.
    fn step(&mut self, _dt: f32, _bounds: &WorldBounds) {}
}

/// Enemy creation and teardown.
pub trait Spawner: EnemyQuery {
    /// Create an enemy. Returns `None` if the request was dropped.
    fn spawn_enemy(&mut self, position: Vec2, config: &EnemyTypeConfig) -> Option<EnemyHandle>;

    /// Remove every enemy.
    fn clear_all(&mut self);
}

/// Nearest enemy to `from` strictly closer than `max_distance`, skipping
/// any handle `exclude` rejects.
pub fn nearest_enemy(
    enemies: &[EnemySnapshot],
    from: Vec2,
    max_distance: f32,
    mut exclude: impl FnMut(EnemyHandle) -> bool,
) -> Option<EnemySnapshot> {
    let mut best: Option<(f32, EnemySnapshot)> = None;
    for enemy in enemies {
        if exclude(enemy.handle) {
            continue;
        }
        let d = enemy.position.distance(from);
        if d < max_distance && best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, *enemy));
        }
    }
    best.map(|(_, e)| e)
}

// ============================================================================
// Built-in World
// ============================================================================

/// In-process enemy store backed by a [`Pool`].
#[derive(Debug, Clone)]
pub struct EnemyPool {
    enemies: Pool<Enemy>,
}

impl EnemyPool {
    /// Create a store holding at most `capacity` live enemies.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            enemies: Pool::new(capacity),
        }
    }

    /// Current velocity of an enemy.
    #[must_use]
    pub fn velocity(&self, handle: EnemyHandle) -> Option<Vec2> {
        self.enemies.get(handle.key()).map(|e| e.velocity)
    }

    /// Move every enemy along its velocity, clamped to the world.
    pub fn integrate(&mut self, dt: f32, bounds: &WorldBounds) {
        for (_, enemy) in self.enemies.iter_mut() {
            enemy.position = bounds.clamp(enemy.position + enemy.velocity * dt, enemy.size);
        }
    }

    /// Number of live enemies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    /// Check whether no enemy is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    /// Spawn requests dropped at capacity.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.enemies.dropped()
    }

    fn to_snapshot(handle: EnemyHandle, enemy: &Enemy) -> EnemySnapshot {
        EnemySnapshot {
            handle,
            kind: enemy.kind,
            position: enemy.position,
            velocity: enemy.velocity,
            hp: enemy.hp,
            max_hp: enemy.max_hp,
            atk: enemy.atk,
            speed: enemy.speed,
            size: enemy.size,
            split_child: enemy.split_child,
        }
    }
}

impl EnemyQuery for EnemyPool {
    fn active_enemies(&self) -> Vec<EnemySnapshot> {
        self.enemies
            .iter()
            .map(|(key, e)| Self::to_snapshot(EnemyHandle::from_key(key), e))
            .collect()
    }

    fn snapshot(&self, handle: EnemyHandle) -> Option<EnemySnapshot> {
        self.enemies
            .get(handle.key())
            .map(|e| Self::to_snapshot(handle, e))
    }
}

impl EnemyWorld for EnemyPool {
    fn set_velocity(&mut self, handle: EnemyHandle, velocity: Vec2) {
        if let Some(enemy) = self.enemies.get_mut(handle.key()) {
            enemy.velocity = velocity;
        }
    }

    fn apply_damage(&mut self, handle: EnemyHandle, amount: i32) -> DamageOutcome {
        let Some(enemy) = self.enemies.get_mut(handle.key()) else {
            return DamageOutcome::Missing;
        };
        enemy.hp -= amount.max(0);
        if enemy.hp > 0 {
            return DamageOutcome::Hit {
                remaining: enemy.hp,
            };
        }
        trace!(%handle, "enemy killed");
        self.enemies.release(handle.key());
        DamageOutcome::Killed
    }

    fn step(&mut self, dt: f32, bounds: &WorldBounds) {
        self.integrate(dt, bounds);
    }
}

impl Spawner for EnemyPool {
    fn spawn_enemy(&mut self, position: Vec2, config: &EnemyTypeConfig) -> Option<EnemyHandle> {
        let (key, enemy) = self.enemies.acquire()?;
        enemy.spawn(position, config);
        Some(EnemyHandle::from_key(key))
    }

    fn clear_all(&mut self) {
        self.enemies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shadow() -> EnemyTypeConfig {
        EnemyTypeConfig::base(EnemyKind::Shadow)
    }

    #[test]
    fn test_killed_enemy_leaves_queries() {
        let mut world = EnemyPool::new(4);
        let a = world.spawn_enemy(Vec2::new(10.0, 0.0), &shadow()).unwrap();
        let b = world.spawn_enemy(Vec2::new(20.0, 0.0), &shadow()).unwrap();

        assert_eq!(world.apply_damage(a, 10), DamageOutcome::Hit { remaining: 20 });
        assert_eq!(world.apply_damage(a, 25), DamageOutcome::Killed);
        assert_eq!(world.apply_damage(a, 1), DamageOutcome::Missing);

        let live: Vec<_> = world.active_enemies().iter().map(|e| e.handle).collect();
        assert_eq!(live, vec![b]);
        assert!(world.overlapping(Vec2::new(10.0, 0.0), 1.0).iter().all(|e| e.handle != a));
    }

    #[test]
    fn test_reused_slot_is_fresh() {
        let mut world = EnemyPool::new(1);
        let a = world.spawn_enemy(Vec2::ZERO, &shadow()).unwrap();
        world.apply_damage(a, 100);

        let boss = EnemyTypeConfig::base(EnemyKind::Boss);
        let b = world.spawn_enemy(Vec2::ONE, &boss).unwrap();
        assert_ne!(a, b);
        let snap = world.snapshot(b).unwrap();
        assert_eq!(snap.hp, 800);
        assert_eq!(snap.velocity, Vec2::ZERO);
        assert!(world.snapshot(a).is_none());
    }

    #[test]
    fn test_spawn_dropped_at_capacity() {
        let mut world = EnemyPool::new(1);
        assert!(world.spawn_enemy(Vec2::ZERO, &shadow()).is_some());
        assert!(world.spawn_enemy(Vec2::ZERO, &shadow()).is_none());
        assert_eq!(world.dropped(), 1);
    }

    #[test]
    fn test_nearest_enemy_respects_range_and_exclusion() {
        let mut world = EnemyPool::new(4);
        let near = world.spawn_enemy(Vec2::new(30.0, 0.0), &shadow()).unwrap();
        let far = world.spawn_enemy(Vec2::new(90.0, 0.0), &shadow()).unwrap();
        let enemies = world.active_enemies();

        let hit = nearest_enemy(&enemies, Vec2::ZERO, 100.0, |_| false).unwrap();
        assert_eq!(hit.handle, near);

        let next = nearest_enemy(&enemies, Vec2::ZERO, 100.0, |h| h == near).unwrap();
        assert_eq!(next.handle, far);

        assert!(nearest_enemy(&enemies, Vec2::ZERO, 20.0, |_| false).is_none());
    }

    #[test]
    fn test_integrate_moves_and_clamps() {
        let mut world = EnemyPool::new(2);
        let h = world.spawn_enemy(Vec2::new(30.0, 30.0), &shadow()).unwrap();
        world.set_velocity(h, Vec2::new(-100.0, 50.0));
        world.integrate(1.0, &WorldBounds::new(2000.0, 2000.0));
        let pos = world.snapshot(h).unwrap().position;
        assert_eq!(pos, Vec2::new(18.0, 80.0));
    }
}
