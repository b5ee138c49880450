//! In-flight projectiles.
//!
//! Every projectile carries its own hit set, so one flight never damages
//! the same enemy twice. Projectiles live in a [`Pool`] and are fully reset
//! on release.

use ahash::AHashSet;
use glam::Vec2;
use wavebound_common::EnemyHandle;

use super::{CombatServices, Striker};
use crate::pool::{Pool, Poolable};
use crate::spatial::{EnemyQuery, EnemyWorld};

/// How many enemies a projectile may pass through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pierce {
    /// Destroyed once hits exceed this count.
    Limited(u32),
    /// Never destroyed by hits.
    #[default]
    Unlimited,
}

/// Launch parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    /// Start position
    pub origin: Vec2,
    /// Initial velocity
    pub velocity: Vec2,
    /// Collision radius
    pub radius: f32,
    /// Base damage per hit (already scaled by the owner's attack)
    pub damage: f32,
    /// Pierce rule
    pub pierce: Pierce,
    /// Distance from origin at which the projectile expires
    pub max_range: f32,
    /// Enemy to home on
    pub target: Option<EnemyHandle>,
}

/// One projectile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projectile {
    /// Position
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Launch position
    pub origin: Vec2,
    /// Collision radius
    pub radius: f32,
    /// Base damage per hit
    pub damage: f32,
    /// Pierce rule
    pub pierce: Pierce,
    /// Distance from origin at which the projectile expires
    pub max_range: f32,
    /// Homing target
    pub target: Option<EnemyHandle>,
    hits: u32,
    hit_set: AHashSet<EnemyHandle>,
}

impl Projectile {
    fn launch(&mut self, launch: &Launch) {
        self.position = launch.origin;
        self.origin = launch.origin;
        self.velocity = launch.velocity;
        self.radius = launch.radius;
        self.damage = launch.damage;
        self.pierce = launch.pierce;
        self.max_range = launch.max_range;
        self.target = launch.target;
    }

    /// Check whether this flight already hit an enemy.
    #[must_use]
    pub fn has_hit(&self, handle: EnemyHandle) -> bool {
        self.hit_set.contains(&handle)
    }

    /// Enemies hit so far.
    #[must_use]
    pub const fn hits(&self) -> u32 {
        self.hits
    }

    /// Record a hit. Returns true if the projectile is now spent.
    pub fn record_hit(&mut self, handle: EnemyHandle) -> bool {
        if !self.hit_set.insert(handle) {
            return self.is_spent();
        }
        self.hits += 1;
        self.is_spent()
    }

    /// Check whether pierce is exhausted.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        match self.pierce {
            Pierce::Limited(pierce) => self.hits > pierce,
            Pierce::Unlimited => false,
        }
    }

    /// Check whether the projectile flew past its range.
    #[must_use]
    pub fn out_of_range(&self) -> bool {
        self.position.distance(self.origin) > self.max_range
    }
}

impl Poolable for Projectile {
    fn reset(&mut self) {
        let mut hit_set = std::mem::take(&mut self.hit_set);
        hit_set.clear();
        *self = Self {
            hit_set,
            ..Self::default()
        };
    }

    fn is_reset(&self) -> bool {
        self.hit_set.is_empty()
            && self.hits == 0
            && self.target.is_none()
            && self.position == Vec2::ZERO
            && self.velocity == Vec2::ZERO
            && self.damage == 0.0
    }
}

/// Pooled projectiles for one attack.
#[derive(Debug, Clone)]
pub struct ProjectileSet {
    pool: Pool<Projectile>,
}

impl ProjectileSet {
    /// Create an empty set capped at `capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: Pool::new(capacity),
        }
    }

    /// Launch a projectile. Returns false if the pool is exhausted.
    pub fn spawn(&mut self, launch: &Launch) -> bool {
        match self.pool.acquire() {
            Some((_, projectile)) => {
                projectile.launch(launch);
                true
            }
            None => false,
        }
    }

    /// Adjust projectiles before they move (homing).
    pub fn steer(&mut self, mut f: impl FnMut(&mut Projectile)) {
        for (_, projectile) in self.pool.iter_mut() {
            f(projectile);
        }
    }

    /// Move every projectile and expire those past their range.
    pub fn advance(&mut self, dt: f32) {
        let mut expired = Vec::new();
        for (key, projectile) in self.pool.iter_mut() {
            projectile.position += projectile.velocity * dt;
            if projectile.out_of_range() {
                expired.push(key);
            }
        }
        for key in expired {
            self.pool.release(key);
        }
    }

    /// Resolve overlaps: one strike per new enemy, destroying spent projectiles.
    ///
    /// Returns the number of hits landed.
    pub fn resolve_hits(
        &mut self,
        striker: &Striker<'_>,
        world: &mut dyn EnemyWorld,
        services: &mut CombatServices,
    ) -> usize {
        let mut landed = 0;
        let mut spent = Vec::new();
        for (key, projectile) in self.pool.iter_mut() {
            let mut touching = world.overlapping(projectile.position, projectile.radius);
            touching.sort_by(|a, b| {
                a.position
                    .distance_squared(projectile.position)
                    .total_cmp(&b.position.distance_squared(projectile.position))
            });
            for enemy in touching {
                if projectile.has_hit(enemy.handle) {
                    continue;
                }
                let Some(_) = services.strike(
                    world,
                    striker,
                    &enemy,
                    projectile.damage,
                    Some(projectile.position),
                ) else {
                    continue;
                };
                landed += 1;
                if projectile.record_hit(enemy.handle) {
                    spent.push(key);
                    break;
                }
            }
        }
        for key in spent {
            self.pool.release(key);
        }
        landed
    }

    /// Iterate over live projectiles.
    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.pool.iter().map(|(_, p)| p)
    }

    /// Live projectile count.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pool.len()
    }

    /// Check whether nothing is in flight.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Drop everything in flight.
    pub fn clear(&mut self) {
        self.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attacks::test_support::{neutral_striker, services, spawn_with_hp};
    use crate::spatial::{EnemyPool, EnemyQuery};
    use crate::stats::StatModifiers;

    fn arrow(pierce: Pierce) -> Launch {
        Launch {
            origin: Vec2::ZERO,
            velocity: Vec2::new(500.0, 0.0),
            radius: 6.0,
            damage: 10.0,
            pierce,
            max_range: 400.0,
            target: None,
        }
    }

    #[test]
    fn test_pierce_one_hits_at_most_two() {
        let mut world = EnemyPool::new(8);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        for x in [50.0, 100.0, 150.0] {
            spawn_with_hp(&mut world, Vec2::new(x, 0.0), 1000);
        }

        let mut set = ProjectileSet::new(4);
        assert!(set.spawn(&arrow(Pierce::Limited(1))));
        let mut landed = 0;
        for _ in 0..40 {
            set.advance(1.0 / 60.0);
            landed += set.resolve_hits(&striker, &mut world, &mut services);
        }
        assert_eq!(landed, 2);
        assert!(set.is_empty());
        let damaged = world
            .active_enemies()
            .iter()
            .filter(|e| e.hp < e.max_hp)
            .count();
        assert_eq!(damaged, 2);
    }

    #[test]
    fn test_no_double_hit_on_lingering_overlap() {
        let mut world = EnemyPool::new(8);
        let mut services = services();
        let mods = StatModifiers::default();
        let striker = neutral_striker(Vec2::ZERO, 0.0, &mods);
        let handle = spawn_with_hp(&mut world, Vec2::new(20.0, 0.0), 1000);

        let mut set = ProjectileSet::new(4);
        let mut slow = arrow(Pierce::Unlimited);
        slow.velocity = Vec2::new(1.0, 0.0);
        set.spawn(&slow);
        for _ in 0..10 {
            set.advance(0.1);
            set.resolve_hits(&striker, &mut world, &mut services);
        }
        assert_eq!(world.snapshot(handle).unwrap().hp, 990);
    }

    #[test]
    fn test_expires_past_range() {
        let mut set = ProjectileSet::new(2);
        set.spawn(&arrow(Pierce::Limited(0)));
        set.advance(0.5);
        assert_eq!(set.len(), 1);
        set.advance(0.5);
        assert!(set.is_empty());
    }

    #[test]
    fn test_released_projectile_is_reset() {
        let mut set = ProjectileSet::new(1);
        let mut homing = arrow(Pierce::Limited(0));
        homing.target = Some(EnemyHandle::new(3, 0));
        set.spawn(&homing);
        set.advance(1.0);
        assert!(set.is_empty());

        set.spawn(&arrow(Pierce::Limited(0)));
        let fresh = set.iter().next().unwrap();
        assert_eq!(fresh.hits(), 0);
        assert!(fresh.target.is_none());
    }
}
