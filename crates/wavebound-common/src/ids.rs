//! ID types for enemies, runs, and pooled resources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for run IDs.
static RUN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one simulated run.
///
/// Used to tag log spans so several runs in one process stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(u64);

impl RunId {
    /// Creates a new unique run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(RUN_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Generational handle to a pooled slot.
///
/// The generation is bumped every time a slot is released, so a handle held
/// across a release never aliases the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

impl SlotKey {
    /// Creates a key from its parts.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the owning pool.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation the slot had when this key was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Handle to an enemy entity owned by the external spawner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyHandle(SlotKey);

impl EnemyHandle {
    /// Creates an enemy handle from a pool slot key.
    #[must_use]
    pub const fn from_key(key: SlotKey) -> Self {
        Self(key)
    }

    /// Creates an enemy handle from raw parts.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(SlotKey::new(index, generation))
    }

    /// Returns the underlying slot key.
    #[must_use]
    pub const fn key(self) -> SlotKey {
        self.0
    }
}

impl fmt::Display for EnemyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enemy#{}v{}", self.0.index, self.0.generation)
    }
}
