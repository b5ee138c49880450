//! Generational object pool.
//!
//! Slots grow on demand up to a fixed capacity, after which new requests are
//! dropped (never blocked). Releasing a slot resets its item immediately and
//! bumps the slot generation, so a stale key can never reach the next
//! occupant.

use tracing::warn;
use wavebound_common::SlotKey;

/// Items that can live in a [`Pool`].
pub trait Poolable: Default {
    /// Return the item to its pristine state.
    fn reset(&mut self);

    /// Check whether the item is in its pristine state.
    fn is_reset(&self) -> bool;
}

#[derive(Debug, Clone)]
struct Slot<T> {
    item: T,
    generation: u32,
    live: bool,
}

/// Fixed-cap pool of reusable items.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    capacity: usize,
    live: usize,
    dropped: u64,
}

impl<T: Poolable> Pool<T> {
    /// Create an empty pool that grows up to `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
            live: 0,
            dropped: 0,
        }
    }

    /// Take a pristine item. Returns `None` when the pool is exhausted.
    pub fn acquire(&mut self) -> Option<(SlotKey, &mut T)> {
        let index = if let Some(index) = self.free.pop() {
            index
        } else if self.slots.len() < self.capacity {
            self.slots.push(Slot {
                item: T::default(),
                generation: 0,
                live: false,
            });
            (self.slots.len() - 1) as u32
        } else {
            self.dropped += 1;
            warn!(
                capacity = self.capacity,
                dropped = self.dropped,
                "pool exhausted, dropping request"
            );
            return None;
        };

        let slot = &mut self.slots[index as usize];
        debug_assert!(!slot.live, "free list handed out a live slot");
        debug_assert!(slot.item.is_reset(), "pooled item reused without reset");
        if !slot.item.is_reset() {
            slot.item.reset();
        }
        slot.live = true;
        self.live += 1;
        Some((SlotKey::new(index, slot.generation), &mut slot.item))
    }

    /// Return an item to the pool. Stale or unknown keys are ignored.
    pub fn release(&mut self, key: SlotKey) -> bool {
        let Some(slot) = self.slots.get_mut(key.index() as usize) else {
            return false;
        };
        if !slot.live || slot.generation != key.generation() {
            return false;
        }
        slot.item.reset();
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index());
        self.live -= 1;
        true
    }

    /// Live item for a key.
    #[must_use]
    pub fn get(&self, key: SlotKey) -> Option<&T> {
        self.slots
            .get(key.index() as usize)
            .filter(|slot| slot.live && slot.generation == key.generation())
            .map(|slot| &slot.item)
    }

    /// Mutable live item for a key.
    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        self.slots
            .get_mut(key.index() as usize)
            .filter(|slot| slot.live && slot.generation == key.generation())
            .map(|slot| &mut slot.item)
    }

    /// Iterate over live items.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.live)
            .map(|(i, slot)| (SlotKey::new(i as u32, slot.generation), &slot.item))
    }

    /// Iterate mutably over live items.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotKey, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, slot)| slot.live)
            .map(|(i, slot)| (SlotKey::new(i as u32, slot.generation), &mut slot.item))
    }

    /// Keys of all live items.
    #[must_use]
    pub fn keys(&self) -> Vec<SlotKey> {
        self.iter().map(|(key, _)| key).collect()
    }

    /// Release every live item.
    pub fn clear(&mut self) {
        for key in self.keys() {
            self.release(key);
        }
    }

    /// Number of live items.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Check whether nothing is live.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Maximum number of slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests dropped because the pool was full.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}
