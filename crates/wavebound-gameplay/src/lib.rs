//! # Wavebound Gameplay
//!
//! Simulation core for Wavebound runs.
//!
//! This crate owns every rule of a run and knows nothing about rendering or
//! input devices:
//! - Character stats and buff modifiers
//! - Buff catalog, rarity rolls and pity
//! - Combo tracking and damage resolution
//! - The six attack archetypes and the basic attack
//! - Active skills (speed boost, dash, shield, heal)
//! - Wave director, enemy AI and spawning
//! - Experience, levels and choice prompts
//! - The run root that ties a tick together
//! - Event bus for presentation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod attacks;
pub mod buffs;
pub mod character;
pub mod combo;
pub mod config;
pub mod damage;
pub mod enemy;
pub mod events;
pub mod pool;
pub mod progression;
pub mod run;
pub mod skills;
pub mod spatial;
pub mod stats;
pub mod waves;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::attacks::*;
    pub use crate::buffs::*;
    pub use crate::character::*;
    pub use crate::combo::*;
    pub use crate::config::*;
    pub use crate::damage::*;
    pub use crate::enemy::*;
    pub use crate::events::*;
    pub use crate::pool::*;
    pub use crate::progression::*;
    pub use crate::run::*;
    pub use crate::skills::*;
    pub use crate::spatial::*;
    pub use crate::stats::*;
    pub use crate::waves::*;
}

pub use prelude::*;
