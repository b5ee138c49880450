//! Experience, levels and the buff-choice queue.
//!
//! Wave rewards and level-ups both end in a buff choice. Only one prompt
//! is ever open; reward prompts always go first and level-up prompts wait
//! behind them.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::buffs::{BuffId, RollGuarantee};
use crate::config::ProgressionConfig;
use crate::enemy::EnemyKind;
use crate::waves::Milestone;

// ============================================================================
// Experience
// ============================================================================

/// Experience granted for a kill on `wave`.
#[must_use]
pub fn exp_reward(kind: EnemyKind, max_hp: i32, wave: u32) -> u32 {
    let base = match kind {
        EnemyKind::Boss => 200.0,
        EnemyKind::Elite => 50.0,
        _ => (10.0 + f64::from(max_hp.max(0)) / 20.0).floor(),
    };
    let bonus = 1.0 + 0.05 * f64::from(wave);
    (base * bonus + 1e-6).floor() as u32
}

/// Level and experience bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceTracker {
    level: u32,
    exp: u32,
    required: u32,
    growth: f32,
    total: u64,
}

impl ExperienceTracker {
    /// Level 1 with an empty bar.
    #[must_use]
    pub fn new(config: &ProgressionConfig) -> Self {
        Self {
            level: 1,
            exp: 0,
            required: config.first_level_exp.max(1),
            growth: config.growth.max(1.0),
            total: 0,
        }
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Experience in the current bar.
    #[must_use]
    pub const fn exp(&self) -> u32 {
        self.exp
    }

    /// Experience needed to fill the current bar.
    #[must_use]
    pub const fn required(&self) -> u32 {
        self.required
    }

    /// Lifetime experience.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Bar fill in `0.0..1.0`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.exp as f32 / self.required as f32
    }

    /// Add experience. Returns the number of levels gained.
    pub fn add(&mut self, amount: u32) -> u32 {
        self.total += u64::from(amount);
        self.exp = self.exp.saturating_add(amount);
        let mut gained = 0;
        while self.exp >= self.required {
            self.exp -= self.required;
            self.level += 1;
            gained += 1;
            // growth is an f32, so 1.15 arrives as 1.1499999...
            let next = (f64::from(self.required) * f64::from(self.growth) + 1e-3).floor();
            self.required = (next as u32).max(self.required + 1);
            debug!(level = self.level, next = self.required, "Level threshold crossed");
        }
        gained
    }
}

// ============================================================================
// Choice Queue
// ============================================================================

/// Why a buff choice is being offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceReason {
    /// Wave cleared
    WaveClear {
        /// Wave number
        wave: u32,
    },
    /// Extra choice granted by a milestone
    Milestone(Milestone),
    /// Level reached
    LevelUp {
        /// New level
        level: u32,
    },
}

impl ChoiceReason {
    /// Check whether this prompt belongs to a wave reward.
    #[must_use]
    pub const fn is_reward(&self) -> bool {
        !matches!(self, Self::LevelUp { .. })
    }
}

/// A queued choice that has not been rolled yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceRequest {
    /// Why
    pub reason: ChoiceReason,
    /// Rarity floor for the first slot
    pub guarantee: RollGuarantee,
}

/// An open prompt waiting for a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoicePrompt {
    /// Why
    pub reason: ChoiceReason,
    /// Offered buffs, distinct
    pub options: Vec<BuffId>,
}

impl ChoicePrompt {
    /// Check whether `id` was offered.
    #[must_use]
    pub fn offers(&self, id: &str) -> bool {
        self.options.iter().any(|o| o.as_str() == id)
    }
}

/// Serializes choice prompts so at most one is open.
#[derive(Debug, Clone, Default)]
pub struct ChoiceQueue {
    rewards: VecDeque<ChoiceRequest>,
    level_ups: VecDeque<ChoiceRequest>,
    active: Option<ChoicePrompt>,
}

impl ChoiceQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a wave-reward choice.
    pub fn push_reward(&mut self, reason: ChoiceReason, guarantee: RollGuarantee) {
        debug!(?reason, ?guarantee, "Reward choice queued");
        self.rewards.push_back(ChoiceRequest { reason, guarantee });
    }

    /// Queue one level-up choice.
    pub fn push_level_up(&mut self, level: u32) {
        debug!(level, "Level-up choice queued");
        self.level_ups.push_back(ChoiceRequest {
            reason: ChoiceReason::LevelUp { level },
            guarantee: RollGuarantee::Standard,
        });
    }

    /// Next request to roll, if no prompt is open. Rewards go first.
    pub fn next_request(&mut self) -> Option<ChoiceRequest> {
        if self.active.is_some() {
            return None;
        }
        self.rewards
            .pop_front()
            .or_else(|| self.level_ups.pop_front())
    }

    /// Open a rolled prompt. Returns false if one is already open.
    pub fn open(&mut self, prompt: ChoicePrompt) -> bool {
        if self.active.is_some() {
            return false;
        }
        info!(reason = ?prompt.reason, options = prompt.options.len(), "Choice offered");
        self.active = Some(prompt);
        true
    }

    /// The open prompt.
    #[must_use]
    pub const fn active(&self) -> Option<&ChoicePrompt> {
        self.active.as_ref()
    }

    /// Close the open prompt.
    pub fn resolve(&mut self) -> Option<ChoicePrompt> {
        self.active.take()
    }

    /// Check whether a prompt is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Check whether any wave-reward prompt is open or queued.
    #[must_use]
    pub fn reward_pending(&self) -> bool {
        !self.rewards.is_empty() || self.active.as_ref().is_some_and(|p| p.reason.is_reward())
    }

    /// Requests not yet opened.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.rewards.len() + self.level_ups.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.rewards.clear();
        self.level_ups.clear();
        self.active = None;
    }
}
