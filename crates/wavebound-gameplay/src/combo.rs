//! Combo tracking.
//!
//! The tracker keeps its own clock advanced by the captured frame delta,
//! so time spent paused never counts against the timeout.

use serde::{Deserialize, Serialize};

use crate::config::CombatConfig;

/// Combo tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboConfig {
    /// Seconds without a hit before the combo resets.
    pub timeout: f32,
    /// Multiplier gained per hit after the first.
    pub step: f32,
    /// Multiplier ceiling.
    pub cap: f32,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            timeout: 2.0,
            step: 0.05,
            cap: 2.0,
        }
    }
}

impl From<&CombatConfig> for ComboConfig {
    fn from(config: &CombatConfig) -> Self {
        Self {
            timeout: config.combo_timeout,
            step: config.combo_step,
            cap: config.combo_multiplier_cap,
        }
    }
}

/// Combo state after a change, for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboSnapshot {
    /// Hit count
    pub count: u32,
    /// Damage multiplier
    pub multiplier: f32,
}

/// Rolling hit streak.
#[derive(Debug, Clone)]
pub struct ComboTracker {
    config: ComboConfig,
    count: u32,
    multiplier: f32,
    clock: f32,
    last_hit_at: f32,
    highest: u32,
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self::new(ComboConfig::default())
    }
}

impl ComboTracker {
    /// Create an idle tracker.
    #[must_use]
    pub fn new(config: ComboConfig) -> Self {
        Self {
            config,
            count: 0,
            multiplier: 1.0,
            clock: 0.0,
            last_hit_at: 0.0,
            highest: 0,
        }
    }

    /// Advance the tracker clock.
    pub fn advance(&mut self, dt: f32) {
        self.clock += dt.max(0.0);
    }

    fn timed_out(&self) -> bool {
        self.count > 0 && self.clock - self.last_hit_at >= self.config.timeout
    }

    /// Register a landed hit and return the new state.
    pub fn register_hit(&mut self) -> ComboSnapshot {
        if self.timed_out() {
            self.count = 0;
        }
        self.count += 1;
        self.last_hit_at = self.clock;
        self.multiplier = (1.0 + (self.count - 1) as f32 * self.config.step).min(self.config.cap);
        self.highest = self.highest.max(self.count);
        self.snapshot()
    }

    /// Current damage multiplier.
    ///
    /// Resets to baseline first if the timeout has elapsed since the last hit.
    pub fn multiplier(&mut self) -> f32 {
        if self.timed_out() {
            self.reset();
        }
        self.multiplier
    }

    /// Current count, honoring the timeout.
    pub fn count(&mut self) -> u32 {
        if self.timed_out() {
            self.reset();
        }
        self.count
    }

    /// Count without applying the timeout (read-only views).
    #[must_use]
    pub const fn raw_count(&self) -> u32 {
        self.count
    }

    /// Highest count reached.
    #[must_use]
    pub const fn highest(&self) -> u32 {
        self.highest
    }

    /// Drop the streak (player took damage, or timeout).
    pub fn reset(&mut self) {
        self.count = 0;
        self.multiplier = 1.0;
    }

    /// Current state.
    #[must_use]
    pub const fn snapshot(&self) -> ComboSnapshot {
        ComboSnapshot {
            count: self.count,
            multiplier: self.multiplier,
        }
    }
}
