//! Presentation notifications.
//!
//! The core publishes fire-and-forget events onto a bounded queue owned by
//! the run. The host drains it once per tick into a [`PresentationSink`].
//! Nothing in the simulation reads these back.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec2;
use serde::Serialize;
use wavebound_common::EnemyHandle;

use crate::attacks::{Archetype, ProcAction};
use crate::buffs::BuffId;
use crate::enemy::EnemyKind;
use crate::progression::ChoiceReason;
use crate::run::RunStats;
use crate::skills::SkillSlot;
use crate::waves::{Milestone, WaveFlags};

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    /// Damage number and hit flash
    DamageDealt {
        /// Enemy hit
        target: EnemyHandle,
        /// Where to show the number
        position: Vec2,
        /// Final damage
        amount: i32,
        /// Crit flag
        is_crit: bool,
    },
    /// Death particles
    EnemyKilled {
        /// Enemy handle (already released)
        handle: EnemyHandle,
        /// Archetype
        kind: EnemyKind,
        /// Where it died
        position: Vec2,
    },
    /// Camera shake
    ScreenShake {
        /// Shake intensity
        intensity: f32,
        /// Seconds
        duration: f32,
    },
    /// Combo display
    ComboChanged {
        /// Hit count
        count: u32,
        /// Damage multiplier
        multiplier: f32,
    },
    /// Player took damage
    PlayerDamaged {
        /// Damage after reduction
        amount: i32,
        /// HP left
        remaining: i32,
    },
    /// Player healed
    PlayerHealed {
        /// HP restored
        amount: i32,
    },
    /// One-shot revive consumed
    PlayerRevived {
        /// HP after revive
        hp: i32,
    },
    /// Wave banner
    WaveAnnounced {
        /// Wave number
        wave: u32,
        /// Boss/elite/swarm flags
        flags: WaveFlags,
    },
    /// Preparation over, spawning starts
    WaveStarted {
        /// Wave number
        wave: u32,
        /// Enemies to kill
        quota: u32,
    },
    /// Wave cleared
    WaveComplete {
        /// Wave number
        wave: u32,
        /// Enemies killed this wave
        kills: u32,
        /// Milestone reached, if any
        milestone: Option<Milestone>,
    },
    /// Buff banner
    BuffAcquired {
        /// Buff id
        id: BuffId,
        /// Stacks now held
        stacks: u32,
    },
    /// A choice prompt opened
    ChoiceOffered {
        /// Why the prompt exists
        reason: ChoiceReason,
        /// Offered buffs
        options: Vec<BuffId>,
    },
    /// Level up
    LevelUp {
        /// New level
        level: u32,
    },
    /// Attack equipped or upgraded
    AttackEquipped {
        /// Archetype
        archetype: Archetype,
        /// Level after equip
        level: u32,
    },
    /// On-cast proc fired
    ProcTriggered {
        /// What fired
        action: ProcAction,
    },
    /// Skill cooldown UI
    SkillCast {
        /// Skill slot
        slot: SkillSlot,
        /// Cooldown started
        cooldown: f32,
    },
    /// Skill came off cooldown
    SkillReady {
        /// Skill slot
        slot: SkillSlot,
    },
    /// Final stats
    GameOver {
        /// Run statistics
        stats: RunStats,
    },
}

/// Bounded event queue.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Dropped if the queue is full.
    pub fn publish(&self, event: GameEvent) {
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Forwards all pending events to a sink.
    pub fn drain_into(&self, sink: &mut dyn PresentationSink) -> usize {
        let mut count = 0;
        while let Ok(event) = self.receiver.try_recv() {
            sink.handle(&event);
            count += 1;
        }
        count
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Receiver of presentation notifications.
pub trait PresentationSink {
    /// Handles one event.
    fn handle(&mut self, event: &GameEvent);
}

/// Sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn handle(&mut self, _event: &GameEvent) {}
}

impl PresentationSink for Vec<GameEvent> {
    fn handle(&mut self, event: &GameEvent) {
        self.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        bus.publish(GameEvent::LevelUp { level: 2 });
        bus.publish(GameEvent::PlayerHealed { amount: 5 });
        assert_eq!(bus.pending_count(), 2);

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], GameEvent::LevelUp { level: 2 });
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let bus = EventBus::new(1);
        bus.publish(GameEvent::LevelUp { level: 2 });
        bus.publish(GameEvent::LevelUp { level: 3 });
        assert_eq!(bus.drain(), vec![GameEvent::LevelUp { level: 2 }]);
    }

    #[test]
    fn test_drain_into_sink() {
        let bus = EventBus::default();
        bus.publish(GameEvent::SkillReady {
            slot: SkillSlot::Dash,
        });
        let mut recorded: Vec<GameEvent> = Vec::new();
        assert_eq!(bus.drain_into(&mut recorded), 1);
        assert_eq!(recorded.len(), 1);

        bus.publish(GameEvent::LevelUp { level: 4 });
        assert_eq!(bus.drain_into(&mut NullSink), 1);
        assert_eq!(bus.capacity(), 4096);
    }
}
