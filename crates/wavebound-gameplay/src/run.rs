//! Simulation root.
//!
//! [`Run`] owns every component of one playthrough plus the event queue and
//! the RNG streams. The host feeds it commands, calls [`Run::tick`] once per
//! frame, drains presentation events, and answers buff prompts through
//! [`Run::select_buff`].

use ahash::{AHashMap, AHashSet};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use wavebound_common::{circles_overlap, ConfigError, EnemyHandle, RunId, WorldBounds};

use crate::attacks::{Archetype, AttackRegistry, CombatServices, Striker};
use crate::buffs::{BuffCatalog, BuffEngine, RarityTable, RollGuarantee};
use crate::character::{BaseStats, Character, HitResult};
use crate::combo::{ComboConfig, ComboSnapshot, ComboTracker};
use crate::config::GameConfig;
use crate::damage::{DamageResolver, KnockbackTracker};
use crate::enemy::{Behavior, EnemyBrain, EnemyKind, EnemyTypeConfig, HostileShot};
use crate::events::{EventBus, GameEvent, PresentationSink};
use crate::progression::{exp_reward, ChoicePrompt, ChoiceQueue, ChoiceReason, ExperienceTracker};
use crate::skills::{dash_sweep, SkillController, SkillEffect, SkillFlag, SkillSlot};
use crate::spatial::{EnemySnapshot, EnemyWorld, Spawner};
use crate::stats::{StatKind, StatModifiers};
use crate::waves::{Milestone, WaveDirector, WavePhase, WaveReport};

/// Hostile bolt speed.
pub const HOSTILE_BOLT_SPEED: f32 = 220.0;
/// Hostile bolt collision radius.
pub const HOSTILE_BOLT_RADIUS: f32 = 6.0;
/// Hostile bolt travel limit.
pub const HOSTILE_BOLT_RANGE: f32 = 600.0;

/// Offset of each split child from its parent.
const SPLIT_OFFSET: f32 = 20.0;
/// Stat bonus granted by the wave-15 milestone.
const RENOWNED_BONUS: f32 = 0.1;

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by the run API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    /// Invalid configuration
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    /// No buff with this id exists
    #[error("unknown buff: {0}")]
    UnknownBuff(String),

    /// The buff exists but is not in the open prompt
    #[error("buff {0} was not offered")]
    NotOffered(String),

    /// The buff could not be applied
    #[error("buff {0} was rejected")]
    Rejected(String),

    /// No prompt is open
    #[error("no choice is pending")]
    NoPendingChoice,

    /// The run has ended
    #[error("run is over")]
    RunOver,
}

/// Result type for run operations.
pub type RunResult<T> = Result<T, RunError>;

// ============================================================================
// Commands and Stats
// ============================================================================

/// Player intents, already translated from raw input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Movement direction (normalized by the run)
    Move(Vec2),
    /// Facing angle in radians
    Aim(f32),
    /// Swing the basic attack once
    CastBasicAttack,
    /// Cast a skill
    CastSkill(SkillSlot),
    /// Swing the basic attack whenever it is ready
    SetAutoAttack(bool),
    /// Pause or resume
    Pause(bool),
}

/// Run statistics reported at game over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Highest wave reached
    pub highest_wave: u32,
    /// Simulated seconds survived
    pub survival_time: f32,
    /// Enemies killed
    pub total_kills: u32,
    /// Longest combo
    pub highest_combo: u32,
    /// Damage dealt
    pub total_damage: u64,
    /// Bosses killed
    pub boss_kills: u32,
    /// Buffs taken
    pub buffs_collected: u32,
    /// Character level
    pub level: u32,
}

#[derive(Debug, Clone, Copy)]
struct HostileBolt {
    position: Vec2,
    velocity: Vec2,
    damage: i32,
    travelled: f32,
}

impl HostileBolt {
    fn from_shot(shot: &HostileShot) -> Self {
        Self {
            position: shot.origin,
            velocity: shot.direction * HOSTILE_BOLT_SPEED,
            damage: shot.damage,
            travelled: 0.0,
        }
    }
}

// ============================================================================
// Run
// ============================================================================

/// One playthrough over an enemy world `W`.
#[derive(Debug)]
pub struct Run<W: EnemyWorld + Spawner> {
    id: RunId,
    config: GameConfig,
    bounds: WorldBounds,
    world: W,

    character: Character,
    services: CombatServices,
    attacks: AttackRegistry,
    skills: SkillController,
    buffs: BuffEngine,
    director: WaveDirector,
    experience: ExperienceTracker,
    choices: ChoiceQueue,

    brains: AHashMap<EnemyHandle, EnemyBrain>,
    bolts: Vec<HostileBolt>,
    reflected: AHashSet<EnemyHandle>,

    pending_skills: Vec<SkillSlot>,
    basic_requested: bool,
    auto_attack: bool,
    paused: bool,
    over: bool,
    stats: RunStats,
}

impl<W: EnemyWorld + Spawner> Run<W> {
    /// Start a run with one equipped archetype and wave 1 announced.
    pub fn new(config: GameConfig, starting: Archetype, world: W) -> RunResult<Self> {
        config.validate()?;

        let mut root = config
            .seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        let mut stream = || fastrand::Rng::with_seed(root.u64(..));

        let events = EventBus::default();
        let services = CombatServices::new(
            DamageResolver::from_config(stream(), &config.combat),
            ComboTracker::new(ComboConfig::from(&config.combat)),
            KnockbackTracker::new(config.combat.knockback_duration),
            events,
        );

        let bounds = config.world.bounds();
        let base = BaseStats::from(&config.player);
        let character = Character::new(
            base,
            bounds.center(),
            StatModifiers::new(config.combat.reduction_cap),
        )
        .with_hit_invincibility(config.combat.invincibility_duration);

        let mut attacks = AttackRegistry::new(config.pools.projectile_capacity, &base)
            .with_proc_rng(stream());
        let level = attacks.equip(starting);
        services.events.publish(GameEvent::AttackEquipped {
            archetype: starting,
            level,
        });

        let buffs = BuffEngine::new(BuffCatalog::standard(), RarityTable::default(), stream());
        let mut director = WaveDirector::new(config.waves.clone(), &config.world, stream());
        director.start_next_wave(&services.events);

        let id = RunId::new();
        info!(run = %id, seed = ?config.seed, attack = %starting, "Run started");

        Ok(Self {
            id,
            bounds,
            world,
            character,
            services,
            attacks,
            skills: SkillController::new(config.skills.clone()),
            buffs,
            director,
            experience: ExperienceTracker::new(&config.progression),
            choices: ChoiceQueue::new(),
            brains: AHashMap::new(),
            bolts: Vec::new(),
            reflected: AHashSet::new(),
            pending_skills: Vec::new(),
            basic_requested: false,
            auto_attack: false,
            paused: false,
            over: false,
            stats: RunStats {
                highest_wave: 1,
                level: 1,
                ..RunStats::default()
            },
            config,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Run id.
    #[must_use]
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// Tuning in use.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The player character.
    #[must_use]
    pub const fn character(&self) -> &Character {
        &self.character
    }

    /// Equipped attacks.
    #[must_use]
    pub const fn attacks(&self) -> &AttackRegistry {
        &self.attacks
    }

    /// Skill slots.
    #[must_use]
    pub const fn skills(&self) -> &SkillController {
        &self.skills
    }

    /// Held buffs and roll state.
    #[must_use]
    pub const fn buffs(&self) -> &BuffEngine {
        &self.buffs
    }

    /// Wave state.
    #[must_use]
    pub const fn director(&self) -> &WaveDirector {
        &self.director
    }

    /// Level and experience.
    #[must_use]
    pub const fn experience(&self) -> &ExperienceTracker {
        &self.experience
    }

    /// Current combo.
    #[must_use]
    pub fn combo(&self) -> ComboSnapshot {
        self.services.combo.snapshot()
    }

    /// The enemy world.
    #[must_use]
    pub const fn world(&self) -> &W {
        &self.world
    }

    /// Run statistics so far.
    #[must_use]
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Check whether the run has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.over
    }

    /// Check whether the run is paused by the host.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// The open buff prompt.
    #[must_use]
    pub const fn pending_choice(&self) -> Option<&ChoicePrompt> {
        self.choices.active()
    }

    // ------------------------------------------------------------------------
    // Host API
    // ------------------------------------------------------------------------

    /// Apply a player intent.
    pub fn command(&mut self, command: Command) {
        match command {
            Command::Move(direction) => self.character.move_intent = direction,
            Command::Aim(angle) => self.character.facing = angle,
            Command::CastBasicAttack => self.basic_requested = true,
            Command::CastSkill(slot) => self.pending_skills.push(slot),
            Command::SetAutoAttack(enabled) => self.auto_attack = enabled,
            Command::Pause(paused) => {
                self.paused = paused;
                debug!(paused, "Pause toggled");
            }
        }
    }

    /// Forward queued presentation events. Returns how many were sent.
    pub fn drain_events(&mut self, sink: &mut dyn PresentationSink) -> usize {
        self.services.events.drain_into(sink)
    }

    /// Take one of the offered buffs and close the prompt.
    pub fn select_buff(&mut self, id: &str) -> RunResult<()> {
        if self.over {
            return Err(RunError::RunOver);
        }
        let prompt = self.choices.active().ok_or(RunError::NoPendingChoice)?;
        if self.buffs.catalog().get(id).is_none() {
            return Err(RunError::UnknownBuff(id.to_owned()));
        }
        if !prompt.offers(id) {
            return Err(RunError::NotOffered(id.to_owned()));
        }
        if !self
            .buffs
            .add_buff(id, &mut self.character, &mut self.attacks)
        {
            return Err(RunError::Rejected(id.to_owned()));
        }

        let stacks = self.buffs.stacks(id);
        if let Some(def) = self.buffs.catalog().get(id) {
            self.services
                .events
                .publish(GameEvent::BuffAcquired { id: def.id, stacks });
        }
        self.stats.buffs_collected += 1;
        self.choices.resolve();
        self.open_next_prompt();
        Ok(())
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Does nothing while paused, while a prompt is open, or after game over.
    /// Returns whether the simulation advanced.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.over || self.paused || self.choices.is_open() || dt <= 0.0 {
            return false;
        }

        // 1. clocks
        self.stats.survival_time += dt;
        self.services.combo.advance(dt);

        // 2. skills
        for slot in self.skills.update(dt, &mut self.character) {
            self.services.events.publish(GameEvent::SkillReady { slot });
        }
        for slot in std::mem::take(&mut self.pending_skills) {
            self.cast_skill(slot);
        }

        // 3. regen and invincibility
        let regen = self.character.update(dt);
        if regen > 0 {
            self.services
                .events
                .publish(GameEvent::PlayerHealed { amount: regen });
        }

        // 4. movement
        self.character.integrate(dt, &self.bounds);

        // 5. waves
        let player = self.character.position;
        for handle in self
            .director
            .update(dt, player, &mut self.world, &self.services.events)
        {
            self.adopt(handle);
        }

        // 6. enemy AI
        self.services.knockback.update(dt, &mut self.world);
        self.steer_enemies(dt);
        self.world.step(dt, &self.bounds);

        // 7. damage to the player
        self.resolve_contacts();
        self.update_bolts(dt);
        if self.over {
            return true;
        }

        // 8. attacks
        let combo = self.services.combo.count();
        let striker = Striker::from_character(&self.character, combo);
        self.attacks
            .update(dt, &striker, &mut self.world, &mut self.services);
        self.attacks
            .execute_all(&striker, &mut self.world, &mut self.services);
        if (self.basic_requested || self.auto_attack) && self.attacks.basic_ready() {
            self.attacks
                .cast_basic(&striker, &mut self.world, &mut self.services);
        }
        self.basic_requested = false;

        // 9. kills
        self.resolve_hits_and_kills();

        // 10. prompts
        self.open_next_prompt();
        self.refresh_stats();
        true
    }

    // ------------------------------------------------------------------------
    // Tick steps
    // ------------------------------------------------------------------------

    fn adopt(&mut self, handle: EnemyHandle) {
        if let Some(enemy) = self.world.snapshot(handle) {
            self.brains
                .insert(handle, EnemyBrain::new(enemy.kind.behavior()));
        }
    }

    fn cast_skill(&mut self, slot: SkillSlot) {
        let Some(effect) =
            self.skills
                .cast(slot, &mut self.character, &self.bounds, self.config.world.edge_margin)
        else {
            return;
        };
        self.services.events.publish(GameEvent::SkillCast {
            slot,
            cooldown: self.skills.cooldown(slot),
        });
        match effect {
            SkillEffect::Heal { amount } if amount > 0 => {
                self.services
                    .events
                    .publish(GameEvent::PlayerHealed { amount });
            }
            SkillEffect::Dash { from, to }
                if self
                    .character
                    .modifiers
                    .has_skill_flag(SkillFlag::DashPenetrate) =>
            {
                self.dash_through(from, to);
            }
            _ => {}
        }
    }

    fn dash_through(&mut self, from: Vec2, to: Vec2) {
        let enemies = self.world.active_enemies();
        let swept = dash_sweep(from, to, self.config.skills.dash_width, &enemies);
        if swept.is_empty() {
            return;
        }
        let combo = self.services.combo.count();
        let striker = Striker::from_character(&self.character, combo);
        let damage = self.character.stat(StatKind::Attack, combo)
            * (1.0 + self.character.modifiers.skill_damage);
        debug!(hit = swept.len(), damage, "Dash penetrated");
        for enemy in &swept {
            self.services
                .strike(&mut self.world, &striker, enemy, damage.floor(), Some(from));
        }
    }

    fn steer_enemies(&mut self, dt: f32) {
        let player = self.character.position;
        for enemy in self.world.active_enemies() {
            if self.services.knockback.is_active(enemy.handle) {
                continue;
            }
            let brain = self
                .brains
                .entry(enemy.handle)
                .or_insert_with(|| EnemyBrain::new(enemy.kind.behavior()));
            let steering = brain.think(&enemy, player, dt);
            self.world.set_velocity(enemy.handle, steering.velocity);
            self.bolts
                .extend(steering.shots.iter().map(HostileBolt::from_shot));
        }
    }

    fn resolve_contacts(&mut self) {
        if !self.skills.is_shielded() {
            self.reflected.clear();
        }
        let touching = self
            .world
            .overlapping(self.character.position, self.character.base().size);
        for enemy in touching {
            if self.over {
                return;
            }
            self.hit_player(enemy.atk, Some(&enemy));
        }
    }

    fn update_bolts(&mut self, dt: f32) {
        let player = self.character.position;
        let size = self.character.base().size;
        let mut hits = Vec::new();
        self.bolts.retain_mut(|bolt| {
            let step = bolt.velocity * dt;
            bolt.position += step;
            bolt.travelled += step.length();
            if circles_overlap(bolt.position, HOSTILE_BOLT_RADIUS, player, size) {
                hits.push(bolt.damage);
                return false;
            }
            bolt.travelled < HOSTILE_BOLT_RANGE
        });
        for damage in hits {
            if self.over {
                return;
            }
            self.hit_player(damage, None);
        }
    }

    /// Resolve one incoming hit. `source` is the enemy for contact hits.
    fn hit_player(&mut self, incoming: i32, source: Option<&EnemySnapshot>) {
        let combo = self.services.combo.count();
        if self.character.modifiers.is_combo_invincible(combo) {
            return;
        }
        if self.skills.is_shielded() {
            if let Some(enemy) = source {
                self.reflect(enemy, combo);
            }
            return;
        }
        if self.character.is_invincible() {
            return;
        }

        let defense = self.character.stat(StatKind::Defense, combo);
        let amount = self.services.resolver.compute_damage_taken(
            incoming,
            self.character.damage_reduction(),
            defense,
        );
        let result = self.character.take_damage(amount);
        if result == HitResult::Ignored {
            return;
        }
        self.services.combo.reset();
        self.services.events.publish(GameEvent::PlayerDamaged {
            amount,
            remaining: self.character.hp(),
        });
        self.services.events.publish(GameEvent::ScreenShake {
            intensity: 0.008,
            duration: 0.1,
        });

        if result == HitResult::Died {
            if self.character.try_revive() {
                self.services.events.publish(GameEvent::PlayerRevived {
                    hp: self.character.hp(),
                });
            } else {
                self.game_over();
            }
        }
    }

    fn reflect(&mut self, enemy: &EnemySnapshot, combo: u32) {
        let fraction = self.skills.reflect_fraction(&self.character);
        if fraction <= 0.0 || !self.reflected.insert(enemy.handle) {
            return;
        }
        let striker = Striker::from_character(&self.character, combo);
        let damage = (enemy.atk as f32 * fraction).floor();
        debug!(enemy = %enemy.handle, damage, "Shield reflected contact");
        self.services
            .strike(&mut self.world, &striker, enemy, damage, Some(self.character.position));
    }

    fn resolve_hits_and_kills(&mut self) {
        let mut healed = 0;
        for amount in self.services.take_dealt() {
            self.stats.total_damage += u64::from(amount.max(0).unsigned_abs());
            healed += self.character.lifesteal(amount);
        }

        for kill in self.services.take_kills() {
            let enemy = kill.enemy;
            self.brains.remove(&enemy.handle);
            self.stats.total_kills += 1;
            if enemy.kind == EnemyKind::Boss {
                self.stats.boss_kills += 1;
            }

            if let Some(report) = self
                .director
                .on_enemy_killed(enemy.kind, &self.services.events)
            {
                self.on_wave_cleared(&report);
            }

            healed += self.character.on_kill();

            let exp = exp_reward(enemy.kind, enemy.max_hp, self.director.wave());
            let before = self.experience.level();
            for level in before + 1..=before + self.experience.add(exp) {
                info!(level, "Level up");
                self.services.events.publish(GameEvent::LevelUp { level });
                self.choices.push_level_up(level);
            }

            if enemy.kind.behavior() == Behavior::Split && !enemy.split_child {
                self.split(&enemy);
            }
        }

        if healed > 0 {
            self.services
                .events
                .publish(GameEvent::PlayerHealed { amount: healed });
        }
    }

    fn split(&mut self, parent: &EnemySnapshot) {
        let child = EnemyTypeConfig::split_child(parent);
        for side in [-1.0, 1.0] {
            let position = parent.position + Vec2::new(side * SPLIT_OFFSET, 0.0);
            if let Some(handle) = self.director.spawn_extra(&mut self.world, position, &child) {
                self.adopt(handle);
            }
        }
    }

    fn on_wave_cleared(&mut self, report: &WaveReport) {
        self.bolts.clear();
        self.stats.highest_wave = self.stats.highest_wave.max(report.wave);
        self.choices.push_reward(
            ChoiceReason::WaveClear { wave: report.wave },
            report.guarantee(),
        );

        let Some(milestone) = report.milestone else {
            return;
        };
        info!(wave = report.wave, milestone = milestone.name(), "Milestone reached");
        match milestone {
            Milestone::FirstBlood => {
                self.choices
                    .push_reward(ChoiceReason::Milestone(milestone), RollGuarantee::Standard);
            }
            Milestone::Renowned => {
                for stat in [StatKind::Attack, StatKind::MaxHp, StatKind::Speed] {
                    self.character.modifiers.add_percent(stat, RENOWNED_BONUS);
                }
                self.character.recompute_max_hp();
            }
            Milestone::Conqueror => {
                let amount = self.character.full_heal();
                if amount > 0 {
                    self.services
                        .events
                        .publish(GameEvent::PlayerHealed { amount });
                }
                self.choices
                    .push_reward(ChoiceReason::Milestone(milestone), RollGuarantee::Legendary);
            }
            // Rising Star upgrades the reward roll; Warlord's pool unlocks by wave.
            Milestone::RisingStar
            | Milestone::Warlord
            | Milestone::Peerless
            | Milestone::Immortal => {}
        }
    }

    /// Roll and open the next queued prompt, resuming the director once every
    /// reward prompt is resolved.
    fn open_next_prompt(&mut self) {
        while let Some(request) = self.choices.next_request() {
            let equipped = self.attacks.archetypes();
            let options =
                self.buffs
                    .roll_choices(self.director.wave(), request.guarantee, &equipped);
            if options.is_empty() {
                warn!(reason = ?request.reason, "No eligible buffs, prompt skipped");
                continue;
            }
            self.services.events.publish(GameEvent::ChoiceOffered {
                reason: request.reason,
                options: options.clone(),
            });
            self.choices.open(ChoicePrompt {
                reason: request.reason,
                options,
            });
            break;
        }

        if !self.choices.reward_pending() && self.director.phase() == WavePhase::Reward {
            self.director.resume();
        }
    }

    fn refresh_stats(&mut self) {
        self.stats.highest_wave = self.stats.highest_wave.max(self.director.wave());
        self.stats.highest_combo = self.services.combo.highest();
        self.stats.level = self.experience.level();
    }

    fn game_over(&mut self) {
        self.over = true;
        self.bolts.clear();
        self.attacks.clear();
        self.choices.clear();
        self.refresh_stats();
        info!(
            run = %self.id,
            wave = self.stats.highest_wave,
            kills = self.stats.total_kills,
            time = self.stats.survival_time,
            "Game over"
        );
        self.services.events.publish(GameEvent::GameOver {
            stats: self.stats.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{EnemyPool, EnemyQuery};

    fn config() -> GameConfig {
        let mut config = GameConfig {
            seed: Some(42),
            ..GameConfig::default()
        };
        config.player.crit_chance = 0.0;
        config
    }

    fn run() -> Run<EnemyPool> {
        Run::new(config(), Archetype::Arrow, EnemyPool::new(256)).unwrap()
    }

    #[test]
    fn test_starts_with_wave_one_announced() {
        let mut run = run();
        assert_eq!(run.director().wave(), 1);
        assert_eq!(run.director().phase(), WavePhase::Preparing);
        assert!(run.attacks().has(Archetype::Arrow));

        let mut events: Vec<GameEvent> = Vec::new();
        run.drain_events(&mut events);
        assert!(events.contains(&GameEvent::AttackEquipped {
            archetype: Archetype::Arrow,
            level: 1
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::WaveAnnounced { wave: 1, .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = config();
        config.combat.combo_timeout = 0.0;
        let err = Run::new(config, Archetype::Slash, EnemyPool::new(8)).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
    }

    #[test]
    fn test_reduced_contact_damage() {
        let mut run = run();
        run.character.modifiers.damage_reduction = 0.2;
        run.hit_player(50, None);
        assert_eq!(run.character().hp(), 60);

        // invincibility window swallows the next hit
        run.hit_player(50, None);
        assert_eq!(run.character().hp(), 60);
    }

    #[test]
    fn test_damage_resets_combo() {
        let mut run = run();
        run.services.combo.register_hit();
        run.services.combo.register_hit();
        run.hit_player(10, None);
        assert_eq!(run.combo().count, 0);
    }

    #[test]
    fn test_combo_invincibility() {
        let mut run = run();
        run.character.modifiers.combo_invincible_at = Some(2);
        run.services.combo.register_hit();
        run.services.combo.register_hit();
        run.hit_player(50, None);
        assert_eq!(run.character().hp(), 100);
    }

    #[test]
    fn test_death_ends_run() {
        let mut run = run();
        run.tick(0.016);
        assert!(run.attacks().live_count() > 0);
        run.hit_player(10_000, None);
        assert!(run.is_over());
        assert_eq!(run.attacks().live_count(), 0);
        assert!(!run.tick(0.016));
        assert_eq!(run.select_buff("A01"), Err(RunError::RunOver));

        let mut events: Vec<GameEvent> = Vec::new();
        run.drain_events(&mut events);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::GameOver { .. })));
    }

    #[test]
    fn test_revive_saves_once() {
        let mut run = run();
        run.character.modifiers.has_revive = true;
        run.character.modifiers.revive_fraction = 0.3;
        run.hit_player(10_000, None);
        assert!(!run.is_over());
        assert_eq!(run.character().hp(), 30);

        run.character.update(5.0);
        run.hit_player(10_000, None);
        assert!(run.is_over());
    }

    #[test]
    fn test_pause_blocks_tick() {
        let mut run = run();
        run.command(Command::Pause(true));
        assert!(!run.tick(1.0));
        assert!(run.stats().survival_time.abs() < f32::EPSILON);
        run.command(Command::Pause(false));
        assert!(run.tick(1.0));
    }

    #[test]
    fn test_select_buff_errors() {
        let mut run = run();
        assert_eq!(run.select_buff("A01"), Err(RunError::NoPendingChoice));

        run.choices.push_level_up(2);
        run.open_next_prompt();
        let prompt = run.pending_choice().unwrap().clone();
        assert!(!prompt.options.is_empty());
        assert!(!run.tick(0.016));

        assert_eq!(
            run.select_buff("nope"),
            Err(RunError::UnknownBuff("nope".into()))
        );
        let unoffered = run
            .buffs()
            .catalog()
            .iter()
            .map(|d| d.id.as_str())
            .find(|id| !prompt.offers(id))
            .unwrap();
        assert_eq!(
            run.select_buff(unoffered),
            Err(RunError::NotOffered(unoffered.into()))
        );

        let pick = prompt.options[0].as_str();
        assert_eq!(run.select_buff(pick), Ok(()));
        assert!(run.pending_choice().is_none());
        assert_eq!(run.stats().buffs_collected, 1);
        assert_eq!(run.buffs().stacks(pick), 1);
    }

    #[test]
    fn test_first_wave_clears_once() {
        let mut config = config();
        config.player.max_hp = 100_000;
        let mut run = Run::new(config, Archetype::Arrow, EnemyPool::new(256)).unwrap();
        run.character.modifiers.add_percent(StatKind::Attack, 50.0);

        let mut events: Vec<GameEvent> = Vec::new();
        let mut cleared = false;
        for _ in 0..60 * 120 {
            run.tick(1.0 / 60.0);
            run.drain_events(&mut events);
            let Some(prompt) = run.pending_choice() else {
                continue;
            };
            if prompt.reason == (ChoiceReason::WaveClear { wave: 1 }) {
                cleared = true;
                break;
            }
            let pick = prompt.options[0].as_str();
            run.select_buff(pick).unwrap();
        }

        assert!(cleared);
        assert_eq!(run.director().phase(), WavePhase::Reward);
        assert_eq!(run.director().killed(), 13);
        assert_eq!(run.stats().total_kills, 13);
        let completes = events
            .iter()
            .filter(|e| matches!(e, GameEvent::WaveComplete { .. }))
            .count();
        assert_eq!(completes, 1);

        let pick = run.pending_choice().unwrap().options[0].as_str();
        run.select_buff(pick).unwrap();
        assert_eq!(run.director().phase(), WavePhase::Idle);
        for _ in 0..70 {
            run.tick(1.0 / 60.0);
        }
        assert_eq!(run.director().wave(), 2);
    }

    #[test]
    fn test_milestone_rewards() {
        let mut run = run();
        let report = |wave: u32| WaveReport {
            wave,
            kills: 0,
            flags: crate::waves::WaveFlags::for_wave(wave),
            milestone: Milestone::for_wave(wave),
        };

        run.on_wave_cleared(&report(15));
        assert!((run.character.modifiers.percent(StatKind::Attack) - 0.1).abs() < 1e-6);
        assert_eq!(run.character().max_hp(), 110);
        assert_eq!(run.choices.queued(), 1);

        run.choices.clear();
        run.character.take_damage(50);
        run.on_wave_cleared(&report(25));
        assert_eq!(run.character().hp(), run.character().max_hp());
        assert_eq!(run.choices.queued(), 2);

        run.choices.clear();
        run.on_wave_cleared(&report(5));
        assert_eq!(run.choices.queued(), 2);
    }

    #[test]
    fn test_same_seed_same_run() {
        let play = || {
            let mut run = run();
            run.command(Command::SetAutoAttack(true));
            for _ in 0..600 {
                run.tick(1.0 / 60.0);
            }
            (run.stats().clone(), run.world().active_enemies().len())
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn test_dash_penetrate_damages_path() {
        let mut run = run();
        run.character
            .modifiers
            .set_skill_flag(SkillFlag::DashPenetrate);
        let start = run.character().position;
        let mut config = EnemyTypeConfig::base(EnemyKind::Shadow);
        config.hp = 1000;
        let handle = run
            .world
            .spawn_enemy(start + Vec2::new(75.0, 0.0), &config)
            .unwrap();

        run.command(Command::Aim(0.0));
        run.command(Command::CastSkill(SkillSlot::Dash));
        run.tick(1.0 / 60.0);
        assert!(run.world().snapshot(handle).unwrap().hp < 1000);
    }
}
