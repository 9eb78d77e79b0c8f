//! Referee context
//!
//! [`Referee`] owns everything a round needs: the match clock, the shared
//! store, the scheduler, the buff ledger, the notification bus, and handles
//! to the entity registry and ruleset. It is the single writer of match
//! state; I/O threads reach it only through [`Referee::command_sender`].
//!
//! Health and combat operations are implemented on `Referee` in
//! [`crate::combat`]; settlement lives in [`settlement`].

pub mod command;
pub mod settlement;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::buff::{Buff, BuffLedger};
use crate::bus::{EventBus, Notification};
use crate::combat::{HitInfo, keys};
use crate::entity::{Entity, EntityRegistry};
use crate::error::RulesError;
use crate::identity::Identity;
use crate::observability::metrics;
use crate::rules::Ruleset;
use crate::scheduler::{
    MatchClock, Scheduled, Scheduler, Stage, StageChange, TIME_EPSILON, fire_due,
};
use crate::store::Store;

pub use command::Command;
pub use settlement::{SettleReason, Settlement};

/// Period of the health regeneration tick.
pub const REGEN_INTERVAL: Duration = Duration::from_secs(1);

/// Single-writer owner of all match state.
pub struct Referee {
    pub(crate) clock: MatchClock,
    pub(crate) store: Store,
    pub(crate) scheduler: Scheduler<Self>,
    pub(crate) buffs: BuffLedger,
    pub(crate) bus: EventBus,
    pub(crate) registry: Arc<dyn EntityRegistry>,
    pub(crate) rules: Arc<dyn Ruleset>,
    commands_tx: mpsc::UnboundedSender<Command>,
    commands_rx: mpsc::UnboundedReceiver<Command>,
    pub(crate) settlement: Option<Settlement>,
    pub(crate) last_heat_tick: f64,
    pub(crate) last_regen_tick: f64,
    round: u64,
}

impl Scheduled for Referee {
    fn scheduler(&mut self) -> &mut Scheduler<Self> {
        &mut self.scheduler
    }
}

impl Referee {
    /// Creates a referee and starts the first round.
    #[must_use]
    pub fn new(rules: Arc<dyn Ruleset>, registry: Arc<dyn EntityRegistry>) -> Self {
        let clock = MatchClock::new();
        let store = Store::new(clock.clone());
        let buffs = BuffLedger::new(&store);
        let scheduler = Scheduler::new(clock.clone(), rules.stage_limits());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let mut referee = Self {
            clock,
            store,
            scheduler,
            buffs,
            bus: EventBus::default(),
            registry,
            rules,
            commands_tx,
            commands_rx,
            settlement: None,
            last_heat_tick: 0.0,
            last_regen_tick: 0.0,
            round: 0,
        };
        referee.reset();
        referee
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current match time in seconds.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.now()
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.scheduler.stage()
    }

    /// The match clock.
    #[must_use]
    pub const fn clock(&self) -> &MatchClock {
        &self.clock
    }

    /// Root view of the shared store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Store view scoped to one entity.
    #[must_use]
    pub fn entity_store(&self, id: Identity) -> Store {
        self.store.with_namespace(id)
    }

    /// The buff ledger.
    #[must_use]
    pub const fn buffs(&self) -> &BuffLedger {
        &self.buffs
    }

    /// The scheduler, for ruleset code registering its own callbacks.
    pub const fn scheduler_mut(&mut self) -> &mut Scheduler<Self> {
        &mut self.scheduler
    }

    /// The scheduler.
    #[must_use]
    pub const fn scheduler_ref(&self) -> &Scheduler<Self> {
        &self.scheduler
    }

    /// The notification bus.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub(crate) const fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Subscribes to flushed notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.bus.subscribe()
    }

    /// The entity registry.
    #[must_use]
    pub fn registry(&self) -> &dyn EntityRegistry {
        self.registry.as_ref()
    }

    /// The ruleset.
    #[must_use]
    pub fn rules(&self) -> &dyn Ruleset {
        self.rules.as_ref()
    }

    /// Rounds started since creation, counting the initial one.
    #[must_use]
    pub const fn round(&self) -> u64 {
        self.round
    }

    /// Sender for funnelling inbound commands from I/O threads.
    ///
    /// Commands are applied at the start of the next [`step`](Self::step).
    #[must_use]
    pub fn command_sender(&self) -> mpsc::UnboundedSender<Command> {
        self.commands_tx.clone()
    }

    pub(crate) fn publish(&mut self, notification: Notification) {
        self.bus.publish(notification);
    }

    pub(crate) fn entity(&self, id: Identity) -> Option<Entity> {
        self.registry.get(id).cloned()
    }

    // ========================================================================
    // Round lifecycle
    // ========================================================================

    /// Starts a new round from clean state.
    ///
    /// Clears the store, rewinds the clock, drops every registration,
    /// re-registers the round callbacks, and sets every roster entity to max
    /// health and its initial ammo.
    pub fn reset(&mut self) {
        self.store.clear();
        self.clock.rewind();
        self.scheduler.reset();
        self.scheduler.set_limits(self.rules.stage_limits());
        self.settlement = None;
        self.last_heat_tick = 0.0;
        self.last_regen_tick = 0.0;
        self.round += 1;
        self.register_round_callbacks();

        let entities: Vec<Entity> = self.registry.entities().cloned().collect();
        for entity in &entities {
            let store = self.entity_store(entity.id);
            store.save(*keys::HEALTH, self.rules.max_health(entity));
            if entity.weapon.is_some() {
                store.save(*keys::AMMO, entity.initial_ammo);
            }
        }

        self.publish(Notification::RoundReset { time: 0.0 });
        info!(
            round = self.round,
            ruleset = self.rules.name(),
            entities = entities.len(),
            "round reset"
        );
    }

    fn register_round_callbacks(&mut self) {
        let heat_tick = self.rules.heat_tick_interval();
        self.scheduler.every(heat_tick, Self::heat_tick_all);
        self.scheduler.every(REGEN_INTERVAL, Self::regen_tick_all);
        self.scheduler.every(Duration::ZERO, Self::advance_on_timeout);
    }

    fn advance_on_timeout(&mut self) {
        let stage = self.stage();
        if matches!(stage, Stage::OutOfMatch | Stage::Pause) {
            return;
        }
        if self.scheduler.stage_time_left() <= TIME_EPSILON {
            debug!(%stage, "stage time limit reached");
            self.set_stage(stage.next());
        }
    }

    /// Advances the match by `dt`.
    ///
    /// Applies queued commands at the current time, advances the clock, fires
    /// due callbacks, then flushes the bus. Returns the number of callbacks
    /// fired.
    pub fn step(&mut self, dt: Duration) -> usize {
        self.drain_commands();
        self.clock.advance(dt);
        let fired = fire_due(self);
        metrics::record_match_time(self.time());
        self.bus.flush();
        fired
    }

    fn drain_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.commands_rx.try_recv() {
            if let Err(error) = self.apply(command) {
                warn!(%error, "command rejected");
            }
            applied += 1;
        }
        applied
    }

    /// Applies one command immediately.
    ///
    /// Armor hits and shots outside `Stage::Match` are ignored.
    ///
    /// # Errors
    ///
    /// Returns a `RulesError` for commands naming unknown entities or
    /// missing ruleset entries.
    pub fn apply(&mut self, command: Command) -> Result<(), RulesError> {
        debug!(?command, time = self.time(), "applying command");
        match command {
            Command::SetStage { stage } => {
                self.set_stage(stage);
            }
            Command::Pause => {
                self.pause();
            }
            Command::Resume => {
                self.resume();
            }
            Command::ArmorHit {
                attacker,
                victim,
                ammo,
                armor,
            } => {
                if self.stage() == Stage::Match {
                    self.on_armor_hit(attacker, victim, HitInfo { ammo, armor })?;
                } else {
                    debug!(%attacker, %victim, stage = %self.stage(), "hit outside match ignored");
                }
            }
            Command::Shot { shooter, ammo } => {
                if self.stage() == Stage::Match {
                    let outcome = self.on_shot(shooter, ammo)?;
                    debug!(%shooter, ?outcome, "shot");
                } else {
                    debug!(%shooter, stage = %self.stage(), "shot outside match ignored");
                }
            }
            Command::Revive { entity } => {
                self.try_revive(entity);
            }
            Command::ReviveProgress { entity, amount } => {
                self.add_revive_progress(entity, amount);
            }
            Command::Penalty { entity, penalty } => self.penalize(entity, penalty)?,
            Command::GrantAmmo { entity, amount } => {
                self.grant_ammo(entity, amount)?;
            }
            Command::AddBuff {
                entity,
                buff,
                value,
                duration,
                force,
            } => {
                self.buffs
                    .add_buff(entity, buff, value, duration.unwrap_or(Buff::PERMANENT), force);
            }
            Command::RemoveBuff { entity, buff } => self.buffs.remove_buff(entity, buff),
            Command::Reset => self.reset(),
        }
        Ok(())
    }

    // ========================================================================
    // Stages
    // ========================================================================

    /// Transitions to `stage` and publishes the change.
    ///
    /// Entering `Settlement` settles the match, once per round.
    pub fn set_stage(&mut self, stage: Stage) -> StageChange {
        let change = self.scheduler.set_stage(stage);
        self.on_stage_change(change);
        change
    }

    /// Pauses the match. Returns `None` if already paused.
    pub fn pause(&mut self) -> Option<StageChange> {
        let change = self.scheduler.pause()?;
        self.on_stage_change(change);
        Some(change)
    }

    /// Resumes the interrupted stage. Returns `None` if not paused.
    pub fn resume(&mut self) -> Option<StageChange> {
        let change = self.scheduler.resume()?;
        self.on_stage_change(change);
        Some(change)
    }

    fn on_stage_change(&mut self, change: StageChange) {
        self.publish(Notification::StageChanged {
            time: self.time(),
            from: change.from,
            to: change.to,
        });
        metrics::record_stage_transition(change.from, change.to);
        if change.to == Stage::Settlement && self.settlement.is_none() {
            self.settle();
        }
    }

    /// Ends the match early; takes effect on the next tick.
    pub(crate) fn schedule_settlement(&mut self) {
        self.scheduler.after(Duration::ZERO, |referee: &mut Self| {
            if referee.stage() == Stage::Match {
                referee.set_stage(Stage::Settlement);
            }
        });
    }
}

impl std::fmt::Debug for Referee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Referee")
            .field("round", &self.round)
            .field("time", &self.time())
            .field("stage", &self.stage())
            .field("ruleset", &self.rules.name())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
