//! Time and stage scheduler
//!
//! Owns the virtual match clock, the match stage machine, and the registry
//! of deferred and periodic callbacks.
//!
//! # Architecture
//!
//! - [`MatchClock`] - shared virtual time, read by the store and buff ledger
//! - [`Stage`] / [`StageLimits`] - stage cycle and configured time limits
//! - [`Scheduler`] - stage state plus one ordered registry of callbacks
//! - [`fire_due`] - runs every due callback against the owning context
//!
//! Callbacks take `&mut C`, where `C` is the context that owns the scheduler
//! (see [`Scheduled`]). All evaluation is driven by clock advances, so two
//! runs fed the same advances fire the same callbacks in the same order.

pub mod clock;
pub mod stage;

use std::time::Duration;

use tracing::{debug, info};

pub use clock::MatchClock;
pub use stage::{Stage, StageLimits};

/// A scheduled callback. Runs to completion on the scheduler's thread.
pub type Callback<C> = Box<dyn FnMut(&mut C) + Send>;

/// Handle returned by every registration, usable with [`Scheduler::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Stage transition reported by [`Scheduler::set_stage`] and friends.
///
/// The scheduler does not publish it; the owning context does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageChange {
    /// Stage that was left
    pub from: Stage,
    /// Stage that was entered
    pub to: Stage,
}

/// Slack when comparing clock times, so that repeated `0.1 s` advances
/// still meet a `0.1 s` interval despite rounding.
pub const TIME_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Every { interval: f64, last_fired: f64 },
    After { due: f64 },
    AtStage { stage: Stage, elapsed: f64 },
}

impl Trigger {
    fn is_due(&self, now: f64, stage: Stage, stage_elapsed: f64) -> bool {
        match *self {
            Self::Every {
                interval,
                last_fired,
            } => now - last_fired + TIME_EPSILON >= interval,
            Self::After { due } => now + TIME_EPSILON >= due,
            Self::AtStage {
                stage: wanted,
                elapsed,
            } => stage == wanted && stage_elapsed + TIME_EPSILON >= elapsed,
        }
    }

    const fn is_repeating(&self) -> bool {
        matches!(self, Self::Every { .. })
    }
}

struct Registration<C> {
    id: TaskId,
    trigger: Trigger,
    callback: Callback<C>,
}

/// A context that owns a [`Scheduler`] over itself.
pub trait Scheduled: Sized {
    /// Returns the scheduler driving this context.
    fn scheduler(&mut self) -> &mut Scheduler<Self>;
}

/// Stage machine plus callback registry.
pub struct Scheduler<C> {
    clock: MatchClock,
    stage: Stage,
    stage_started_at: f64,
    /// Stage and elapsed time saved when entering `Pause`
    paused: Option<(Stage, f64)>,
    limits: StageLimits,
    registrations: Vec<Registration<C>>,
    /// Cancelled while their registration was checked out for a tick
    cancelled: Vec<TaskId>,
    next_id: u64,
    /// Bumped by `reset`, so a tick can tell its registrations were dropped
    epoch: u64,
}

impl<C> Scheduler<C> {
    /// Creates a scheduler in `OutOfMatch` with no registrations.
    #[must_use]
    pub fn new(clock: MatchClock, limits: StageLimits) -> Self {
        let stage_started_at = clock.now();
        Self {
            clock,
            stage: Stage::OutOfMatch,
            stage_started_at,
            paused: None,
            limits,
            registrations: Vec::new(),
            cancelled: Vec::new(),
            next_id: 0,
            epoch: 0,
        }
    }

    /// The clock this scheduler reads.
    #[must_use]
    pub const fn clock(&self) -> &MatchClock {
        &self.clock
    }

    /// Current match time in seconds.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.now()
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Seconds since the current stage began.
    #[must_use]
    pub fn stage_elapsed(&self) -> f64 {
        self.clock.now() - self.stage_started_at
    }

    /// Seconds left in the current stage; `+inf` out of match.
    #[must_use]
    pub fn stage_time_left(&self) -> f64 {
        if self.stage == Stage::OutOfMatch {
            return f64::INFINITY;
        }
        self.limits.limit(self.stage) - self.stage_elapsed()
    }

    /// Configured stage limits.
    #[must_use]
    pub const fn limits(&self) -> &StageLimits {
        &self.limits
    }

    /// Number of pending registrations.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.registrations.len()
    }

    /// Transitions to `stage` and restarts the stage timer.
    pub fn set_stage(&mut self, stage: Stage) -> StageChange {
        let from = self.stage;
        if stage == Stage::Pause {
            if from != Stage::Pause {
                self.paused = Some((from, self.stage_elapsed()));
            }
        } else {
            self.paused = None;
        }
        self.stage = stage;
        self.stage_started_at = self.clock.now();
        info!(%from, to = %stage, time = self.clock.now(), "stage transition");
        StageChange { from, to: stage }
    }

    /// Enters `Pause`, remembering the current stage and its elapsed time.
    ///
    /// Returns `None` if already paused.
    pub fn pause(&mut self) -> Option<StageChange> {
        if self.stage == Stage::Pause {
            return None;
        }
        Some(self.set_stage(Stage::Pause))
    }

    /// Leaves `Pause` and returns to the stage that was interrupted, keeping
    /// the elapsed time it had when the pause started.
    ///
    /// Returns `None` if not paused.
    pub fn resume(&mut self) -> Option<StageChange> {
        if self.stage != Stage::Pause {
            return None;
        }
        let (stage, elapsed) = self.paused.take().unwrap_or((Stage::OutOfMatch, 0.0));
        self.stage = stage;
        self.stage_started_at = self.clock.now() - elapsed;
        info!(to = %stage, elapsed, "resumed from pause");
        Some(StageChange {
            from: Stage::Pause,
            to: stage,
        })
    }

    /// Registers `callback` to fire every `interval`, in every stage.
    pub fn every(&mut self, interval: Duration, callback: impl FnMut(&mut C) + Send + 'static) -> TaskId {
        let trigger = Trigger::Every {
            interval: interval.as_secs_f64(),
            last_fired: self.clock.now(),
        };
        self.register(trigger, Box::new(callback))
    }

    /// Registers `callback` to fire once, `delay` after now.
    pub fn after(&mut self, delay: Duration, callback: impl FnMut(&mut C) + Send + 'static) -> TaskId {
        let trigger = Trigger::After {
            due: self.clock.now() + delay.as_secs_f64(),
        };
        self.register(trigger, Box::new(callback))
    }

    /// Registers `callback` to fire once, the first tick that the match is in
    /// `stage` with at least `elapsed` spent in it.
    pub fn at_stage(
        &mut self,
        stage: Stage,
        elapsed: Duration,
        callback: impl FnMut(&mut C) + Send + 'static,
    ) -> TaskId {
        let trigger = Trigger::AtStage {
            stage,
            elapsed: elapsed.as_secs_f64(),
        };
        self.register(trigger, Box::new(callback))
    }

    fn register(&mut self, trigger: Trigger, callback: Callback<C>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        debug!(task = id.0, ?trigger, "callback registered");
        self.registrations.push(Registration {
            id,
            trigger,
            callback,
        });
        id
    }

    /// Cancels a pending registration.
    ///
    /// Has no effect on a callback that is already running.
    pub fn cancel(&mut self, id: TaskId) {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        if self.registrations.len() == before {
            // Possibly checked out by an in-progress tick.
            self.cancelled.push(id);
        }
    }

    /// Drops every registration and returns to `OutOfMatch`.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.registrations.clear();
        self.cancelled.clear();
        self.stage = Stage::OutOfMatch;
        self.stage_started_at = self.clock.now();
        self.paused = None;
        debug!(epoch = self.epoch, "scheduler reset");
    }

    /// Replaces the stage limits (ruleset reload between rounds).
    pub fn set_limits(&mut self, limits: StageLimits) {
        self.limits = limits;
    }
}

impl<C> std::fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("time", &self.clock.now())
            .field("stage", &self.stage)
            .field("stage_elapsed", &self.stage_elapsed())
            .field("pending", &self.registrations.len())
            .finish_non_exhaustive()
    }
}

/// Fires every due registration against `ctx`, in registration order.
///
/// Registrations made while firing become eligible on the next call. If a
/// callback resets the scheduler, the remaining registrations of this tick
/// are dropped with the rest.
///
/// Returns the number of callbacks fired.
pub fn fire_due<C: Scheduled>(ctx: &mut C) -> usize {
    let scheduler = ctx.scheduler();
    let epoch = scheduler.epoch;
    let checked_out = std::mem::take(&mut scheduler.registrations);
    let mut kept = Vec::with_capacity(checked_out.len());
    let mut fired = 0;

    for mut reg in checked_out {
        let scheduler = ctx.scheduler();
        if scheduler.epoch != epoch {
            break;
        }
        if let Some(pos) = scheduler.cancelled.iter().position(|id| *id == reg.id) {
            scheduler.cancelled.swap_remove(pos);
            continue;
        }

        let now = scheduler.clock.now();
        if !reg.trigger.is_due(now, scheduler.stage, scheduler.stage_elapsed()) {
            kept.push(reg);
            continue;
        }

        (reg.callback)(ctx);
        fired += 1;

        if let Trigger::Every { last_fired, .. } = &mut reg.trigger {
            *last_fired = now;
        }
        if reg.trigger.is_repeating() {
            kept.push(reg);
        }
    }

    let scheduler = ctx.scheduler();
    if scheduler.epoch == epoch {
        // Callbacks registered during this tick go after the survivors.
        kept.append(&mut scheduler.registrations);
        kept.retain(|r| !scheduler.cancelled.contains(&r.id));
        scheduler.registrations = kept;
    }
    scheduler.cancelled.clear();
    fired
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx {
        scheduler: Scheduler<Self>,
        log: Vec<String>,
    }

    impl Scheduled for Ctx {
        fn scheduler(&mut self) -> &mut Scheduler<Self> {
            &mut self.scheduler
        }
    }

    fn ctx() -> Ctx {
        Ctx {
            scheduler: Scheduler::new(
                MatchClock::new(),
                StageLimits::new([(Stage::Countdown, 5.0), (Stage::Match, 420.0)]),
            ),
            log: Vec::new(),
        }
    }

    fn step(ctx: &mut Ctx, secs: f64) -> usize {
        ctx.scheduler.clock().advance(Duration::from_secs_f64(secs));
        fire_due(ctx)
    }

    #[test]
    fn test_new_scheduler_out_of_match() {
        let c = ctx();
        assert_eq!(c.scheduler.stage(), Stage::OutOfMatch);
        assert!(c.scheduler.stage_time_left().is_infinite());
        assert_eq!(c.scheduler.pending(), 0);
    }

    #[test]
    fn test_set_stage_resets_elapsed() {
        let mut c = ctx();
        step(&mut c, 3.0);
        let change = c.scheduler.set_stage(Stage::Countdown);
        assert_eq!(change.from, Stage::OutOfMatch);
        assert_eq!(change.to, Stage::Countdown);
        assert!(c.scheduler.stage_elapsed().abs() < 1e-9);
        step(&mut c, 2.0);
        assert!((c.scheduler.stage_time_left() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_after_fires_once() {
        let mut c = ctx();
        c.scheduler
            .after(Duration::from_secs(2), |c: &mut Ctx| c.log.push("once".into()));
        assert_eq!(step(&mut c, 1.0), 0);
        assert_eq!(step(&mut c, 1.0), 1);
        assert_eq!(step(&mut c, 5.0), 0);
        assert_eq!(c.log, vec!["once"]);
        assert_eq!(c.scheduler.pending(), 0);
    }

    #[test]
    fn test_every_fires_each_interval() {
        let mut c = ctx();
        c.scheduler
            .every(Duration::from_millis(500), |c: &mut Ctx| c.log.push("tick".into()));
        for _ in 0..10 {
            step(&mut c, 0.25);
        }
        assert_eq!(c.log.len(), 5);
        assert_eq!(c.scheduler.pending(), 1);
    }

    #[test]
    fn test_every_fires_once_per_tick_after_jump() {
        let mut c = ctx();
        c.scheduler
            .every(Duration::from_millis(100), |c: &mut Ctx| c.log.push("tick".into()));
        step(&mut c, 1.0);
        assert_eq!(c.log.len(), 1);
    }

    #[test]
    fn test_at_stage_waits_for_stage() {
        let mut c = ctx();
        c.scheduler
            .at_stage(Stage::Match, Duration::from_secs(10), |c: &mut Ctx| {
                c.log.push("ten seconds in".into());
            });
        step(&mut c, 30.0);
        assert!(c.log.is_empty());
        c.scheduler.set_stage(Stage::Match);
        step(&mut c, 9.0);
        assert!(c.log.is_empty());
        step(&mut c, 1.0);
        assert_eq!(c.log, vec!["ten seconds in"]);
    }

    #[test]
    fn test_at_stage_already_satisfied_fires_next_tick() {
        let mut c = ctx();
        c.scheduler.set_stage(Stage::Match);
        step(&mut c, 20.0);
        c.scheduler
            .at_stage(Stage::Match, Duration::from_secs(5), |c: &mut Ctx| {
                c.log.push("late".into());
            });
        assert_eq!(fire_due(&mut c), 1);
        assert_eq!(c.log, vec!["late"]);
    }

    #[test]
    fn test_same_tick_fires_in_registration_order() {
        let mut c = ctx();
        c.scheduler
            .after(Duration::from_secs(1), |c: &mut Ctx| c.log.push("a".into()));
        c.scheduler
            .every(Duration::from_secs(1), |c: &mut Ctx| c.log.push("b".into()));
        c.scheduler
            .after(Duration::from_millis(500), |c: &mut Ctx| c.log.push("c".into()));
        step(&mut c, 1.0);
        assert_eq!(c.log, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_registration_during_tick_waits_for_next_tick() {
        let mut c = ctx();
        c.scheduler.after(Duration::ZERO, |c: &mut Ctx| {
            c.log.push("outer".into());
            c.scheduler
                .after(Duration::ZERO, |c: &mut Ctx| c.log.push("inner".into()));
        });
        assert_eq!(fire_due(&mut c), 1);
        assert_eq!(c.log, vec!["outer"]);
        assert_eq!(fire_due(&mut c), 1);
        assert_eq!(c.log, vec!["outer", "inner"]);
    }

    #[test]
    fn test_reset_inside_callback_drops_rest_of_tick() {
        let mut c = ctx();
        c.scheduler.after(Duration::ZERO, |c: &mut Ctx| {
            c.log.push("reset".into());
            c.scheduler.reset();
            c.scheduler
                .after(Duration::ZERO, |c: &mut Ctx| c.log.push("fresh".into()));
        });
        c.scheduler
            .after(Duration::ZERO, |c: &mut Ctx| c.log.push("stale".into()));
        fire_due(&mut c);
        assert_eq!(c.log, vec!["reset"]);
        assert_eq!(c.scheduler.pending(), 1);
        fire_due(&mut c);
        assert_eq!(c.log, vec!["reset", "fresh"]);
    }

    #[test]
    fn test_cancel_pending() {
        let mut c = ctx();
        let id = c
            .scheduler
            .after(Duration::from_secs(1), |c: &mut Ctx| c.log.push("x".into()));
        c.scheduler.cancel(id);
        step(&mut c, 2.0);
        assert!(c.log.is_empty());
    }

    #[test]
    fn test_cancel_from_inside_tick() {
        let mut c = ctx();
        let victim = TaskId(1);
        c.scheduler.after(Duration::ZERO, move |c: &mut Ctx| {
            c.scheduler.cancel(victim);
        });
        let id = c
            .scheduler
            .every(Duration::ZERO, |c: &mut Ctx| c.log.push("repeat".into()));
        assert_eq!(id, victim);
        fire_due(&mut c);
        fire_due(&mut c);
        assert!(c.log.is_empty());
        assert_eq!(c.scheduler.pending(), 0);
    }

    #[test]
    fn test_pause_and_resume_keep_elapsed() {
        let mut c = ctx();
        c.scheduler.set_stage(Stage::Match);
        step(&mut c, 100.0);
        assert!(c.scheduler.pause().is_some());
        assert!(c.scheduler.pause().is_none());
        step(&mut c, 50.0);
        let change = c.scheduler.resume().unwrap();
        assert_eq!(change.to, Stage::Match);
        assert!((c.scheduler.stage_elapsed() - 100.0).abs() < 1e-9);
        assert!(c.scheduler.resume().is_none());
    }

    #[test]
    fn test_reset_returns_to_out_of_match() {
        let mut c = ctx();
        c.scheduler.set_stage(Stage::Match);
        c.scheduler.every(Duration::from_secs(1), |_: &mut Ctx| {});
        c.scheduler.reset();
        assert_eq!(c.scheduler.stage(), Stage::OutOfMatch);
        assert_eq!(c.scheduler.pending(), 0);
    }
}
