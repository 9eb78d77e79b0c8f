//! Real-time driver
//!
//! Owns the [`Referee`] on a single task and steps it on a tokio interval.
//! Commands from the I/O side arrive on a feed channel and are queued on the
//! referee, so they take effect at the start of the next step. Every
//! notification flushed by a step is written to the event stream.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::Notification;
use crate::error::DriverError;
use crate::observability::EventEmitter;
use crate::referee::{Command, Referee};

/// Default step period.
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// Why [`Driver::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// The cancellation token fired.
    Cancelled,
    /// The command feed closed; queued commands were applied first.
    FeedClosed,
}

/// Steps a referee in real time.
pub struct Driver {
    referee: Referee,
    tick: Duration,
    cancel: CancellationToken,
    notifications: broadcast::Receiver<Notification>,
    emitter: Arc<EventEmitter>,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("tick", &self.tick)
            .field("time", &self.referee.time())
            .field("stage", &self.referee.stage())
            .finish_non_exhaustive()
    }
}

impl Driver {
    /// Creates a driver stepping `referee` every `tick`.
    ///
    /// A zero tick is raised to one millisecond.
    #[must_use]
    pub fn new(referee: Referee, tick: Duration, emitter: Arc<EventEmitter>) -> Self {
        let notifications = referee.subscribe();
        Self {
            referee,
            tick: tick.max(Duration::from_millis(1)),
            cancel: CancellationToken::new(),
            notifications,
            emitter,
        }
    }

    /// Replaces the cancellation token, for tying the driver to a parent.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The driven referee.
    #[must_use]
    pub const fn referee(&self) -> &Referee {
        &self.referee
    }

    /// Gives the referee back.
    #[must_use]
    pub fn into_referee(self) -> Referee {
        self.referee
    }

    /// Runs until cancelled or until `feed` closes.
    ///
    /// Each interval tick advances the match clock by the wall time elapsed
    /// since the previous tick.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::CallbackPanicked` if a scheduled callback
    /// panics; the round is halted and its pending notifications dropped.
    /// Returns `DriverError::ChannelClosed` if the referee's command queue
    /// is gone.
    pub async fn run(&mut self, mut feed: mpsc::Receiver<Command>) -> Result<DriverExit, DriverError> {
        let queue = self.referee.command_sender();
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = interval.tick().await;

        info!(tick = ?self.tick, stage = %self.referee.stage(), "driver started");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!(time = self.referee.time(), "driver cancelled");
                    return Ok(DriverExit::Cancelled);
                }
                command = feed.recv() => {
                    let Some(command) = command else {
                        debug!("command feed closed");
                        guarded_step(&mut self.referee, Duration::ZERO)?;
                        self.forward_notifications();
                        return Ok(DriverExit::FeedClosed);
                    };
                    queue.send(command).map_err(|_| DriverError::ChannelClosed)?;
                }
                now = interval.tick() => {
                    let dt = now.duration_since(last);
                    last = now;
                    guarded_step(&mut self.referee, dt)?;
                    self.forward_notifications();
                }
            }
        }
    }

    fn forward_notifications(&mut self) {
        loop {
            match self.notifications.try_recv() {
                Ok(notification) => self.emitter.emit_notification(notification),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream fell behind, notifications dropped");
                }
                Err(_) => break,
            }
        }
    }
}

/// Steps `referee` by `dt`, converting a callback panic into an error.
///
/// # Errors
///
/// Returns `DriverError::CallbackPanicked` with the panic message.
pub fn guarded_step(referee: &mut Referee, dt: Duration) -> Result<usize, DriverError> {
    let time = referee.time();
    std::panic::catch_unwind(AssertUnwindSafe(|| referee.step(dt))).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(time, %message, "scheduled callback panicked, halting round");
        referee.bus_mut().discard_pending();
        DriverError::CallbackPanicked { time, message }
    })
}
