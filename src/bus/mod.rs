//! Result notifications and their fan-out.
//!
//! Publishing only enqueues. [`EventBus::flush`] delivers the queue to every
//! subscriber in publish order. The referee flushes once per step, so
//! subscribers never observe a half-applied tick.

use std::collections::VecDeque;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::combat::{HitInfo, Penalty};
use crate::identity::{Camp, Identity};
use crate::referee::SettleReason;
use crate::scheduler::Stage;

/// Default broadcast buffer per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

// ============================================================================
// Notifications
// ============================================================================

/// A result emitted by the referee core.
///
/// Every variant carries the match time it was published at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// The match stage changed.
    StageChanged {
        /// Match time
        time: f64,
        /// Stage that was left
        from: Stage,
        /// Stage that was entered
        to: Stage,
    },

    /// An entity's health reached zero.
    Killed {
        /// Match time
        time: f64,
        /// Who dealt the final damage (`judge:0` for penalties)
        source: Identity,
        /// Who died
        victim: Identity,
    },

    /// A dead entity came back.
    Revived {
        /// Match time
        time: f64,
        /// Revived entity
        entity: Identity,
    },

    /// An armor hit removed health.
    Damaged {
        /// Match time
        time: f64,
        /// Shooter
        attacker: Identity,
        /// Target
        victim: Identity,
        /// Health actually removed
        amount: u32,
        /// Hit classification
        hit: HitInfo,
    },

    /// A referee penalty was issued.
    Penalized {
        /// Match time
        time: f64,
        /// Penalized entity
        entity: Identity,
        /// Kind of penalty
        penalty: Penalty,
    },

    /// The match has a result.
    MatchSettled {
        /// Match time
        time: f64,
        /// Winning camp, `None` for a draw
        winner: Option<Camp>,
        /// How the result was decided
        reason: SettleReason,
    },

    /// A new round started from clean state.
    RoundReset {
        /// Match time (always zero)
        time: f64,
    },

    /// Heat passed twice the rated maximum and cost health.
    Overheated {
        /// Match time
        time: f64,
        /// Overheated entity
        entity: Identity,
        /// Heat before clamping
        heat: f64,
        /// Health removed
        penalty: u32,
    },
}

impl Notification {
    /// Match time the notification was published at.
    #[must_use]
    pub const fn time(&self) -> f64 {
        match self {
            Self::StageChanged { time, .. }
            | Self::Killed { time, .. }
            | Self::Revived { time, .. }
            | Self::Damaged { time, .. }
            | Self::Penalized { time, .. }
            | Self::MatchSettled { time, .. }
            | Self::RoundReset { time }
            | Self::Overheated { time, .. } => *time,
        }
    }

    /// Short kind name, used as a log field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StageChanged { .. } => "stage_changed",
            Self::Killed { .. } => "killed",
            Self::Revived { .. } => "revived",
            Self::Damaged { .. } => "damaged",
            Self::Penalized { .. } => "penalized",
            Self::MatchSettled { .. } => "match_settled",
            Self::RoundReset { .. } => "round_reset",
            Self::Overheated { .. } => "overheated",
        }
    }
}

// ============================================================================
// Bus
// ============================================================================

/// Publish queue plus broadcast fan-out.
#[derive(Debug)]
pub struct EventBus {
    queue: VecDeque<Notification>,
    sender: broadcast::Sender<Notification>,
    published: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus whose subscribers buffer up to `capacity` notifications.
    ///
    /// A subscriber that falls further behind observes a lag error and skips
    /// ahead; publishing never blocks.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            queue: VecDeque::new(),
            sender,
            published: 0,
        }
    }

    /// Enqueues a notification for the next flush.
    pub fn publish(&mut self, notification: Notification) {
        trace!(kind = notification.kind(), "notification queued");
        self.published += 1;
        self.queue.push_back(notification);
    }

    /// Delivers every queued notification, in publish order.
    ///
    /// Returns the number delivered. Having no subscribers is not an error.
    pub fn flush(&mut self) -> usize {
        let count = self.queue.len();
        for notification in self.queue.drain(..) {
            let _ = self.sender.send(notification);
        }
        count
    }

    /// Subscribes to notifications flushed from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Notifications queued but not yet flushed.
    pub fn pending(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    /// Total notifications published since creation.
    #[must_use]
    pub const fn published_count(&self) -> u64 {
        self.published
    }

    /// Drops queued notifications without delivering them.
    pub fn discard_pending(&mut self) {
        self.queue.clear();
    }
}
