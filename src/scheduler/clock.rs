//! Virtual match clock
//!
//! Shared, monotonically non-decreasing match time in seconds. The scheduler
//! is the only writer; the store and the buff ledger hold read handles to
//! evaluate TTLs and buff expiry lazily.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::warn;

/// Cloneable handle to the virtual match clock.
///
/// Time is stored as the bit pattern of an `f64` so readers never block.
#[derive(Clone, Default)]
pub struct MatchClock {
    bits: Arc<AtomicU64>,
}

impl MatchClock {
    /// Creates a clock at `t = 0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current match time in seconds.
    #[must_use]
    pub fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }

    /// Advances the clock by `dt`.
    ///
    /// Returns the new time.
    pub fn advance(&self, dt: Duration) -> f64 {
        self.advance_to(self.now() + dt.as_secs_f64())
    }

    /// Moves the clock forward to `t`.
    ///
    /// Requests that would move time backwards are ignored; the clock only
    /// rewinds through [`rewind`](Self::rewind) at round reset.
    pub fn advance_to(&self, t: f64) -> f64 {
        let now = self.now();
        if t < now || t.is_nan() {
            warn!(now, requested = t, "ignoring backwards clock advance");
            return now;
        }
        self.bits.store(t.to_bits(), Ordering::SeqCst);
        t
    }

    /// Resets the clock to zero. Only called when a round is reset.
    pub(crate) fn rewind(&self) {
        self.bits.store(0.0_f64.to_bits(), Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MatchClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchClock").field("now", &self.now()).finish()
    }
}
