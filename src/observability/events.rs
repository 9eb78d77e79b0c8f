//! Structured event stream.
//!
//! Run lifecycle events and every referee notification, serialized as
//! newline-delimited JSON with a monotonically increasing sequence number
//! and a wall-clock timestamp.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bus::Notification;
use crate::referee::{Referee, Settlement};
use crate::scheduler::Stage;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Script or input finished normally.
    Completed,
    /// Interrupted by SIGINT.
    Interrupted,
    /// Terminated by SIGTERM.
    Terminated,
    /// A scheduled callback failed and the round was halted.
    CallbackFailed,
}

/// State of the referee when a run stops.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Ruleset name.
    pub ruleset: String,
    /// Rounds started, counting the first.
    pub rounds: u64,
    /// Stage at the end of the run.
    pub stage: Stage,
    /// Match clock at the end of the run, in seconds.
    pub match_time: f64,
    /// Notifications published over the run.
    pub notifications: u64,
    /// Result of the last round, if it settled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Settlement>,
}

impl RunSummary {
    /// Captures the current state of `referee`.
    #[must_use]
    pub fn of(referee: &Referee) -> Self {
        Self {
            ruleset: referee.rules().name().to_string(),
            rounds: referee.round(),
            stage: referee.stage(),
            match_time: referee.time(),
            notifications: referee.bus().published_count(),
            settlement: referee.settlement(),
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ruleset={} rounds={} stage={} time={:.1}s notifications={}",
            self.ruleset, self.rounds, self.stage, self.match_time, self.notifications,
        )?;
        if let Some(settlement) = &self.settlement {
            match settlement.winner {
                Some(camp) => write!(f, " winner={camp}")?,
                None => f.write_str(" winner=draw")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event in the run log.
///
/// Tagged with `"event"`; referee notifications keep their own `"type"` tag
/// flattened alongside it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The driver started.
    DriverStarted {
        /// Wall-clock start time.
        timestamp: DateTime<Utc>,
        /// Ruleset name.
        ruleset: String,
        /// Registered entities.
        entities: usize,
        /// `"replay"` or `"serve"`.
        mode: String,
    },

    /// The driver stopped.
    DriverStopped {
        /// Wall-clock stop time.
        timestamp: DateTime<Utc>,
        /// Why the run stopped.
        reason: StopReason,
        /// Referee state at stop.
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<RunSummary>,
    },

    /// A referee notification.
    Notification {
        /// Wall-clock time the notification was logged.
        timestamp: DateTime<Utc>,
        /// The notification, flattened.
        #[serde(flatten)]
        notification: Notification,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each [`emit`](Self::emit) takes the next sequence number, writes one JSON
/// line and flushes. Serialization and I/O failures are dropped; the event
/// log must never stop the referee.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter over `writer`.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Emitter on stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Emitter on stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Emitter that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Emitter writing to a file at `path`, truncating it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Emits a referee notification stamped with the current wall time.
    pub fn emit_notification(&self, notification: Notification) {
        self.emit(Event::Notification {
            timestamp: Utc::now(),
            notification,
        });
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
