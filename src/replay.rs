//! Deterministic replay
//!
//! A replay script is a YAML document with a total `duration`, a step `tick`
//! and a list of timed commands:
//!
//! ```yaml
//! duration: 10s
//! tick: 100ms
//! events:
//!   - at: 0s
//!     command: { type: set_stage, stage: match }
//!   - at: 2s
//!     command: { type: armor_hit, attacker: blue:1, victim: red:1, ammo: small }
//! ```
//!
//! The script clock is independent of the match clock, which a `reset`
//! command rewinds. Identical scripts over identical configuration produce
//! identical notifications.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bus::Notification;
use crate::config::{ConfigLimits, LoadWarning, read_yaml};
use crate::driver::guarded_step;
use crate::error::{ConfigError, DriverError};
use crate::observability::{EventEmitter, RunSummary};
use crate::referee::{Command, Referee};

/// A scripted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
    /// Total script time
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Step size
    #[serde(default = "default_tick", with = "humantime_serde")]
    pub tick: Duration,

    /// Commands and when to apply them
    #[serde(default)]
    pub events: Vec<TimedCommand>,
}

/// One command on the script timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimedCommand {
    /// Script time the command is applied at
    #[serde(with = "humantime_serde")]
    pub at: Duration,

    /// The command
    pub command: Command,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Referee state at the end of the script
    pub summary: RunSummary,
    /// Commands applied
    pub applied: usize,
    /// Commands the referee rejected
    pub rejected: usize,
    /// Commands scheduled after the end of the script
    pub skipped: usize,
    /// Every notification, in delivery order
    pub notifications: Vec<Notification>,
}

const fn default_tick() -> Duration {
    Duration::from_millis(100)
}

impl ReplayScript {
    /// Loads a script with the configuration loader's conventions.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, or if
    /// `tick` is zero.
    pub fn load(path: &Path, limits: &ConfigLimits) -> Result<(Self, Vec<LoadWarning>), ConfigError> {
        let (script, warnings): (Self, _) = read_yaml(path, limits)?;
        script.check()?;
        Ok((script, warnings))
    }

    /// Parses a script from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on a parse error or a zero `tick`.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let script: Self = serde_yaml::from_str(text).map_err(|e| ConfigError::ParseError {
            path: "<replay>".into(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;
        script.check()?;
        Ok(script)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.tick.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "tick".to_string(),
                value: "0s".to_string(),
                expected: "a positive duration".to_string(),
            });
        }
        Ok(())
    }
}

/// Plays `script` against `referee`.
///
/// Commands due at or before the current script time are applied, then the
/// referee is stepped by one tick (the last step is shortened to end exactly
/// at `duration`). A final zero-length step delivers commands scheduled at
/// `duration` itself. Every delivered notification is recorded and, when an
/// emitter is given, written to the event stream.
///
/// # Errors
///
/// Returns `DriverError::CallbackPanicked` if a scheduled callback panics.
pub fn run_replay(
    referee: &mut Referee,
    script: &ReplayScript,
    emitter: Option<&EventEmitter>,
) -> Result<ReplayReport, DriverError> {
    let mut timeline: Vec<&TimedCommand> = script.events.iter().collect();
    timeline.sort_by_key(|event| event.at);
    let mut pending = timeline.into_iter().peekable();

    let mut rx = referee.subscribe();
    let mut notifications = Vec::new();
    let mut collect = |rx: &mut tokio::sync::broadcast::Receiver<Notification>| {
        while let Ok(notification) = rx.try_recv() {
            if let Some(emitter) = emitter {
                emitter.emit_notification(notification.clone());
            }
            notifications.push(notification);
        }
    };

    let (mut applied, mut rejected) = (0, 0);
    let mut apply_due = |referee: &mut Referee, elapsed: Duration| {
        while let Some(event) = pending.next_if(|e| e.at <= elapsed) {
            applied += 1;
            if let Err(error) = referee.apply(event.command.clone()) {
                warn!(%error, at = ?event.at, "replay command rejected");
                rejected += 1;
            }
        }
    };

    info!(
        duration = ?script.duration,
        tick = ?script.tick,
        commands = script.events.len(),
        "replay started"
    );

    let mut elapsed = Duration::ZERO;
    while elapsed < script.duration {
        apply_due(referee, elapsed);
        let dt = script.tick.min(script.duration - elapsed);
        guarded_step(referee, dt)?;
        elapsed += dt;
        collect(&mut rx);
    }
    apply_due(referee, elapsed);
    guarded_step(referee, Duration::ZERO)?;
    collect(&mut rx);

    let skipped = pending.count();
    if skipped > 0 {
        debug!(skipped, "commands after the end of the script were skipped");
    }

    let summary = RunSummary::of(referee);
    info!(%summary, applied, rejected, "replay finished");

    Ok(ReplayReport {
        summary,
        applied: applied - rejected,
        rejected,
        skipped,
        notifications,
    })
}
