//! Match stages and per-stage time limits

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RulesError;

/// One phase of the match lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// No match in progress
    OutOfMatch,
    /// Teams repair robots
    Repair,
    /// Referee system self-check
    SelfCheck,
    /// Countdown before the match starts
    Countdown,
    /// The match itself
    Match,
    /// Results are computed and announced
    Settlement,
    /// Referee-initiated pause, outside the normal cycle
    Pause,
}

impl Stage {
    /// All stages in cycle order, with `Pause` last.
    pub const ALL: [Self; 7] = [
        Self::OutOfMatch,
        Self::Repair,
        Self::SelfCheck,
        Self::Countdown,
        Self::Match,
        Self::Settlement,
        Self::Pause,
    ];

    /// Successor in the match cycle.
    ///
    /// `Pause` has no successor of its own and maps to itself; leaving a
    /// pause goes through [`Scheduler::resume`](super::Scheduler::resume).
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::OutOfMatch => Self::Repair,
            Self::Repair => Self::SelfCheck,
            Self::SelfCheck => Self::Countdown,
            Self::Countdown => Self::Match,
            Self::Match => Self::Settlement,
            Self::Settlement => Self::OutOfMatch,
            Self::Pause => Self::Pause,
        }
    }

    /// Whether this stage belongs to the match cycle.
    #[must_use]
    pub const fn is_in_cycle(self) -> bool {
        !matches!(self, Self::Pause)
    }

    /// Canonical `snake_case` name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OutOfMatch => "out_of_match",
            Self::Repair => "repair",
            Self::SelfCheck => "self_check",
            Self::Countdown => "countdown",
            Self::Match => "match",
            Self::Settlement => "settlement",
            Self::Pause => "pause",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == wanted)
            .ok_or_else(|| RulesError::UnknownStage(s.to_string()))
    }
}

/// Time limit of each stage, in seconds.
///
/// Stages without an entry never run out of time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageLimits {
    limits: Vec<(Stage, f64)>,
}

impl StageLimits {
    /// Builds limits from `(stage, seconds)` pairs.
    #[must_use]
    pub fn new(limits: impl IntoIterator<Item = (Stage, f64)>) -> Self {
        Self {
            limits: limits.into_iter().collect(),
        }
    }

    /// Limit for `stage`, or `+inf` when unset.
    #[must_use]
    pub fn limit(&self, stage: Stage) -> f64 {
        self.limits
            .iter()
            .find(|(s, _)| *s == stage)
            .map_or(f64::INFINITY, |(_, secs)| *secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_returns_to_start() {
        let mut stage = Stage::OutOfMatch;
        for _ in 0..6 {
            stage = stage.next();
            assert!(stage.is_in_cycle());
        }
        assert_eq!(stage, Stage::OutOfMatch);
    }

    #[test]
    fn test_pause_is_outside_cycle() {
        assert!(!Stage::Pause.is_in_cycle());
        assert_eq!(Stage::Pause.next(), Stage::Pause);
        assert!(Stage::ALL.iter().all(|s| s.next() != Stage::Pause));
    }

    #[test]
    fn test_parse_stage() {
        assert_eq!("self-check".parse::<Stage>().unwrap(), Stage::SelfCheck);
        assert_eq!("Match".parse::<Stage>().unwrap(), Stage::Match);
        assert!(matches!(
            "overtime".parse::<Stage>(),
            Err(RulesError::UnknownStage(_))
        ));
    }

    #[test]
    fn test_limits_default_to_infinite() {
        let limits = StageLimits::new([(Stage::Match, 420.0)]);
        assert!((limits.limit(Stage::Match) - 420.0).abs() < f64::EPSILON);
        assert!(limits.limit(Stage::Repair).is_infinite());
    }
}
