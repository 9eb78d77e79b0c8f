//! Configuration schema types
//!
//! A configuration file has two sections: the `ruleset` (numbers of one
//! competition) and the `roster` (entities taking part). Names of entity
//! kinds, ammo types and stages are kept as strings here and checked by the
//! validator, so a typo produces a suggestion instead of a parse error.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::ArmorId;
use crate::identity::Identity;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JudgeConfig {
    /// Competition rules
    pub ruleset: RulesetConfig,

    /// Entities keyed by identity (`"red:1"`)
    #[serde(default)]
    pub roster: IndexMap<Identity, EntityConfig>,
}

/// A duration written as a humantime string (`"7min"`, `"100ms"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HumanDuration(#[serde(with = "humantime_serde")] pub Duration);

// ============================================================================
// Ruleset
// ============================================================================

/// Numbers of one competition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesetConfig {
    /// Ruleset name
    pub name: String,

    /// Stage time limits keyed by stage name; stages left out never time out
    #[serde(default)]
    pub stages: IndexMap<String, HumanDuration>,

    /// Max health per entity kind, indexed by level (1-based)
    #[serde(default)]
    pub health: IndexMap<String, Vec<u32>>,

    /// Heat model
    #[serde(default)]
    pub heat: HeatConfig,

    /// Damage table, most specific matching row wins
    #[serde(default)]
    pub damage: Vec<DamageRule>,

    /// Revive rules
    #[serde(default)]
    pub revive: ReviveConfig,

    /// Penalty rules
    #[serde(default)]
    pub penalties: PenaltyConfig,
}

/// Heat and cooldown tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeatConfig {
    /// Period of the cooldown tick
    #[serde(default = "default_heat_tick", with = "humantime_serde")]
    pub tick: Duration,

    /// Rated max heat (`Q0`) per entity kind, indexed by level
    #[serde(default)]
    pub max: IndexMap<String, Vec<f64>>,

    /// Heat removed per second per entity kind, indexed by level
    #[serde(default)]
    pub cooldown: IndexMap<String, Vec<f64>>,

    /// Heat added per shot, by ammo type
    #[serde(default)]
    pub increment: IndexMap<String, f64>,

    /// `Q2 - Q0` by ammo type
    #[serde(default)]
    pub margin: IndexMap<String, f64>,

    /// Fraction of max health lost per heat unit above `2·Q0`
    #[serde(default = "default_overheat_penalty_ratio")]
    pub overheat_penalty_ratio: f64,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            tick: default_heat_tick(),
            max: IndexMap::new(),
            cooldown: IndexMap::new(),
            increment: IndexMap::new(),
            margin: IndexMap::new(),
            overheat_penalty_ratio: default_overheat_penalty_ratio(),
        }
    }
}

/// One row of the damage table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DamageRule {
    /// Ammo type the row applies to
    pub ammo: String,

    /// Victim kind; any kind when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim: Option<String>,

    /// Armor plate; any plate when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor: Option<ArmorId>,

    /// Base damage
    pub amount: u32,
}

/// Revive rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviveConfig {
    /// Fraction of max health restored
    #[serde(default = "default_revive_health_fraction")]
    pub health_fraction: f64,

    /// Invincibility granted after revive
    #[serde(default = "default_revive_invincible", with = "humantime_serde")]
    pub invincible: Duration,

    /// Revive progress needed before a revive is allowed; zero disables the gate
    #[serde(default)]
    pub progress_required: f64,
}

impl Default for ReviveConfig {
    fn default() -> Self {
        Self {
            health_fraction: default_revive_health_fraction(),
            invincible: default_revive_invincible(),
            progress_required: 0.0,
        }
    }
}

/// Penalty rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PenaltyConfig {
    /// Weapon lock of a yellow card
    #[serde(default = "default_yellow_lock", with = "humantime_serde")]
    pub yellow_lock: Duration,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            yellow_lock: default_yellow_lock(),
        }
    }
}

// ============================================================================
// Roster
// ============================================================================

/// One roster entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    /// Entity kind name
    pub kind: String,

    /// Level, starting at 1
    #[serde(default = "default_level")]
    pub level: u8,

    /// Whether a controller is assigned
    #[serde(default = "default_controller")]
    pub controller: bool,

    /// Mounted weapon's ammo type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<String>,

    /// Ammo allowance at round start
    #[serde(default)]
    pub ammo: u32,
}

// ============================================================================
// Defaults
// ============================================================================

const fn default_heat_tick() -> Duration {
    Duration::from_millis(100)
}

const fn default_overheat_penalty_ratio() -> f64 {
    0.004
}

const fn default_revive_health_fraction() -> f64 {
    0.1
}

const fn default_revive_invincible() -> Duration {
    Duration::from_secs(3)
}

const fn default_yellow_lock() -> Duration {
    Duration::from_secs(5)
}

const fn default_level() -> u8 {
    1
}

const fn default_controller() -> bool {
    true
}
