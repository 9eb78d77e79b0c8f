//! Configuration validation
//!
//! Semantic checks on a deserialized [`JudgeConfig`]. Validation collects
//! every issue instead of stopping at the first, and suggests the closest
//! known name for misspelled kinds, ammo types and stages.

use crate::config::loader::ConfigLimits;
use crate::config::schema::{DamageRule, EntityConfig, HeatConfig, JudgeConfig, RulesetConfig};
use crate::entity::{AmmoType, EntityKind};
use crate::error::{Severity, ValidationIssue};
use crate::identity::{Camp, Identity};
use crate::scheduler::Stage;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &JudgeConfig, limits: &ConfigLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_ruleset(&config.ruleset);
        self.validate_roster(config, limits);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Ruleset
    // ========================================================================

    fn validate_ruleset(&mut self, ruleset: &RulesetConfig) {
        if ruleset.name.trim().is_empty() {
            self.add_warning("ruleset.name", "ruleset name is empty");
        }

        for (name, limit) in &ruleset.stages {
            let path = format!("ruleset.stages.{name}");
            if name.parse::<Stage>().is_err() {
                let names = Stage::ALL.map(Stage::as_str);
                self.add_error(&path, &unknown("stage", name, &names));
            } else if limit.0.is_zero() {
                self.add_warning(&path, "zero time limit, the stage ends on the next tick");
            }
        }

        for (kind, levels) in &ruleset.health {
            let path = format!("ruleset.health.{kind}");
            self.check_kind(&path, kind);
            if levels.is_empty() {
                self.add_error(&path, "level table is empty");
            } else if levels.contains(&0) {
                self.add_warning(&path, "zero max health, entities of this kind start dead");
            }
        }

        self.validate_heat(&ruleset.heat);

        for (i, rule) in ruleset.damage.iter().enumerate() {
            self.validate_damage_rule(&format!("ruleset.damage[{i}]"), rule);
        }

        let revive = &ruleset.revive;
        if !(revive.health_fraction > 0.0 && revive.health_fraction <= 1.0) {
            self.add_error(
                "ruleset.revive.health_fraction",
                &format!("must be in (0, 1], got {}", revive.health_fraction),
            );
        }
        if revive.progress_required < 0.0 {
            self.add_error("ruleset.revive.progress_required", "must not be negative");
        }
    }

    fn validate_heat(&mut self, heat: &HeatConfig) {
        if heat.tick.is_zero() {
            self.add_error("ruleset.heat.tick", "cooldown tick must be greater than zero");
        }
        if !(0.0..=1.0).contains(&heat.overheat_penalty_ratio) {
            self.add_error(
                "ruleset.heat.overheat_penalty_ratio",
                &format!("must be in [0, 1], got {}", heat.overheat_penalty_ratio),
            );
        }

        for (table, values) in [("max", &heat.max), ("cooldown", &heat.cooldown)] {
            for (kind, levels) in values {
                let path = format!("ruleset.heat.{table}.{kind}");
                self.check_kind(&path, kind);
                if levels.is_empty() {
                    self.add_error(&path, "level table is empty");
                } else if levels.iter().any(|v| *v < 0.0) {
                    self.add_error(&path, "values must not be negative");
                }
            }
        }

        for (table, values) in [("increment", &heat.increment), ("margin", &heat.margin)] {
            for (ammo, value) in values {
                let path = format!("ruleset.heat.{table}.{ammo}");
                self.check_ammo(&path, ammo);
                if *value < 0.0 {
                    self.add_error(&path, "must not be negative");
                }
            }
        }
    }

    fn validate_damage_rule(&mut self, path: &str, rule: &DamageRule) {
        self.check_ammo(&format!("{path}.ammo"), &rule.ammo);
        if let Some(victim) = &rule.victim {
            self.check_kind(&format!("{path}.victim"), victim);
        }
    }

    // ========================================================================
    // Roster
    // ========================================================================

    fn validate_roster(&mut self, config: &JudgeConfig, limits: &ConfigLimits) {
        let roster = &config.roster;
        if roster.len() > limits.max_entities {
            self.add_error(
                "roster",
                &format!(
                    "{} entities exceed the limit of {}",
                    roster.len(),
                    limits.max_entities
                ),
            );
        }

        for (id, entry) in roster {
            self.validate_entity(&config.ruleset, *id, entry);
        }

        if !roster.is_empty() {
            for camp in [Camp::Red, Camp::Blue] {
                let has_base = roster
                    .iter()
                    .any(|(id, e)| id.camp() == camp && e.kind.eq_ignore_ascii_case("base"));
                if !has_base {
                    self.add_warning(
                        "roster",
                        &format!("{camp} has no base, settlement falls back to health totals"),
                    );
                }
            }
        }
    }

    fn validate_entity(&mut self, ruleset: &RulesetConfig, id: Identity, entry: &EntityConfig) {
        let path = format!("roster.{id}");
        if !id.camp().is_combatant() {
            self.add_error(&path, &format!("camp '{}' cannot field entities", id.camp()));
        }
        if entry.level == 0 {
            self.add_error(&format!("{path}.level"), "levels start at 1");
        }

        let Ok(kind) = entry.kind.parse::<EntityKind>() else {
            let names = EntityKind::ALL.map(EntityKind::as_str);
            self.add_error(&format!("{path}.kind"), &unknown("entity kind", &entry.kind, &names));
            return;
        };
        if !has_kind(ruleset.health.keys(), kind) {
            self.add_error(
                &format!("{path}.kind"),
                &format!("no health table for kind '{kind}'"),
            );
        }

        let Some(weapon) = &entry.weapon else {
            if entry.ammo > 0 {
                self.add_warning(&format!("{path}.ammo"), "ammo allowance without a weapon");
            }
            return;
        };
        let weapon_path = format!("{path}.weapon");
        let Ok(ammo) = weapon.parse::<AmmoType>() else {
            self.check_ammo(&weapon_path, weapon);
            return;
        };
        if !ruleset
            .heat
            .increment
            .keys()
            .any(|k| k.parse::<AmmoType>().is_ok_and(|a| a == ammo))
        {
            self.add_error(
                &weapon_path,
                &format!("no heat increment for ammo '{ammo}', every shot would fail"),
            );
        }
        if !has_kind(ruleset.heat.max.keys(), kind) {
            self.add_warning(
                &weapon_path,
                &format!("no heat.max table for kind '{kind}', heat is not tracked"),
            );
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn check_kind(&mut self, path: &str, kind: &str) {
        if kind.parse::<EntityKind>().is_err() {
            let names = EntityKind::ALL.map(EntityKind::as_str);
            self.add_error(path, &unknown("entity kind", kind, &names));
        }
    }

    fn check_ammo(&mut self, path: &str, ammo: &str) {
        if ammo.parse::<AmmoType>().is_err() {
            let names = AmmoType::ALL.map(AmmoType::as_str);
            self.add_error(path, &unknown("ammo type", ammo, &names));
        }
    }

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Closest candidate within a Damerau-Levenshtein distance of 3.
#[must_use]
pub fn suggest<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let input = input.to_ascii_lowercase();
    candidates
        .iter()
        .map(|c| (*c, strsim::damerau_levenshtein(&input, c)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name)
}

fn unknown(what: &str, input: &str, candidates: &[&str]) -> String {
    suggest(input, candidates).map_or_else(
        || format!("unknown {what} '{input}'"),
        |hint| format!("unknown {what} '{input}', did you mean '{hint}'?"),
    )
}

fn has_kind<'a>(mut keys: impl Iterator<Item = &'a String>, kind: EntityKind) -> bool {
    keys.any(|k| k.parse::<EntityKind>().is_ok_and(|k| k == kind))
}

// ============================================================================
// Tests
// ============================================================================
