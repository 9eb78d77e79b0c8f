//! Data-driven ruleset built from configuration tables.

use std::time::Duration;

use indexmap::IndexMap;
use tracing::debug;

use super::Ruleset;
use crate::combat::HitInfo;
use crate::config::schema::{ReviveConfig, RulesetConfig};
use crate::entity::{AmmoType, ArmorId, Entity, EntityKind};
use crate::error::RulesError;
use crate::referee::Referee;
use crate::scheduler::{Stage, StageLimits};

#[derive(Debug, Clone, PartialEq)]
struct DamageEntry {
    ammo: AmmoType,
    victim: Option<EntityKind>,
    armor: Option<ArmorId>,
    amount: u32,
}

impl DamageEntry {
    fn matches(&self, hit: &HitInfo, victim: EntityKind) -> bool {
        self.ammo == hit.ammo
            && self.victim.is_none_or(|k| k == victim)
            && self.armor.is_none_or(|a| a == hit.armor)
    }

    fn specificity(&self) -> u8 {
        u8::from(self.victim.is_some()) + u8::from(self.armor.is_some())
    }
}

/// Ruleset whose numbers all come from tables.
///
/// Per-level tables are indexed from level 1; levels past the end of a table
/// use its last entry.
#[derive(Debug, Clone)]
pub struct TableRuleset {
    name: String,
    stage_limits: StageLimits,
    health: IndexMap<EntityKind, Vec<u32>>,
    max_heat: IndexMap<EntityKind, Vec<f64>>,
    cooldown: IndexMap<EntityKind, Vec<f64>>,
    increment: IndexMap<AmmoType, f64>,
    margin: IndexMap<AmmoType, f64>,
    damage: Vec<DamageEntry>,
    overheat_penalty_ratio: f64,
    heat_tick: Duration,
    revive: ReviveConfig,
    yellow_lock: Duration,
}

fn kind_table<T: Clone>(
    table: &IndexMap<String, Vec<T>>,
) -> Result<IndexMap<EntityKind, Vec<T>>, RulesError> {
    table
        .iter()
        .map(|(kind, values)| Ok::<_, RulesError>((kind.parse::<EntityKind>()?, values.clone())))
        .collect()
}

fn ammo_table(table: &IndexMap<String, f64>) -> Result<IndexMap<AmmoType, f64>, RulesError> {
    table
        .iter()
        .map(|(ammo, value)| Ok::<_, RulesError>((ammo.parse::<AmmoType>()?, *value)))
        .collect()
}

fn by_level<T: Copy>(table: &IndexMap<EntityKind, Vec<T>>, entity: &Entity) -> Option<T> {
    let values = table.get(&entity.kind)?;
    let index = usize::from(entity.level.max(1) - 1).min(values.len().checked_sub(1)?);
    values.get(index).copied()
}

impl TableRuleset {
    /// Builds a ruleset from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns a `RulesError` for the first unknown stage, entity kind or
    /// ammo name. The validator reports all of them with suggestions; this
    /// is the backstop for configs built in code.
    pub fn from_config(config: &RulesetConfig) -> Result<Self, RulesError> {
        let stage_limits = config
            .stages
            .iter()
            .map(|(stage, limit)| {
                Ok::<_, RulesError>((stage.parse::<Stage>()?, limit.0.as_secs_f64()))
            })
            .collect::<Result<Vec<_>, RulesError>>()?;

        let damage = config
            .damage
            .iter()
            .map(|rule| {
                Ok::<_, RulesError>(DamageEntry {
                    ammo: rule.ammo.parse()?,
                    victim: rule.victim.as_deref().map(str::parse::<EntityKind>).transpose()?,
                    armor: rule.armor,
                    amount: rule.amount,
                })
            })
            .collect::<Result<Vec<_>, RulesError>>()?;

        Ok(Self {
            name: config.name.clone(),
            stage_limits: StageLimits::new(stage_limits),
            health: kind_table(&config.health)?,
            max_heat: kind_table(&config.heat.max)?,
            cooldown: kind_table(&config.heat.cooldown)?,
            increment: ammo_table(&config.heat.increment)?,
            margin: ammo_table(&config.heat.margin)?,
            damage,
            overheat_penalty_ratio: config.heat.overheat_penalty_ratio,
            heat_tick: config.heat.tick,
            revive: config.revive.clone(),
            yellow_lock: config.penalties.yellow_lock,
        })
    }
}

impl Ruleset for TableRuleset {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_health(&self, entity: &Entity) -> u32 {
        by_level(&self.health, entity).unwrap_or_else(|| {
            debug!(kind = %entity.kind, "no health entry, max health is zero");
            0
        })
    }

    fn max_heat(&self, entity: &Entity) -> f64 {
        by_level(&self.max_heat, entity).unwrap_or(0.0)
    }

    fn cooldown_rate(&self, entity: &Entity) -> f64 {
        by_level(&self.cooldown, entity).unwrap_or(0.0)
    }

    fn heat_increment(&self, ammo: AmmoType) -> Result<f64, RulesError> {
        self.increment
            .get(&ammo)
            .copied()
            .ok_or_else(|| RulesError::MissingTable {
                table: "heat.increment",
                key: ammo.to_string(),
            })
    }

    fn heat_margin(&self, ammo: AmmoType) -> f64 {
        self.margin.get(&ammo).copied().unwrap_or(0.0)
    }

    fn base_damage(&self, hit: &HitInfo, victim: &Entity) -> Result<u32, RulesError> {
        self.damage
            .iter()
            .rev()
            .filter(|row| row.matches(hit, victim.kind))
            .max_by_key(|row| row.specificity())
            .map(|row| row.amount)
            .ok_or_else(|| RulesError::MissingTable {
                table: "damage",
                key: format!("{} vs {} {}", hit.ammo, victim.kind, hit.armor),
            })
    }

    fn stage_limits(&self) -> StageLimits {
        self.stage_limits.clone()
    }

    fn overheat_penalty_ratio(&self) -> f64 {
        self.overheat_penalty_ratio
    }

    fn heat_tick_interval(&self) -> Duration {
        self.heat_tick
    }

    fn revive_health_fraction(&self) -> f64 {
        self.revive.health_fraction
    }

    fn revive_invincibility(&self) -> Duration {
        self.revive.invincible
    }

    fn yellow_card_lock(&self) -> Duration {
        self.yellow_lock
    }

    fn can_revive(&self, referee: &Referee, entity: &Entity) -> bool {
        let required = self.revive.progress_required;
        required <= 0.0 || referee.revive_progress(entity.id) >= required
    }
}
