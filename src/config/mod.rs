//! Configuration
//!
//! Loads and validates a referee configuration file (ruleset plus roster)
//! and turns it into the runtime objects the referee works with.

pub mod loader;
pub mod schema;
pub mod validation;

use std::sync::Arc;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions, read_yaml};
pub use schema::*;
pub use validation::{ValidationResult, Validator};

use crate::entity::{AmmoType, Entity, Roster};
use crate::error::RulesError;
use crate::referee::Referee;
use crate::rules::TableRuleset;

impl EntityConfig {
    /// Builds the runtime entity for `id`.
    ///
    /// # Errors
    ///
    /// Returns `RulesError` for an unknown kind or ammo type.
    pub fn to_entity(&self, id: crate::identity::Identity) -> Result<Entity, RulesError> {
        let mut entity = Entity::new(id, self.kind.parse()?)
            .with_level(self.level)
            .with_controller(self.controller);
        if let Some(weapon) = &self.weapon {
            entity = entity.with_weapon(weapon.parse::<AmmoType>()?, self.ammo);
        }
        Ok(entity)
    }
}

impl JudgeConfig {
    /// Builds the roster.
    ///
    /// # Errors
    ///
    /// Returns `RulesError` if an entry names an unknown kind or ammo type.
    pub fn build_roster(&self) -> Result<Roster, RulesError> {
        self.roster
            .iter()
            .map(|(id, entry)| entry.to_entity(*id))
            .collect()
    }

    /// Builds the table-driven ruleset.
    ///
    /// # Errors
    ///
    /// Returns `RulesError` if a table names an unknown kind, ammo or stage.
    pub fn build_ruleset(&self) -> Result<TableRuleset, RulesError> {
        TableRuleset::from_config(&self.ruleset)
    }

    /// Builds a referee with the first round started.
    ///
    /// # Errors
    ///
    /// Returns `RulesError` if the roster or ruleset cannot be built.
    pub fn build_referee(&self) -> Result<Referee, RulesError> {
        let rules = self.build_ruleset()?;
        let roster = self.build_roster()?;
        Ok(Referee::new(Arc::new(rules), Arc::new(roster)))
    }
}
