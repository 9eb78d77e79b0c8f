//! Referee cards.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::buff::{Buff, BuffType};
use crate::bus::Notification;
use crate::error::RulesError;
use crate::identity::Identity;
use crate::referee::Referee;

/// A referee penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    /// Timed weapon lock
    Yellow,
    /// Ejection: permanent red card and health forced to zero
    Red,
}

impl Referee {
    /// Issues a penalty.
    ///
    /// A yellow card locks the weapon for the ruleset's `yellow_card_lock`
    /// (a longer or permanent lock is kept). A red card stores a permanent
    /// `RED_CARD` buff, which pins health at zero and blocks revive, then
    /// kills the entity with the judge as source.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownEntity` for an unregistered entity.
    pub fn penalize(&mut self, id: Identity, penalty: Penalty) -> Result<(), RulesError> {
        self.registry.lookup(id)?;
        match penalty {
            Penalty::Yellow => {
                let lock = self.rules.yellow_card_lock();
                self.buffs
                    .add_buff(id, BuffType::WEAPON_LOCKED, 1.0, lock, false);
            }
            Penalty::Red => {
                self.buffs
                    .add_buff(id, BuffType::RED_CARD, 1.0, Buff::PERMANENT, true);
            }
        }

        let time = self.time();
        self.publish(Notification::Penalized {
            time,
            entity: id,
            penalty,
        });
        info!(%id, ?penalty, time, "penalty issued");

        if penalty == Penalty::Red {
            self.decrease_health(id, Identity::JUDGE, u32::MAX);
        }
        Ok(())
    }
}
