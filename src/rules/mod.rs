//! Competition rules.
//!
//! A [`Ruleset`] supplies the numbers that differ between competitions
//! (capability tables, stage limits, damage values) plus a small set of hooks
//! that may change behaviour. The referee core never hard-codes a number that
//! belongs to a competition.
//!
//! [`TableRuleset`] is the data-driven implementation built from the
//! `ruleset` section of a configuration file.

pub mod table;

use std::fmt;
use std::time::Duration;

use crate::buff::Buff;
use crate::combat::HitInfo;
use crate::entity::{AmmoType, Entity};
use crate::error::RulesError;
use crate::referee::Referee;
use crate::scheduler::StageLimits;

pub use table::TableRuleset;

/// Numbers and hooks of one competition.
///
/// Implementations must be pure with respect to their inputs: the same
/// arguments always produce the same answer, which keeps replays
/// deterministic.
pub trait Ruleset: Send + Sync + fmt::Debug {
    /// Short name, used in logs.
    fn name(&self) -> &str;

    /// Maximum health of `entity`.
    fn max_health(&self, entity: &Entity) -> u32;

    /// Rated maximum heat (`Q0`) of the entity's weapon.
    fn max_heat(&self, entity: &Entity) -> f64;

    /// Base heat removed per second.
    fn cooldown_rate(&self, entity: &Entity) -> f64;

    /// Heat added by one shot.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::MissingTable` if the ruleset has no value for `ammo`.
    fn heat_increment(&self, ammo: AmmoType) -> Result<f64, RulesError>;

    /// Distance between `Q0` and the latching threshold `Q2`.
    fn heat_margin(&self, ammo: AmmoType) -> f64;

    /// Base damage of `hit` against `victim`, before buffs.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::MissingTable` if no damage entry matches.
    fn base_damage(&self, hit: &HitInfo, victim: &Entity) -> Result<u32, RulesError>;

    /// Time limit of each stage.
    fn stage_limits(&self) -> StageLimits;

    /// Fraction of max health lost per heat unit above `2·Q0`.
    fn overheat_penalty_ratio(&self) -> f64 {
        0.004
    }

    /// Period of the heat cooldown tick.
    fn heat_tick_interval(&self) -> Duration {
        Duration::from_millis(100)
    }

    /// Fraction of max health restored on revive.
    fn revive_health_fraction(&self) -> f64 {
        0.1
    }

    /// Invincibility granted on revive.
    fn revive_invincibility(&self) -> Duration {
        Duration::from_secs(3)
    }

    /// Weapon lock imposed by a yellow card.
    fn yellow_card_lock(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Extra revive gating on top of the core preconditions (dead, has a
    /// controller, mobile, no red card).
    fn can_revive(&self, referee: &Referee, entity: &Entity) -> bool {
        let _ = (referee, entity);
        true
    }

    /// Applies a successful revive: restores a fraction of max health and
    /// grants a short invincibility window.
    fn on_revive(&self, referee: &mut Referee, entity: &Entity) {
        let max = f64::from(self.max_health(entity));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let amount = (max * self.revive_health_fraction()).floor().max(1.0) as u32;
        referee.increase_health(entity.id, amount);
        let window = self.revive_invincibility();
        if !window.is_zero() && window < Buff::PERMANENT_THRESHOLD {
            referee.set_invincible(entity.id, true, window);
        }
    }
}
