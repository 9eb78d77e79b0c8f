//! Shots, ammo, barrel heat and overheat.
//!
//! Heat rises by a fixed increment per shot and falls every tick by the
//! entity's cooldown rate. Three thresholds apply, with `Q0` the rated max
//! heat and `Q2 = Q0 + margin(ammo)`:
//!
//! - above `Q0`: vision reduced and weapon heat-locked
//! - above `Q2`: the lock latches until heat is back to zero
//! - above `2·Q0`: health penalty on the next tick, heat clamped to `2·Q0`
//!
//! Flags are permanent buffs so they compose with the ledger's expiry and
//! override rules. The heat lock is its own buff type, separate from the
//! card lock, so neither clears the other. An entity whose `Q0` is zero has
//! no heat model.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::keys;
use crate::buff::{Buff, BuffType};
use crate::bus::Notification;
use crate::entity::{AmmoType, Entity};
use crate::error::RulesError;
use crate::identity::Identity;
use crate::observability::metrics;
use crate::referee::Referee;
use crate::scheduler::Stage;

/// Result of [`Referee::on_shot`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ShotOutcome {
    /// The shot counted; heat after the shot
    Fired {
        /// Heat after the shot
        heat: f64,
    },
    /// Weapon is locked (overheat or penalty)
    Locked,
    /// Ammo allowance exhausted
    NoAmmo,
    /// Shooter is dead
    Dead,
    /// Shooter has no weapon for this ammo type
    NoWeapon,
}

impl ShotOutcome {
    /// Whether the shot counted.
    #[must_use]
    pub const fn is_fired(&self) -> bool {
        matches!(self, Self::Fired { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    q0: f64,
    q2: f64,
}

impl Referee {
    fn thresholds(&self, entity: &Entity, ammo: AmmoType) -> Option<Thresholds> {
        let q0 = self.rules.max_heat(entity);
        (q0 > 0.0).then(|| Thresholds {
            q0,
            q2: q0 + self.rules.heat_margin(ammo),
        })
    }

    /// Registers a shot.
    ///
    /// Preconditions are checked in order (weapon, alive, lock, ammo) and
    /// reported through [`ShotOutcome`]. A shot that fires consumes one
    /// round and adds the ammo type's heat increment.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownEntity` for an unregistered shooter and
    /// `RulesError::MissingTable` when the ruleset has no heat increment for
    /// `ammo`.
    pub fn on_shot(&mut self, shooter: Identity, ammo: AmmoType) -> Result<ShotOutcome, RulesError> {
        let entity = self.registry.lookup(shooter)?.clone();
        if entity.weapon != Some(ammo) {
            return Ok(ShotOutcome::NoWeapon);
        }
        if !self.is_alive(shooter) {
            return Ok(ShotOutcome::Dead);
        }
        if self.is_weapon_locked(shooter) {
            return Ok(ShotOutcome::Locked);
        }
        let store = self.entity_store(shooter);
        let rounds: u32 = store.load(*keys::AMMO);
        if rounds == 0 {
            return Ok(ShotOutcome::NoAmmo);
        }
        let increment = self.rules.heat_increment(ammo)?;

        store.save(*keys::AMMO, rounds - 1);
        let Some(limits) = self.thresholds(&entity, ammo) else {
            return Ok(ShotOutcome::Fired { heat: 0.0 });
        };
        let heat = store.update(*keys::HEAT, |h: f64| h + increment);
        self.update_heat_flags(shooter, limits, heat);
        debug!(%shooter, heat, rounds = rounds - 1, "shot fired");
        Ok(ShotOutcome::Fired { heat })
    }

    /// Whether a card lock or a heat lock is live on the entity.
    #[must_use]
    pub fn is_weapon_locked(&self, id: Identity) -> bool {
        [BuffType::WEAPON_LOCKED, BuffType::HEAT_LOCKED]
            .into_iter()
            .any(|lock| self.buffs.try_get_buff(id, lock).is_some())
    }

    /// Current barrel heat.
    #[must_use]
    pub fn heat(&self, id: Identity) -> f64 {
        self.entity_store(id).load(*keys::HEAT)
    }

    /// Cooldown per second after buffs.
    ///
    /// The multiplier and the additive bonus do not stack: whichever gives
    /// the higher rate applies.
    #[must_use]
    pub fn cooldown_rate(&self, id: Identity) -> f64 {
        let Some(entity) = self.registry.get(id) else {
            return 0.0;
        };
        let base = self.rules.cooldown_rate(entity);
        let multiplier = f64::from(self.buffs.value_or(id, BuffType::COOLDOWN_RATE, 1.0));
        let bonus = f64::from(self.buffs.value_or(id, BuffType::COOLDOWN_BONUS, 0.0));
        (base * multiplier).max(base + bonus)
    }

    /// Advances one entity's heat by `dt`.
    ///
    /// Heat above `2·Q0` costs
    /// `floor((heat - 2·Q0) * overheat_penalty_ratio * max_health)` health,
    /// is clamped to `2·Q0` and does not cool on the same tick.
    pub fn heat_tick(&mut self, id: Identity, dt: Duration) {
        let Some(entity) = self.entity(id) else {
            return;
        };
        let Some(ammo) = entity.weapon else {
            return;
        };
        let Some(limits) = self.thresholds(&entity, ammo) else {
            return;
        };
        let store = self.entity_store(id);
        let heat: f64 = store.load(*keys::HEAT);
        let ceiling = 2.0 * limits.q0;

        let heat = if heat > ceiling {
            let max_health = f64::from(self.max_health(id));
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let penalty =
                ((heat - ceiling) * self.rules.overheat_penalty_ratio() * max_health).floor() as u32;
            store.save(*keys::HEAT, ceiling);
            self.publish(Notification::Overheated {
                time: self.time(),
                entity: id,
                heat,
                penalty,
            });
            metrics::record_overheat(id.camp());
            warn!(%id, heat, penalty, "overheat penalty");
            self.decrease_health(id, Identity::JUDGE, penalty);
            ceiling
        } else if heat > 0.0 {
            let cooled = (heat - self.cooldown_rate(id) * dt.as_secs_f64()).max(0.0);
            store.save(*keys::HEAT, cooled);
            cooled
        } else {
            heat
        };
        self.update_heat_flags(id, limits, heat);
    }

    fn update_heat_flags(&self, id: Identity, limits: Thresholds, heat: f64) {
        let buffs = &self.buffs;
        if heat > limits.q0 {
            for flag in [BuffType::VISION_REDUCED, BuffType::HEAT_LOCKED] {
                if !buffs.is_permanent(id, flag) {
                    buffs.add_buff(id, flag, 1.0, Buff::PERMANENT, true);
                }
            }
            if heat > limits.q2 && !buffs.is_permanent(id, BuffType::OVERHEAT_LATCH) {
                debug!(%id, heat, "overheat latched");
                buffs.add_buff(id, BuffType::OVERHEAT_LATCH, 1.0, Buff::PERMANENT, true);
            }
            return;
        }

        if buffs.is_permanent(id, BuffType::VISION_REDUCED) {
            buffs.remove_buff(id, BuffType::VISION_REDUCED);
        }
        if heat <= 0.0 {
            buffs.remove_buff(id, BuffType::OVERHEAT_LATCH);
        }
        let latched = buffs.is_permanent(id, BuffType::OVERHEAT_LATCH);
        if !latched && buffs.has_entry(id, BuffType::HEAT_LOCKED) {
            debug!(%id, heat, "heat lock released");
            buffs.remove_buff(id, BuffType::HEAT_LOCKED);
        }
    }

    /// Heat tick for every armed entity, using the time since the previous
    /// tick. Only `Stage::Match` changes heat.
    pub(crate) fn heat_tick_all(&mut self) {
        let now = self.time();
        let dt = Duration::from_secs_f64((now - self.last_heat_tick).max(0.0));
        self.last_heat_tick = now;
        if self.stage() != Stage::Match {
            return;
        }
        let armed: Vec<Identity> = self
            .registry
            .entities()
            .filter(|e| e.weapon.is_some())
            .map(|e| e.id)
            .collect();
        for id in armed {
            self.heat_tick(id, dt);
        }
    }

    /// Remaining ammo allowance.
    #[must_use]
    pub fn ammo(&self, id: Identity) -> u32 {
        self.entity_store(id).load(*keys::AMMO)
    }

    /// Adds rounds to an entity's allowance and returns the new total.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownEntity` for an unregistered entity.
    pub fn grant_ammo(&mut self, id: Identity, amount: u32) -> Result<u32, RulesError> {
        let entity = self.registry.lookup(id)?;
        if entity.weapon.is_none() {
            debug!(%id, "ammo granted to unarmed entity");
        }
        let total = self
            .entity_store(id)
            .update(*keys::AMMO, |rounds: u32| rounds.saturating_add(amount));
        debug!(%id, amount, total, "ammo granted");
        Ok(total)
    }
}
