//! Health primitives and invincibility.

use std::time::Duration;

use tracing::{debug, info};

use super::keys;
use crate::buff::{Buff, BuffType};
use crate::bus::Notification;
use crate::entity::EntityKind;
use crate::identity::Identity;
use crate::observability::metrics;
use crate::referee::Referee;
use crate::scheduler::Stage;

/// Defence value treated as full damage negation.
const INVINCIBLE_TOLERANCE: f32 = 1e-4;

impl Referee {
    /// Current health; zero for unknown entities.
    #[must_use]
    pub fn health(&self, id: Identity) -> u32 {
        self.entity_store(id).load(*keys::HEALTH)
    }

    /// Maximum health from the ruleset; zero for unknown entities.
    #[must_use]
    pub fn max_health(&self, id: Identity) -> u32 {
        self.registry
            .get(id)
            .map_or(0, |entity| self.rules.max_health(entity))
    }

    /// Whether the entity has health left.
    #[must_use]
    pub fn is_alive(&self, id: Identity) -> bool {
        self.health(id) > 0
    }

    /// Stores `value` clamped to `[0, max_health]`, or zero while a permanent
    /// red card is active. Returns the stored value.
    pub(crate) fn set_health(&mut self, id: Identity, value: u32) -> u32 {
        let value = if self.buffs.is_permanent(id, BuffType::RED_CARD) {
            0
        } else {
            value.min(self.max_health(id))
        };
        self.entity_store(id).save(*keys::HEALTH, value);
        value
    }

    /// Removes up to `amount` health and returns how much was removed.
    ///
    /// The transition to zero publishes exactly one `Killed`. A dead entity
    /// takes no further damage until revived.
    pub fn decrease_health(&mut self, id: Identity, source: Identity, amount: u32) -> u32 {
        let current = self.health(id);
        if current == 0 {
            return 0;
        }
        let stored = self.set_health(id, current.saturating_sub(amount));
        let applied = current - stored;
        if stored == 0 {
            self.on_killed(id, source);
        }
        applied
    }

    fn on_killed(&mut self, victim: Identity, source: Identity) {
        let time = self.time();
        self.publish(Notification::Killed {
            time,
            source,
            victim,
        });
        metrics::record_kill(victim.camp());
        info!(%victim, %source, time, "entity killed");

        let is_base = self
            .registry
            .get(victim)
            .is_some_and(|e| e.kind == EntityKind::Base);
        if is_base && self.stage() == Stage::Match {
            info!(base = %victim, "base destroyed, ending match");
            self.schedule_settlement();
        }
    }

    /// Adds up to `amount` health, capped at max health. Returns how much
    /// was added.
    pub fn increase_health(&mut self, id: Identity, amount: u32) -> u32 {
        let current = self.health(id);
        let stored = self.set_health(id, current.saturating_add(amount));
        stored.saturating_sub(current)
    }

    /// Grants or withdraws invincibility (a full-strength defence buff).
    ///
    /// With `on` and a zero `duration` the grant is permanent and overwrites
    /// any defence buff. A timed grant follows the normal override rule, so
    /// it never cuts a longer or permanent one short.
    ///
    /// Withdrawing removes only a permanent grant; timed invincibility runs
    /// out on its own.
    pub fn set_invincible(&mut self, id: Identity, on: bool, duration: Duration) {
        if on {
            if duration.is_zero() {
                self.buffs
                    .add_buff(id, BuffType::DEFENCE, 1.0, Buff::PERMANENT, true);
            } else {
                self.buffs
                    .add_buff(id, BuffType::DEFENCE, 1.0, duration, false);
            }
        } else if self.buffs.is_permanent(id, BuffType::DEFENCE) {
            self.buffs.remove_buff(id, BuffType::DEFENCE);
        } else {
            debug!(%id, "no permanent invincibility to withdraw");
        }
    }

    /// Whether the entity currently negates all damage.
    #[must_use]
    pub fn is_invincible(&self, id: Identity) -> bool {
        self.buffs
            .buff_value(id, BuffType::DEFENCE)
            .is_some_and(|v| (v - 1.0).abs() < INVINCIBLE_TOLERANCE)
    }
}
