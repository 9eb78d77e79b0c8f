//! Revive gating and progress.

use std::sync::Arc;

use tracing::{debug, info};

use super::keys;
use crate::buff::BuffType;
use crate::bus::Notification;
use crate::identity::Identity;
use crate::observability::metrics;
use crate::referee::Referee;

impl Referee {
    /// Attempts to bring a dead entity back.
    ///
    /// Succeeds only for a dead, mobile entity with a controller and no
    /// permanent red card, and only if the ruleset's `can_revive` agrees.
    /// On success the ruleset's `on_revive` hook restores health, revive
    /// progress is cleared and `Revived` is published.
    pub fn try_revive(&mut self, id: Identity) -> bool {
        let Some(entity) = self.entity(id) else {
            debug!(%id, "revive of unknown entity");
            return false;
        };
        if self.is_alive(id) {
            debug!(%id, "revive refused, entity alive");
            return false;
        }
        if !entity.has_controller || !entity.kind.is_mobile() {
            debug!(%id, kind = %entity.kind, "revive refused, not revivable");
            return false;
        }
        if self.buffs.is_permanent(id, BuffType::RED_CARD) {
            debug!(%id, "revive refused, red card");
            return false;
        }
        if !self.rules.can_revive(self, &entity) {
            debug!(%id, progress = self.revive_progress(id), "revive refused by ruleset");
            return false;
        }

        let rules = Arc::clone(&self.rules);
        rules.on_revive(self, &entity);
        self.entity_store(id).delete(*keys::REVIVE_PROGRESS);

        let time = self.time();
        self.publish(Notification::Revived { time, entity: id });
        metrics::record_revive(id.camp());
        info!(%id, time, health = self.health(id), "entity revived");
        true
    }

    /// Adds revive progress to a dead entity and returns the new total.
    ///
    /// Living entities accumulate nothing.
    pub fn add_revive_progress(&mut self, id: Identity, amount: f64) -> f64 {
        if self.is_alive(id) {
            return 0.0;
        }
        self.entity_store(id)
            .update(*keys::REVIVE_PROGRESS, |p: f64| (p + amount).max(0.0))
    }

    /// Revive progress accumulated since death.
    #[must_use]
    pub fn revive_progress(&self, id: Identity) -> f64 {
        self.entity_store(id).load(*keys::REVIVE_PROGRESS)
    }
}
