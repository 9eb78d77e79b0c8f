//! Health regeneration.

use tracing::trace;

use super::keys;
use crate::buff::BuffType;
use crate::identity::Identity;
use crate::referee::Referee;
use crate::scheduler::{Stage, TIME_EPSILON};

impl Referee {
    /// Regenerates every living entity carrying a `HEALTH_REGEN` buff by
    /// `max_health * value` per second of match time since the previous
    /// tick. Whole points are applied; the fraction carries over to the next
    /// tick. Only `Stage::Match` regenerates.
    pub(crate) fn regen_tick_all(&mut self) {
        let now = self.time();
        let dt = (now - self.last_regen_tick).max(0.0);
        self.last_regen_tick = now;
        if self.stage() != Stage::Match {
            return;
        }
        let ids: Vec<Identity> = self.registry.entities().map(|e| e.id).collect();
        for id in ids {
            let Some(rate) = self.buffs.buff_value(id, BuffType::HEALTH_REGEN) else {
                continue;
            };
            if rate <= 0.0 || !self.is_alive(id) {
                continue;
            }
            let store = self.entity_store(id);
            let owed = store.load::<f64>(*keys::REGEN_CARRY)
                + f64::from(self.max_health(id)) * f64::from(rate) * dt;
            let whole = (owed + TIME_EPSILON).floor();
            store.save(*keys::REGEN_CARRY, (owed - whole).max(0.0));
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let gained = self.increase_health(id, whole as u32);
            trace!(%id, gained, "health regenerated");
        }
    }
}
