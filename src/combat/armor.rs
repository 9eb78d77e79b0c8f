//! Armor hit damage.

use tracing::debug;

use super::HitInfo;
use crate::buff::BuffType;
use crate::bus::Notification;
use crate::error::RulesError;
use crate::identity::Identity;
use crate::observability::metrics;
use crate::referee::Referee;

impl Referee {
    /// Resolves an armor hit and returns the health actually removed.
    ///
    /// An invincible victim takes nothing. Otherwise the ruleset's base
    /// damage is scaled by `(1 - defence) * (1 + attack)`, floored, and
    /// applied. `Damaged` is published only when health changed.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownEntity` for an unregistered victim and
    /// `RulesError::MissingTable` when no damage row matches the hit.
    pub fn on_armor_hit(
        &mut self,
        attacker: Identity,
        victim: Identity,
        hit: HitInfo,
    ) -> Result<u32, RulesError> {
        let target = self.registry.lookup(victim)?.clone();
        if self.is_invincible(victim) {
            debug!(%attacker, %victim, "hit on invincible entity");
            return Ok(0);
        }

        let base = self.rules.base_damage(&hit, &target)?;
        let defence = f64::from(self.buffs.value_or(victim, BuffType::DEFENCE, 0.0));
        let attack = f64::from(self.buffs.value_or(attacker, BuffType::ATTACK, 0.0));
        let factor = ((1.0 - defence) * (1.0 + attack)).max(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let amount = (f64::from(base) * factor).floor() as u32;

        let applied = self.decrease_health(victim, attacker, amount);
        if applied > 0 {
            self.publish(Notification::Damaged {
                time: self.time(),
                attacker,
                victim,
                amount: applied,
                hit,
            });
            metrics::record_damage(victim.camp(), applied);
        }
        debug!(%attacker, %victim, base, factor, applied, "armor hit resolved");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::buff::Buff;
    use crate::combat::testing::referee;
    use crate::entity::{AmmoType, ArmorId};

    const R1: Identity = Identity::red(1);
    const B1: Identity = Identity::blue(1);

    fn small() -> HitInfo {
        HitInfo {
            ammo: AmmoType::Small,
            armor: ArmorId(0),
        }
    }

    fn large() -> HitInfo {
        HitInfo {
            ammo: AmmoType::Large,
            armor: ArmorId(1),
        }
    }

    #[test]
    fn test_plain_hit() {
        let mut r = referee();
        assert_eq!(r.on_armor_hit(B1, R1, small()).unwrap(), 10);
        assert_eq!(r.health(R1), 190);
        let damaged = r.bus().pending().last().cloned().unwrap();
        assert!(matches!(
            damaged,
            Notification::Damaged {
                amount: 10,
                attacker: B1,
                victim: R1,
                ..
            }
        ));
    }

    #[test]
    fn test_buffs_scale_damage() {
        let mut r = referee();
        let secs = Duration::from_secs(30);
        r.buffs().add_buff(R1, BuffType::DEFENCE, 0.5, secs, false);
        r.buffs().add_buff(B1, BuffType::ATTACK, 1.0, secs, false);
        assert_eq!(r.on_armor_hit(B1, R1, large()).unwrap(), 100);
        r.buffs().remove_buff(B1, BuffType::ATTACK);
        assert_eq!(r.on_armor_hit(B1, R1, small()).unwrap(), 5);
    }

    #[test]
    fn test_invincible_ignores_attack_buff() {
        let mut r = referee();
        r.set_invincible(R1, true, Duration::ZERO);
        r.buffs()
            .add_buff(B1, BuffType::ATTACK, 10.0, Buff::PERMANENT, true);
        assert_eq!(r.on_armor_hit(B1, R1, large()).unwrap(), 0);
        assert_eq!(r.health(R1), 200);
        assert_eq!(r.bus().pending().filter(|n| n.kind() == "damaged").count(), 0);
    }

    #[test]
    fn test_overkill_reports_applied_amount() {
        let mut r = referee();
        r.decrease_health(R1, B1, 195);
        assert_eq!(r.on_armor_hit(B1, R1, large()).unwrap(), 5);
        assert!(!r.is_alive(R1));
        assert_eq!(r.on_armor_hit(B1, R1, large()).unwrap(), 0);
    }

    #[test]
    fn test_unknown_victim_is_error() {
        let mut r = referee();
        assert_eq!(
            r.on_armor_hit(B1, Identity::red(40), small()),
            Err(RulesError::UnknownEntity("red:40".into()))
        );
    }

    #[test]
    fn test_missing_damage_row_is_error() {
        let mut r = referee();
        let dart = HitInfo {
            ammo: AmmoType::Dart,
            armor: ArmorId(0),
        };
        assert!(matches!(
            r.on_armor_hit(B1, R1, dart),
            Err(RulesError::MissingTable { table: "damage", .. })
        ));
    }
}
