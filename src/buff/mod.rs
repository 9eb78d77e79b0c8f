//! Buff ledger
//!
//! Per-entity, per-type status modifiers with a value and an expiry time,
//! stored in the shared [`Store`]. At most one buff of a type is live per
//! entity. Expiry is lazy: an expired buff is deleted the next time it is
//! read.
//!
//! # Override rule
//!
//! A non-forced [`BuffLedger::add_buff`] against a live buff of the same type
//! is rejected when the live buff is stronger or permanent. Otherwise the new
//! buff replaces it and inherits its remaining time, so refreshing never
//! shortens total coverage.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identity::Identity;
use crate::scheduler::MatchClock;
use crate::store::{Store, StoreKey};

/// Buff kind. Well-known kinds are associated constants; rulesets may define
/// their own above [`BuffType::CUSTOM_BASE`].
///
/// Serialized by name; deserialized from a name or a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "BuffTypeRepr", into = "String")]
pub struct BuffType(pub u16);

#[derive(Deserialize)]
#[serde(untagged)]
enum BuffTypeRepr {
    Id(u16),
    Name(String),
}

impl BuffType {
    /// Placeholder for an unset buff
    pub const NONE: Self = Self(0);
    /// Fraction of incoming damage negated; 1.0 is invincible
    pub const DEFENCE: Self = Self(1);
    /// Fractional bonus on outgoing damage
    pub const ATTACK: Self = Self(2);
    /// Multiplier on the barrel cooldown rate
    pub const COOLDOWN_RATE: Self = Self(3);
    /// Additive bonus on the barrel cooldown rate, per second
    pub const COOLDOWN_BONUS: Self = Self(4);
    /// Fraction of max health regenerated per second
    pub const HEALTH_REGEN: Self = Self(5);
    /// Permanent ejection penalty
    pub const RED_CARD: Self = Self(6);
    /// Weapon may not fire; issued by referee cards
    pub const WEAPON_LOCKED: Self = Self(7);
    /// First-person view is degraded
    pub const VISION_REDUCED: Self = Self(8);
    /// Heat went past the hard limit; cleared when heat returns to zero
    pub const OVERHEAT_LATCH: Self = Self(9);
    /// Weapon may not fire because heat is above the rated maximum
    pub const HEAT_LOCKED: Self = Self(10);
    /// First id free for ruleset-specific buffs
    pub const CUSTOM_BASE: u16 = 1000;

    const fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::NONE => "none",
            Self::DEFENCE => "defence",
            Self::ATTACK => "attack",
            Self::COOLDOWN_RATE => "cooldown_rate",
            Self::COOLDOWN_BONUS => "cooldown_bonus",
            Self::HEALTH_REGEN => "health_regen",
            Self::RED_CARD => "red_card",
            Self::WEAPON_LOCKED => "weapon_locked",
            Self::VISION_REDUCED => "vision_reduced",
            Self::OVERHEAT_LATCH => "overheat_latch",
            Self::HEAT_LOCKED => "heat_locked",
            _ => return None,
        })
    }
}

impl From<BuffType> for StoreKey {
    fn from(value: BuffType) -> Self {
        Self(fxhash::hash64(&("buff", value.0)))
    }
}

impl FromStr for BuffType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if let Some(id) = wanted.strip_prefix("buff#") {
            return id.parse().map(Self).map_err(|_| format!("invalid buff id '{s}'"));
        }
        (0..Self::CUSTOM_BASE)
            .map(Self)
            .take_while(|t| t.name().is_some())
            .find(|t| t.name() == Some(wanted.as_str()))
            .ok_or_else(|| format!("unknown buff type '{s}'"))
    }
}

impl TryFrom<BuffTypeRepr> for BuffType {
    type Error = String;

    fn try_from(value: BuffTypeRepr) -> Result<Self, Self::Error> {
        match value {
            BuffTypeRepr::Id(id) => Ok(Self(id)),
            BuffTypeRepr::Name(name) => name.parse(),
        }
    }
}

impl From<BuffType> for String {
    fn from(value: BuffType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for BuffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "buff#{}", self.0),
        }
    }
}

/// A time-scoped modifier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Buff {
    /// Kind of modifier
    pub buff_type: BuffType,
    /// Strength
    pub value: f32,
    /// Match time the buff was stored
    pub start_time: f64,
    /// Lifetime; see [`Buff::PERMANENT`]
    pub duration: Duration,
}

impl Buff {
    /// Duration of a buff that only ends when removed.
    pub const PERMANENT: Duration = Duration::MAX;

    /// Durations at or above this are permanent.
    pub const PERMANENT_THRESHOLD: Duration = Duration::from_secs(u64::MAX / 2);

    /// Whether the buff never expires on its own.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.duration >= Self::PERMANENT_THRESHOLD
    }

    /// Match time at which the buff ends; `+inf` when permanent.
    #[must_use]
    pub fn end_time(&self) -> f64 {
        if self.is_permanent() {
            f64::INFINITY
        } else {
            self.start_time + self.duration.as_secs_f64()
        }
    }

    /// Seconds of coverage left at `now`, never negative.
    #[must_use]
    pub fn remaining(&self, now: f64) -> f64 {
        (self.end_time() - now).max(0.0)
    }
}

/// Result of [`BuffLedger::add_buff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffOutcome {
    /// Stored fresh (no live buff, or forced)
    Applied,
    /// Replaced a weaker-or-equal live buff and inherited its remaining time
    Extended,
    /// A stronger or permanent buff is live; nothing changed
    Rejected,
}

impl BuffOutcome {
    /// Whether the buff was stored.
    #[must_use]
    pub const fn is_stored(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// Buff operations over the shared store.
#[derive(Debug, Clone)]
pub struct BuffLedger {
    store: Store,
    clock: MatchClock,
}

impl BuffLedger {
    /// Creates a ledger over `store`.
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            store: store.with_namespace("buff"),
            clock: store.clock().clone(),
        }
    }

    fn slot(&self, entity: Identity) -> Store {
        self.store.with_namespace(entity)
    }

    /// Adds a buff following the override rule (see module docs).
    ///
    /// With `force`, the buff is stored unconditionally, starting now.
    pub fn add_buff(
        &self,
        entity: Identity,
        buff_type: BuffType,
        value: f32,
        duration: Duration,
        force: bool,
    ) -> BuffOutcome {
        let now = self.clock.now();
        let mut duration = duration;
        let mut outcome = BuffOutcome::Applied;

        if !force {
            if let Some(existing) = self.try_get_buff(entity, buff_type) {
                if existing.value > value || existing.is_permanent() {
                    debug!(
                        %entity,
                        %buff_type,
                        existing = existing.value,
                        value,
                        "buff rejected by stronger live buff"
                    );
                    return BuffOutcome::Rejected;
                }
                duration = duration.saturating_add(Duration::from_secs_f64(existing.remaining(now)));
                outcome = BuffOutcome::Extended;
            }
        }

        let buff = Buff {
            buff_type,
            value,
            start_time: now,
            duration,
        };
        self.slot(entity).save(StoreKey::from(buff_type), buff);
        debug!(%entity, %buff_type, value, ?outcome, "buff stored");
        outcome
    }

    /// Returns the live buff of `buff_type`, deleting it if it has expired.
    #[must_use]
    pub fn try_get_buff(&self, entity: Identity, buff_type: BuffType) -> Option<Buff> {
        let slot = self.slot(entity);
        let buff = slot.try_load::<Buff>(StoreKey::from(buff_type))?;
        if buff.end_time() < self.clock.now() {
            slot.delete(StoreKey::from(buff_type));
            debug!(%entity, %buff_type, "buff expired");
            return None;
        }
        Some(buff)
    }

    /// Removes the buff regardless of its state.
    pub fn remove_buff(&self, entity: Identity, buff_type: BuffType) {
        self.slot(entity).delete(StoreKey::from(buff_type));
    }

    /// Value of the live buff, if any.
    #[must_use]
    pub fn buff_value(&self, entity: Identity, buff_type: BuffType) -> Option<f32> {
        self.try_get_buff(entity, buff_type).map(|b| b.value)
    }

    /// Value of the live buff, or `default`.
    #[must_use]
    pub fn value_or(&self, entity: Identity, buff_type: BuffType, default: f32) -> f32 {
        self.buff_value(entity, buff_type).unwrap_or(default)
    }

    /// Whether a live permanent buff of `buff_type` exists.
    #[must_use]
    pub fn is_permanent(&self, entity: Identity, buff_type: BuffType) -> bool {
        self.try_get_buff(entity, buff_type)
            .is_some_and(|b| b.is_permanent())
    }

    /// Whether a raw entry for the buff is present in the store, expired or not.
    #[must_use]
    pub fn has_entry(&self, entity: Identity, buff_type: BuffType) -> bool {
        self.slot(entity).exists(StoreKey::from(buff_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R1: Identity = Identity::red(1);

    fn ledger() -> (BuffLedger, MatchClock) {
        let clock = MatchClock::new();
        let store = Store::new(clock.clone());
        (BuffLedger::new(&store), clock)
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_add_then_get() {
        let (l, _) = ledger();
        assert_eq!(
            l.add_buff(R1, BuffType::ATTACK, 0.5, secs(10), false),
            BuffOutcome::Applied
        );
        let buff = l.try_get_buff(R1, BuffType::ATTACK).unwrap();
        assert!((buff.value - 0.5).abs() < f32::EPSILON);
        assert_eq!(buff.duration, secs(10));
    }

    #[test]
    fn test_stronger_live_buff_rejects_weaker() {
        let (l, clock) = ledger();
        l.add_buff(R1, BuffType::DEFENCE, 1.0, secs(10), false);
        clock.advance_to(5.0);
        assert_eq!(
            l.add_buff(R1, BuffType::DEFENCE, 0.5, secs(10), false),
            BuffOutcome::Rejected
        );
        let buff = l.try_get_buff(R1, BuffType::DEFENCE).unwrap();
        assert!((buff.value - 1.0).abs() < f32::EPSILON);
        assert!((buff.end_time() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_refresh_inherits_remaining_time() {
        let (l, clock) = ledger();
        l.add_buff(R1, BuffType::DEFENCE, 0.5, secs(10), false);
        clock.advance_to(4.0);
        assert_eq!(
            l.add_buff(R1, BuffType::DEFENCE, 0.5, secs(10), false),
            BuffOutcome::Extended
        );
        let buff = l.try_get_buff(R1, BuffType::DEFENCE).unwrap();
        assert!((buff.start_time - 4.0).abs() < 1e-9);
        assert!((buff.duration.as_secs_f64() - 16.0).abs() < 1e-6);
    }

    #[test]
    fn test_permanent_rejects_even_stronger() {
        let (l, _) = ledger();
        l.add_buff(R1, BuffType::DEFENCE, 0.2, Buff::PERMANENT, false);
        assert_eq!(
            l.add_buff(R1, BuffType::DEFENCE, 1.0, secs(5), false),
            BuffOutcome::Rejected
        );
        assert!(l.is_permanent(R1, BuffType::DEFENCE));
    }

    #[test]
    fn test_force_overwrites() {
        let (l, clock) = ledger();
        l.add_buff(R1, BuffType::DEFENCE, 1.0, Buff::PERMANENT, false);
        clock.advance_to(3.0);
        assert_eq!(
            l.add_buff(R1, BuffType::DEFENCE, 0.3, secs(2), true),
            BuffOutcome::Applied
        );
        let buff = l.try_get_buff(R1, BuffType::DEFENCE).unwrap();
        assert!((buff.value - 0.3).abs() < f32::EPSILON);
        assert!((buff.end_time() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_lazy_expiry_deletes_entry() {
        let (l, clock) = ledger();
        l.add_buff(R1, BuffType::ATTACK, 0.5, secs(2), false);
        clock.advance_to(2.0);
        assert!(l.try_get_buff(R1, BuffType::ATTACK).is_some());
        clock.advance_to(2.1);
        assert!(l.has_entry(R1, BuffType::ATTACK));
        assert!(l.try_get_buff(R1, BuffType::ATTACK).is_none());
        assert!(!l.has_entry(R1, BuffType::ATTACK));
    }

    #[test]
    fn test_expired_buff_does_not_block_weaker() {
        let (l, clock) = ledger();
        l.add_buff(R1, BuffType::ATTACK, 1.0, secs(1), false);
        clock.advance_to(5.0);
        assert_eq!(
            l.add_buff(R1, BuffType::ATTACK, 0.1, secs(1), false),
            BuffOutcome::Applied
        );
    }

    #[test]
    fn test_buffs_are_per_entity_and_type() {
        let (l, _) = ledger();
        l.add_buff(R1, BuffType::ATTACK, 0.5, secs(10), false);
        assert!(l.try_get_buff(Identity::red(2), BuffType::ATTACK).is_none());
        assert!(l.try_get_buff(R1, BuffType::DEFENCE).is_none());
        assert!((l.value_or(R1, BuffType::DEFENCE, 0.0)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_remove() {
        let (l, _) = ledger();
        l.add_buff(R1, BuffType::RED_CARD, 1.0, Buff::PERMANENT, true);
        l.remove_buff(R1, BuffType::RED_CARD);
        assert!(l.buff_value(R1, BuffType::RED_CARD).is_none());
    }

    #[test]
    fn test_permanent_end_time_is_infinite() {
        let buff = Buff {
            buff_type: BuffType::DEFENCE,
            value: 1.0,
            start_time: 0.0,
            duration: Buff::PERMANENT,
        };
        assert!(buff.is_permanent());
        assert!(buff.end_time().is_infinite());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(BuffType::DEFENCE.to_string(), "defence");
        assert_eq!(BuffType(1001).to_string(), "buff#1001");
    }

    #[test]
    fn test_buff_type_serde_accepts_name_or_number() {
        let by_name: BuffType = serde_json::from_str("\"weapon_locked\"").unwrap();
        assert_eq!(by_name, BuffType::WEAPON_LOCKED);
        let by_id: BuffType = serde_json::from_str("2").unwrap();
        assert_eq!(by_id, BuffType::ATTACK);
        assert_eq!("buff#1001".parse::<BuffType>().unwrap(), BuffType(1001));
        assert!("shield".parse::<BuffType>().is_err());
        assert_eq!(serde_json::to_string(&BuffType::RED_CARD).unwrap(), "\"red_card\"");
    }
}
