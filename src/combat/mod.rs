//! Health and combat resolution
//!
//! Turns hits, shots, heat and penalties into health changes, kills and
//! revives. Everything here is an `impl Referee` block reading and writing
//! per-entity state in the shared store and the buff ledger.
//!
//! # Modules
//!
//! - [`health`] - health primitives and invincibility
//! - [`revive`] - revive gating and progress
//! - [`armor`] - armor hit damage
//! - [`heat`] - shots, ammo, heat and overheat
//! - [`penalty`] - referee cards
//! - [`regen`] - health regeneration

pub mod armor;
pub mod health;
pub mod heat;
pub mod penalty;
pub mod regen;
pub mod revive;

use serde::{Deserialize, Serialize};

use crate::entity::{AmmoType, ArmorId};

pub use heat::ShotOutcome;
pub use penalty::Penalty;

/// Classification of an armor hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HitInfo {
    /// Projectile
    pub ammo: AmmoType,
    /// Plate that registered the hit
    pub armor: ArmorId,
}

/// Per-entity store keys.
pub mod keys {
    use std::sync::LazyLock;

    use crate::store::StoreKey;

    /// Current health (`u32`)
    pub static HEALTH: LazyLock<StoreKey> = LazyLock::new(|| StoreKey::named("Health"));
    /// Current heat (`f64`)
    pub static HEAT: LazyLock<StoreKey> = LazyLock::new(|| StoreKey::named("Heat"));
    /// Remaining ammo allowance (`u32`)
    pub static AMMO: LazyLock<StoreKey> = LazyLock::new(|| StoreKey::named("Ammo"));
    /// Fractional health owed by regeneration (`f64`)
    pub static REGEN_CARRY: LazyLock<StoreKey> = LazyLock::new(|| StoreKey::named("RegenCarry"));
    /// Accumulated revive progress (`f64`)
    pub static REVIVE_PROGRESS: LazyLock<StoreKey> =
        LazyLock::new(|| StoreKey::named("ReviveProgress"));
}
