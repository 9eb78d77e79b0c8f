//! Entities on the field and the registry that knows them.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::RulesError;
use crate::identity::{Camp, Identity};

/// Kind of entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Heavy shooter
    Hero,
    /// Support robot, no weapon
    Engineer,
    /// Standard shooter
    Infantry,
    /// Drone
    Aerial,
    /// Autonomous shooter
    Sentry,
    /// Dart launcher
    Dart,
    /// Radar station
    Radar,
    /// Forward structure
    Outpost,
    /// Main structure; destroying it ends the match
    Base,
}

impl EntityKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Hero,
        Self::Engineer,
        Self::Infantry,
        Self::Aerial,
        Self::Sentry,
        Self::Dart,
        Self::Radar,
        Self::Outpost,
        Self::Base,
    ];

    /// Canonical name as used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Engineer => "engineer",
            Self::Infantry => "infantry",
            Self::Aerial => "aerial",
            Self::Sentry => "sentry",
            Self::Dart => "dart",
            Self::Radar => "radar",
            Self::Outpost => "outpost",
            Self::Base => "base",
        }
    }

    /// Whether the entity moves and can therefore be revived.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        matches!(
            self,
            Self::Hero | Self::Engineer | Self::Infantry | Self::Aerial | Self::Sentry
        )
    }

    /// Whether the entity is a fixed structure.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(self, Self::Outpost | Self::Base)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| RulesError::UnknownEntity(s.to_string()))
    }
}

/// Projectile classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmmoType {
    /// 17 mm
    #[serde(alias = "17mm")]
    Small,
    /// 42 mm
    #[serde(alias = "42mm")]
    Large,
    /// Guided dart
    Dart,
}

impl AmmoType {
    /// Every ammo type.
    pub const ALL: [Self; 3] = [Self::Small, Self::Large, Self::Dart];

    /// Canonical name as used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Large => "large",
            Self::Dart => "dart",
        }
    }
}

impl fmt::Display for AmmoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AmmoType {
    type Err = RulesError;

    /// Accepts the canonical name or the calibre (`"17mm"`, `"42mm"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" | "17mm" => Ok(Self::Small),
            "large" | "42mm" => Ok(Self::Large),
            "dart" => Ok(Self::Dart),
            _ => Err(RulesError::UnknownAmmo(s.to_string())),
        }
    }
}

/// Armor plate location on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArmorId(pub u8);

impl fmt::Display for ArmorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "armor#{}", self.0)
    }
}

/// A registered entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Identity
    pub id: Identity,
    /// Kind
    pub kind: EntityKind,
    /// Level, starting at 1
    pub level: u8,
    /// Whether an operator or autonomy stack is assigned
    pub has_controller: bool,
    /// Mounted weapon, if any
    pub weapon: Option<AmmoType>,
    /// Ammo allowance at round start
    pub initial_ammo: u32,
}

impl Entity {
    /// Creates a level-1 entity with a controller and no weapon.
    #[must_use]
    pub const fn new(id: Identity, kind: EntityKind) -> Self {
        Self {
            id,
            kind,
            level: 1,
            has_controller: true,
            weapon: None,
            initial_ammo: 0,
        }
    }

    /// Sets the level.
    #[must_use]
    pub const fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Mounts a weapon with an initial allowance.
    #[must_use]
    pub const fn with_weapon(mut self, ammo: AmmoType, initial_ammo: u32) -> Self {
        self.weapon = Some(ammo);
        self.initial_ammo = initial_ammo;
        self
    }

    /// Sets whether a controller is assigned.
    #[must_use]
    pub const fn with_controller(mut self, has_controller: bool) -> Self {
        self.has_controller = has_controller;
        self
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Lookup of entities taking part in the match.
pub trait EntityRegistry: Send + Sync + fmt::Debug {
    /// Looks up an entity.
    fn get(&self, id: Identity) -> Option<&Entity>;

    /// Every entity, in a stable order.
    fn entities(&self) -> Box<dyn Iterator<Item = &Entity> + '_>;

    /// Looks up an entity, failing on an unknown identity.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownEntity` if `id` is not registered.
    fn lookup(&self, id: Identity) -> Result<&Entity, RulesError> {
        self.get(id)
            .ok_or_else(|| RulesError::UnknownEntity(id.to_string()))
    }

    /// Whether a controller is assigned to `id`.
    fn has_controller(&self, id: Identity) -> bool {
        self.get(id).is_some_and(|e| e.has_controller)
    }

    /// Entities of one camp.
    fn by_camp(&self, camp: Camp) -> Vec<&Entity> {
        self.entities().filter(|e| e.id.camp() == camp).collect()
    }

    /// Entities of one kind.
    fn by_kind(&self, kind: EntityKind) -> Vec<&Entity> {
        self.entities().filter(|e| e.kind == kind).collect()
    }
}

/// Insertion-ordered registry.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entities: IndexMap<Identity, Entity>,
}

impl Roster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entity.
    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<Entity> for Roster {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut roster = Self::new();
        for entity in iter {
            roster.insert(entity);
        }
        roster
    }
}

impl EntityRegistry for Roster {
    fn get(&self, id: Identity) -> Option<&Entity> {
        self.entities.get(&id)
    }

    fn entities(&self) -> Box<dyn Iterator<Item = &Entity> + '_> {
        Box::new(self.entities.values())
    }
}
