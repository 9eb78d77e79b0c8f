//! Entity identity
//!
//! An [`Identity`] names a controllable entity by camp and slot id. It is the
//! universal key for per-entity state, so it is `Copy` and hashes cheaply.
//! Zones and markers live in their own key space ([`ZoneId`]) and are never
//! folded into an identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RulesError;

/// Side an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Camp {
    /// Observers; never take part in combat
    Spectator = 0,
    /// Red team
    Red = 1,
    /// Blue team
    Blue = 2,
    /// The referee itself (penalty source, system actions)
    Judge = 3,
}

impl Camp {
    /// Decodes a 2-bit camp code.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownCamp` for codes above 3.
    pub fn from_code(code: u8) -> Result<Self, RulesError> {
        match code {
            0 => Ok(Self::Spectator),
            1 => Ok(Self::Red),
            2 => Ok(Self::Blue),
            3 => Ok(Self::Judge),
            other => Err(RulesError::UnknownCamp(other.to_string())),
        }
    }

    /// Returns the opposing combat camp, if this camp fights.
    #[must_use]
    pub const fn opponent(self) -> Option<Self> {
        match self {
            Self::Red => Some(Self::Blue),
            Self::Blue => Some(Self::Red),
            Self::Spectator | Self::Judge => None,
        }
    }

    /// Whether this camp fields combat entities.
    #[must_use]
    pub const fn is_combatant(self) -> bool {
        matches!(self, Self::Red | Self::Blue)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spectator => "spectator",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Judge => "judge",
        }
    }
}

impl fmt::Display for Camp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Camp {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spectator" | "s" => Ok(Self::Spectator),
            "red" | "r" => Ok(Self::Red),
            "blue" | "b" => Ok(Self::Blue),
            "judge" | "j" => Ok(Self::Judge),
            _ => Err(RulesError::UnknownCamp(s.to_string())),
        }
    }
}

/// Camp plus slot id.
///
/// The id is 16 bits wide. The legacy single-byte encoding (2-bit camp,
/// 6-bit id) is still readable, but encoding refuses ids that would be
/// truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
    camp: Camp,
    id: u16,
}

impl Identity {
    /// The referee identity used as the source of penalties.
    pub const JUDGE: Self = Self::new(Camp::Judge, 0);

    /// Creates a new identity.
    #[must_use]
    pub const fn new(camp: Camp, id: u16) -> Self {
        Self { camp, id }
    }

    /// Shorthand for a red-camp identity.
    #[must_use]
    pub const fn red(id: u16) -> Self {
        Self::new(Camp::Red, id)
    }

    /// Shorthand for a blue-camp identity.
    #[must_use]
    pub const fn blue(id: u16) -> Self {
        Self::new(Camp::Blue, id)
    }

    /// Returns the camp.
    #[must_use]
    pub const fn camp(self) -> Camp {
        self.camp
    }

    /// Returns the slot id.
    #[must_use]
    pub const fn id(self) -> u16 {
        self.id
    }

    /// Packs into a `u32` as `camp << 16 | id`.
    #[must_use]
    pub const fn pack(self) -> u32 {
        ((self.camp as u32) << 16) | self.id as u32
    }

    /// Inverse of [`pack`](Self::pack).
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownCamp` if the camp bits are out of range.
    pub fn unpack(packed: u32) -> Result<Self, RulesError> {
        let code = u8::try_from(packed >> 16)
            .map_err(|_| RulesError::UnknownCamp((packed >> 16).to_string()))?;
        let camp = Camp::from_code(code)?;
        #[allow(clippy::cast_possible_truncation)]
        let id = (packed & 0xFFFF) as u16;
        Ok(Self::new(camp, id))
    }

    /// Decodes the legacy one-byte form used by hardware frames.
    #[must_use]
    pub fn from_legacy_byte(byte: u8) -> Self {
        let camp = match byte >> 6 {
            0 => Camp::Spectator,
            1 => Camp::Red,
            2 => Camp::Blue,
            _ => Camp::Judge,
        };
        Self::new(camp, u16::from(byte & 0x3F))
    }

    /// Encodes into the legacy one-byte form.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::IdOutOfRange` if the id does not fit in 6 bits.
    pub fn to_legacy_byte(self) -> Result<u8, RulesError> {
        let id = u8::try_from(self.id)
            .ok()
            .filter(|id| *id < 64)
            .ok_or(RulesError::IdOutOfRange {
                id: self.id,
                bits: 6,
            })?;
        Ok(((self.camp as u8) << 6) | id)
    }
}

impl Default for Identity {
    /// `spectator:0`, the "nobody" identity.
    fn default() -> Self {
        Self::new(Camp::Spectator, 0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.camp, self.id)
    }
}

impl FromStr for Identity {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (camp, id) = s
            .split_once(':')
            .ok_or_else(|| RulesError::InvalidIdentity(s.to_string()))?;
        let camp: Camp = camp.parse()?;
        let id: u16 = id
            .trim()
            .parse()
            .map_err(|_| RulesError::InvalidIdentity(s.to_string()))?;
        Ok(Self::new(camp, id))
    }
}

impl TryFrom<String> for Identity {
    type Error = RulesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.to_string()
    }
}

/// Zone or marker id. Disjoint from [`Identity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u16);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone#{}", self.0)
    }
}
