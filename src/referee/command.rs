//! Inbound commands.
//!
//! Hardware frames and operator actions are converted to [`Command`]s by the
//! I/O side and queued on the referee's channel. JSON and YAML forms are
//! tagged with `type`:
//!
//! ```json
//! {"type": "armor_hit", "attacker": "blue:1", "victim": "red:3", "ammo": "small", "armor": 2}
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buff::BuffType;
use crate::combat::Penalty;
use crate::entity::{AmmoType, ArmorId};
use crate::identity::Identity;
use crate::scheduler::Stage;

/// An input to the referee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Command {
    /// Operator stage change
    SetStage {
        /// Target stage
        stage: Stage,
    },
    /// Operator pause
    Pause,
    /// Operator resume
    Resume,
    /// An armor plate registered a hit
    ArmorHit {
        /// Shooter
        attacker: Identity,
        /// Hit entity
        victim: Identity,
        /// Projectile
        ammo: AmmoType,
        /// Plate that registered the hit
        #[serde(default)]
        armor: ArmorId,
    },
    /// A weapon fired
    Shot {
        /// Shooter
        shooter: Identity,
        /// Projectile
        ammo: AmmoType,
    },
    /// Revive request
    Revive {
        /// Entity to revive
        entity: Identity,
    },
    /// Revive progress reported by a revive point
    ReviveProgress {
        /// Entity being revived
        entity: Identity,
        /// Progress to add
        amount: f64,
    },
    /// Referee penalty
    Penalty {
        /// Penalized entity
        entity: Identity,
        /// Card
        penalty: Penalty,
    },
    /// Ammo purchase or supply
    GrantAmmo {
        /// Receiving entity
        entity: Identity,
        /// Rounds granted
        amount: u32,
    },
    /// Grant a buff
    AddBuff {
        /// Receiving entity
        entity: Identity,
        /// Buff kind
        buff: BuffType,
        /// Strength
        value: f32,
        /// Lifetime; permanent when absent
        #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
        duration: Option<Duration>,
        /// Overwrite regardless of the live buff
        #[serde(default)]
        force: bool,
    },
    /// Remove a buff
    RemoveBuff {
        /// Affected entity
        entity: Identity,
        /// Buff kind
        buff: BuffType,
    },
    /// Start a new round
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_armor_hit_json() {
        let json = r#"{"type":"armor_hit","attacker":"blue:1","victim":"red:3","ammo":"17mm","armor":2}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            command,
            Command::ArmorHit {
                attacker: Identity::blue(1),
                victim: Identity::red(3),
                ammo: AmmoType::Small,
                armor: ArmorId(2),
            }
        );
    }

    #[test]
    fn test_parse_unit_variant() {
        let command: Command = serde_json::from_str(r#"{"type":"pause"}"#).unwrap();
        assert_eq!(command, Command::Pause);
    }

    #[test]
    fn test_parse_add_buff_yaml() {
        let yaml = "type: add_buff\nentity: red:1\nbuff: defence\nvalue: 0.5\nduration: 30s\n";
        let command: Command = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            command,
            Command::AddBuff {
                entity: Identity::red(1),
                buff: BuffType::DEFENCE,
                value: 0.5,
                duration: Some(Duration::from_secs(30)),
                force: false,
            }
        );
    }

    #[test]
    fn test_permanent_buff_has_no_duration() {
        let yaml = "type: add_buff\nentity: red:1\nbuff: attack\nvalue: 1.0\n";
        let command: Command = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(command, Command::AddBuff { duration: None, .. }));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_str::<Command>(r#"{"type":"teleport"}"#).is_err());
    }
}
