//! Match result.
//!
//! The decision reads only store contents, so identical replays settle
//! identically.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::Referee;
use crate::bus::Notification;
use crate::entity::EntityKind;
use crate::identity::Camp;
use crate::observability::metrics;

/// How the winner was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleReason {
    /// One side lost every base while the other kept one
    BaseDestroyed,
    /// Higher remaining base health
    BaseHealth,
    /// Higher remaining health over the whole camp
    TotalHealth,
    /// Nothing separated the camps
    Draw,
}

/// Result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    /// Winning camp, `None` for a draw
    pub winner: Option<Camp>,
    /// Deciding criterion
    pub reason: SettleReason,
}

#[derive(Debug, Default)]
struct Tally {
    bases: usize,
    bases_alive: usize,
    base_health: u64,
    total_health: u64,
}

fn compare(red: u64, blue: u64) -> Option<Camp> {
    match red.cmp(&blue) {
        std::cmp::Ordering::Greater => Some(Camp::Red),
        std::cmp::Ordering::Less => Some(Camp::Blue),
        std::cmp::Ordering::Equal => None,
    }
}

impl Referee {
    /// Result of the current round, once settled.
    #[must_use]
    pub const fn settlement(&self) -> Option<Settlement> {
        self.settlement
    }

    fn tally(&self, camp: Camp) -> Tally {
        let mut tally = Tally::default();
        for entity in self.registry.by_camp(camp) {
            let health = u64::from(self.health(entity.id));
            tally.total_health += health;
            if entity.kind == EntityKind::Base {
                tally.bases += 1;
                tally.base_health += health;
                if health > 0 {
                    tally.bases_alive += 1;
                }
            }
        }
        tally
    }

    /// Decides the match and publishes the result.
    pub(crate) fn settle(&mut self) -> Settlement {
        let red = self.tally(Camp::Red);
        let blue = self.tally(Camp::Blue);

        let red_lost = red.bases > 0 && red.bases_alive == 0;
        let blue_lost = blue.bases > 0 && blue.bases_alive == 0;

        let settlement = if red_lost != blue_lost {
            Settlement {
                winner: Some(if red_lost { Camp::Blue } else { Camp::Red }),
                reason: SettleReason::BaseDestroyed,
            }
        } else if let Some(winner) = compare(red.base_health, blue.base_health) {
            Settlement {
                winner: Some(winner),
                reason: SettleReason::BaseHealth,
            }
        } else if let Some(winner) = compare(red.total_health, blue.total_health) {
            Settlement {
                winner: Some(winner),
                reason: SettleReason::TotalHealth,
            }
        } else {
            Settlement {
                winner: None,
                reason: SettleReason::Draw,
            }
        };

        self.settlement = Some(settlement);
        self.publish(Notification::MatchSettled {
            time: self.time(),
            winner: settlement.winner,
            reason: settlement.reason,
        });
        metrics::record_settlement(settlement.winner);
        info!(
            winner = ?settlement.winner,
            reason = ?settlement.reason,
            red_health = red.total_health,
            blue_health = blue.total_health,
            "match settled"
        );
        settlement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::testing::{referee, referee_with};
    use crate::entity::Entity;
    use crate::identity::Identity;
    use crate::scheduler::Stage;

    fn with_bases() -> Referee {
        referee_with(|roster| {
            roster.insert(Entity::new(Identity::red(18), EntityKind::Base));
            roster.insert(Entity::new(Identity::blue(18), EntityKind::Base));
        })
    }

    #[test]
    fn test_equal_health_is_draw() {
        let mut r = referee();
        r.set_stage(Stage::Settlement);
        assert_eq!(
            r.settlement(),
            Some(Settlement {
                winner: None,
                reason: SettleReason::Draw,
            })
        );
    }

    #[test]
    fn test_total_health_decides_without_bases() {
        let mut r = referee();
        r.decrease_health(Identity::blue(1), Identity::red(1), 30);
        r.set_stage(Stage::Settlement);
        let s = r.settlement().unwrap();
        assert_eq!(s.winner, Some(Camp::Red));
        assert_eq!(s.reason, SettleReason::TotalHealth);
    }

    #[test]
    fn test_base_health_beats_total_health() {
        let mut r = with_bases();
        r.decrease_health(Identity::red(18), Identity::blue(1), 10);
        r.decrease_health(Identity::blue(1), Identity::red(1), 150);
        r.set_stage(Stage::Settlement);
        let s = r.settlement().unwrap();
        assert_eq!(s.winner, Some(Camp::Blue));
        assert_eq!(s.reason, SettleReason::BaseHealth);
    }

    #[test]
    fn test_settle_publishes_result() {
        let mut r = with_bases();
        r.decrease_health(Identity::red(18), Identity::blue(1), u32::MAX);
        r.settle();
        let published = r.bus().pending().last().cloned().unwrap();
        assert!(matches!(
            published,
            Notification::MatchSettled {
                winner: Some(Camp::Blue),
                reason: SettleReason::BaseDestroyed,
                ..
            }
        ));
    }
}
