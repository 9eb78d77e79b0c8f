//! Buff override rule: stronger or permanent live buffs win, refreshes
//! inherit remaining time, and forced grants overwrite.

use std::time::Duration;

use judge_engine::buff::{Buff, BuffLedger, BuffOutcome, BuffType};
use judge_engine::identity::Identity;
use judge_engine::scheduler::MatchClock;
use judge_engine::store::Store;
use proptest::prelude::*;

const R1: Identity = Identity::red(1);

fn ledger() -> (MatchClock, BuffLedger) {
    let clock = MatchClock::new();
    let store = Store::new(clock.clone());
    let ledger = BuffLedger::new(&store);
    (clock, ledger)
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

proptest! {
    /// A weaker non-forced grant never replaces a stronger live buff.
    #[test]
    fn prop_stronger_live_buff_rejects_weaker(
        strong in 0.5f32..1.0,
        weak in 0.0f32..0.5,
        first in 1_000u64..10_000,
        elapsed in 0u64..1_000,
        second in 1u64..10_000,
    ) {
        let (clock, buffs) = ledger();
        buffs.add_buff(R1, BuffType::ATTACK, strong, ms(first), false);
        clock.advance(ms(elapsed));

        let outcome = buffs.add_buff(R1, BuffType::ATTACK, weak, ms(second), false);
        prop_assert_eq!(outcome, BuffOutcome::Rejected);

        let live = buffs.try_get_buff(R1, BuffType::ATTACK).unwrap();
        prop_assert!((live.value - strong).abs() < f32::EPSILON);
        prop_assert!((live.end_time() - first as f64 / 1000.0).abs() < 1e-6);
    }

    /// A refresh of equal or greater strength never shortens coverage.
    #[test]
    fn prop_refresh_extends_remaining_time(
        base in 0.0f32..0.5,
        bump in 0.0f32..0.5,
        first in 1_000u64..10_000,
        elapsed in 0u64..1_000,
        second in 1u64..10_000,
    ) {
        let (clock, buffs) = ledger();
        buffs.add_buff(R1, BuffType::DEFENCE, base, ms(first), false);
        let before = buffs.try_get_buff(R1, BuffType::DEFENCE).unwrap().end_time();
        clock.advance(ms(elapsed));

        let outcome = buffs.add_buff(R1, BuffType::DEFENCE, base + bump, ms(second), false);
        prop_assert_eq!(outcome, BuffOutcome::Extended);

        let live = buffs.try_get_buff(R1, BuffType::DEFENCE).unwrap();
        let expected = (first + second) as f64 / 1000.0;
        prop_assert!((live.end_time() - expected).abs() < 1e-6);
        prop_assert!(live.end_time() >= before);
        prop_assert!((live.value - (base + bump)).abs() < f32::EPSILON);
    }

    /// A forced grant stores exactly what was asked, starting now.
    #[test]
    fn prop_force_overwrites(
        existing in 0.0f32..1.0,
        value in 0.0f32..1.0,
        permanent in any::<bool>(),
        elapsed in 0u64..1_000,
        duration in 1u64..10_000,
    ) {
        let (clock, buffs) = ledger();
        let first = if permanent { Buff::PERMANENT } else { ms(5_000) };
        buffs.add_buff(R1, BuffType::COOLDOWN_RATE, existing, first, false);
        clock.advance(ms(elapsed));

        let outcome = buffs.add_buff(R1, BuffType::COOLDOWN_RATE, value, ms(duration), true);
        prop_assert_eq!(outcome, BuffOutcome::Applied);

        let live = buffs.try_get_buff(R1, BuffType::COOLDOWN_RATE).unwrap();
        prop_assert!(!live.is_permanent());
        prop_assert!((live.value - value).abs() < f32::EPSILON);
        prop_assert!((live.start_time - clock.now()).abs() < 1e-9);
        prop_assert!((live.end_time() - (elapsed + duration) as f64 / 1000.0).abs() < 1e-6);
    }
}

#[test]
fn permanent_buff_rejects_any_unforced_grant() {
    let (_, buffs) = ledger();
    buffs.add_buff(R1, BuffType::ATTACK, 0.1, Buff::PERMANENT, false);

    let outcome = buffs.add_buff(R1, BuffType::ATTACK, 5.0, ms(1_000), false);
    assert_eq!(outcome, BuffOutcome::Rejected);
    assert!(buffs.is_permanent(R1, BuffType::ATTACK));
    assert!(!outcome.is_stored());
}

#[test]
fn expired_buff_is_deleted_on_read() {
    let (clock, buffs) = ledger();
    buffs.add_buff(R1, BuffType::HEALTH_REGEN, 0.05, ms(2_000), false);

    clock.advance(ms(2_000));
    assert!(buffs.try_get_buff(R1, BuffType::HEALTH_REGEN).is_some());

    clock.advance(ms(1));
    assert!(buffs.has_entry(R1, BuffType::HEALTH_REGEN));
    assert_eq!(buffs.try_get_buff(R1, BuffType::HEALTH_REGEN), None);
    assert!(!buffs.has_entry(R1, BuffType::HEALTH_REGEN));
}

#[test]
fn expired_buff_does_not_block_a_weaker_grant() {
    let (clock, buffs) = ledger();
    buffs.add_buff(R1, BuffType::DEFENCE, 0.9, ms(1_000), false);
    clock.advance(ms(1_500));

    let outcome = buffs.add_buff(R1, BuffType::DEFENCE, 0.2, ms(1_000), false);
    assert_eq!(outcome, BuffOutcome::Applied);
    assert!((buffs.value_or(R1, BuffType::DEFENCE, 0.0) - 0.2).abs() < f32::EPSILON);
}

#[test]
fn buffs_are_scoped_per_entity_and_type() {
    let (_, buffs) = ledger();
    buffs.add_buff(R1, BuffType::ATTACK, 0.5, Buff::PERMANENT, false);

    assert_eq!(buffs.buff_value(Identity::blue(1), BuffType::ATTACK), None);
    assert_eq!(buffs.buff_value(R1, BuffType::DEFENCE), None);
    assert!((buffs.value_or(R1, BuffType::ATTACK, 0.0) - 0.5).abs() < f32::EPSILON);

    buffs.remove_buff(R1, BuffType::ATTACK);
    assert_eq!(buffs.buff_value(R1, BuffType::ATTACK), None);
}
