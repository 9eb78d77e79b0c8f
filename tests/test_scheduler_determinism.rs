//! Stage callbacks, periodic cadence, resets from inside callbacks, and
//! run-to-run determinism of the referee loop.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use common::{fixture_referee, step_n};
use judge_engine::bus::Notification;
use judge_engine::combat::Penalty;
use judge_engine::entity::{AmmoType, ArmorId};
use judge_engine::identity::Identity;
use judge_engine::referee::{Command, Referee};
use judge_engine::scheduler::Stage;
use judge_engine::store::{StoreKey, Value};

const TICK: Duration = Duration::from_millis(100);

fn marker() -> StoreKey {
    StoreKey::named("test.marker")
}

fn counter() -> StoreKey {
    StoreKey::named("test.counter")
}

fn count(referee: &Referee) -> u32 {
    referee.store().load(counter())
}

#[test]
fn stage_callback_fires_at_stage_relative_time() {
    let mut referee = fixture_referee();
    let key = marker();
    referee
        .scheduler_mut()
        .at_stage(Stage::Match, Duration::from_secs(2), move |r: &mut Referee| {
            r.store().save(key, r.time());
        });

    referee.set_stage(Stage::Countdown);
    step_n(&mut referee, 100, TICK);

    assert_eq!(referee.stage(), Stage::Match);
    let fired_at: f64 = referee.store().try_load(key).unwrap();
    assert!((fired_at - 7.0).abs() < 1e-6, "fired at {fired_at}");
}

#[test]
fn stage_callback_waits_for_its_stage() {
    let mut referee = fixture_referee();
    let key = counter();
    referee
        .scheduler_mut()
        .at_stage(Stage::Settlement, Duration::ZERO, move |r: &mut Referee| {
            r.store().update(key, |n: u32| n + 1);
        });

    step_n(&mut referee, 50, TICK);
    assert_eq!(count(&referee), 0);

    referee.set_stage(Stage::Settlement);
    step_n(&mut referee, 5, TICK);
    assert_eq!(count(&referee), 1);
}

#[test]
fn every_keeps_cadence() {
    let mut referee = fixture_referee();
    let key = counter();
    referee
        .scheduler_mut()
        .every(Duration::from_millis(200), move |r: &mut Referee| {
            r.store().update(key, |n: u32| n + 1);
        });

    step_n(&mut referee, 30, TICK);
    assert_eq!(count(&referee), 15);
}

#[test]
fn every_fires_once_after_a_jump() {
    let mut referee = fixture_referee();
    let key = counter();
    referee
        .scheduler_mut()
        .every(Duration::from_millis(200), move |r: &mut Referee| {
            r.store().update(key, |n: u32| n + 1);
        });

    referee.step(Duration::from_secs(1));
    assert_eq!(count(&referee), 1);
}

#[test]
fn cancelled_callback_never_fires() {
    let mut referee = fixture_referee();
    let key = counter();
    let task = referee
        .scheduler_mut()
        .every(Duration::from_millis(200), move |r: &mut Referee| {
            r.store().update(key, |n: u32| n + 1);
        });

    step_n(&mut referee, 2, TICK);
    assert_eq!(count(&referee), 1);

    referee.scheduler_mut().cancel(task);
    step_n(&mut referee, 10, TICK);
    assert_eq!(count(&referee), 1);
}

#[test]
fn reset_inside_callback_drops_rest_of_tick() {
    let mut referee = fixture_referee();
    let key = marker();
    referee
        .scheduler_mut()
        .after(Duration::from_secs(1), |r: &mut Referee| r.reset());
    referee
        .scheduler_mut()
        .after(Duration::from_secs(1), move |r: &mut Referee| {
            r.store().save(key, true);
        });

    step_n(&mut referee, 10, TICK);

    assert_eq!(referee.round(), 2);
    assert_eq!(referee.stage(), Stage::OutOfMatch);
    assert!(referee.time().abs() < f64::EPSILON);
    assert!(!referee.store().exists(key));
    assert_eq!(referee.health(Identity::red(1)), 150);

    // Round callbacks are live again: the countdown still times out.
    referee.set_stage(Stage::Countdown);
    step_n(&mut referee, 51, TICK);
    assert_eq!(referee.stage(), Stage::Match);
}

#[test]
fn pause_freezes_stage_time() {
    let mut referee = fixture_referee();
    referee.set_stage(Stage::Match);
    step_n(&mut referee, 20, TICK);

    referee.apply(Command::Pause).unwrap();
    assert_eq!(referee.stage(), Stage::Pause);
    step_n(&mut referee, 600, Duration::from_secs(1));
    assert_eq!(referee.stage(), Stage::Pause);

    referee.apply(Command::Resume).unwrap();
    assert_eq!(referee.stage(), Stage::Match);
    assert!((referee.scheduler_ref().stage_elapsed() - 2.0).abs() < 1e-6);
}

#[test]
fn stages_advance_through_the_cycle() {
    let mut referee = fixture_referee();
    let mut rx = referee.subscribe();
    referee.set_stage(Stage::Repair);

    // repair 30s + self check 10s + countdown 5s + match 7min + settlement 20s
    step_n(&mut referee, 30 + 10 + 5 + 420 + 20, Duration::from_secs(1));
    assert_eq!(referee.stage(), Stage::OutOfMatch);

    let stages: Vec<Stage> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|n| match n {
            Notification::StageChanged { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            Stage::Repair,
            Stage::SelfCheck,
            Stage::Countdown,
            Stage::Match,
            Stage::Settlement,
            Stage::OutOfMatch,
        ]
    );
}

fn scripted_run() -> (Vec<Notification>, BTreeMap<u64, Value>) {
    let mut referee = fixture_referee();
    let mut rx = referee.subscribe();
    let tx = referee.command_sender();

    let script: Vec<(usize, Command)> = vec![
        (0, Command::SetStage { stage: Stage::Match }),
        (
            3,
            Command::ArmorHit {
                attacker: Identity::blue(1),
                victim: Identity::red(3),
                ammo: AmmoType::Large,
                armor: ArmorId(1),
            },
        ),
        (
            4,
            Command::Shot {
                shooter: Identity::red(1),
                ammo: AmmoType::Large,
            },
        ),
        (
            7,
            Command::Penalty {
                entity: Identity::blue(3),
                penalty: Penalty::Red,
            },
        ),
        (
            9,
            Command::ArmorHit {
                attacker: Identity::red(1),
                victim: Identity::blue(18),
                ammo: AmmoType::Dart,
                armor: ArmorId(0),
            },
        ),
    ];

    let mut notifications = Vec::new();
    for tick in 0..40 {
        for (_, command) in script.iter().filter(|(at, _)| *at == tick) {
            tx.send(command.clone()).unwrap();
        }
        referee.step(TICK);
        notifications.extend(std::iter::from_fn(|| rx.try_recv().ok()));
    }
    (notifications, referee.store().snapshot())
}

#[test]
fn identical_inputs_yield_identical_notifications_and_state() {
    let (first, first_state) = scripted_run();
    let (second, second_state) = scripted_run();
    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert!(!first_state.is_empty());
    assert_eq!(first_state, second_state);

    let times: Vec<f64> = first.iter().map(Notification::time).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]), "{times:?}");
}
