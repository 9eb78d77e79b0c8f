//! Shared integration-test helpers: fixture paths, referee construction
//! from YAML, and spawning the `judge` binary.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use judge_engine::config::{ConfigLoader, loader::inline_origin};
use judge_engine::referee::Referee;

/// Path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Builds a referee from the fixture ruleset and roster.
pub fn fixture_referee() -> Referee {
    let loaded = ConfigLoader::with_defaults()
        .load(&fixture_path("rules.yaml"))
        .expect("fixture config should load");
    loaded
        .config
        .build_referee()
        .expect("fixture config should build")
}

/// Builds a referee from inline YAML.
pub fn referee_from_yaml(yaml: &str) -> Referee {
    let loaded = ConfigLoader::with_defaults()
        .load_str(yaml, &inline_origin())
        .expect("inline config should load");
    loaded
        .config
        .build_referee()
        .expect("inline config should build")
}

/// Steps `referee` `n` times by `dt`.
pub fn step_n(referee: &mut Referee, n: usize, dt: Duration) {
    for _ in 0..n {
        referee.step(dt);
    }
}

/// Runs the `judge` binary to completion.
pub fn run_judge(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_judge"))
        .args(args)
        .env_remove("JUDGE_LOG_LEVEL")
        .env_remove("JUDGE_CONFIG")
        .output()
        .expect("failed to spawn judge")
}
