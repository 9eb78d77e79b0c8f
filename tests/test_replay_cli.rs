mod common;

use common::{fixture_path, run_judge};
use serde_json::Value;

fn replay_json() -> Value {
    let config = fixture_path("rules.yaml");
    let script = fixture_path("replay.yaml");
    let output = run_judge(&[
        "--quiet",
        "replay",
        "--config",
        config.to_str().unwrap(),
        "--script",
        script.to_str().unwrap(),
        "--format",
        "json",
    ]);
    assert!(
        output.status.success(),
        "replay should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("report should be JSON")
}

#[test]
fn replay_settles_on_base_health() {
    let report = replay_json();
    let summary = &report["summary"];
    assert_eq!(summary["ruleset"], "regional");
    assert_eq!(summary["stage"], "settlement");
    assert_eq!(summary["settlement"]["winner"], "red");
    assert_eq!(summary["settlement"]["reason"], "base_health");
}

#[test]
fn replay_counts_rejected_commands() {
    let report = replay_json();
    assert_eq!(report["applied"], 7);
    assert_eq!(report["rejected"], 1);
    assert_eq!(report["skipped"], 0);
}

#[test]
fn replay_red_card_kills_before_revive_attempt() {
    let report = replay_json();
    let kinds: Vec<&str> = report["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type"].as_str().unwrap())
        .collect();

    let penalized = kinds.iter().rposition(|k| *k == "penalized").unwrap();
    let killed = kinds.iter().position(|k| *k == "killed").unwrap();
    assert!(penalized < killed, "red card is published before the kill: {kinds:?}");
    assert!(!kinds.contains(&"revived"), "red-carded entity must not revive");
    assert_eq!(kinds.last(), Some(&"match_settled"));
}

#[test]
fn replay_is_reproducible() {
    let first = replay_json();
    let second = replay_json();
    assert_eq!(first["notifications"], second["notifications"]);
    assert_eq!(first["summary"]["settlement"], second["summary"]["settlement"]);
}

#[test]
fn replay_writes_event_stream() {
    let dir = tempfile::tempdir().unwrap();
    let events = dir.path().join("events.jsonl");
    let config = fixture_path("rules.yaml");
    let script = fixture_path("replay.yaml");
    let output = run_judge(&[
        "--quiet",
        "replay",
        "-c",
        config.to_str().unwrap(),
        "-s",
        script.to_str().unwrap(),
        "--events-file",
        events.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let text = std::fs::read_to_string(&events).unwrap();
    let lines: Vec<Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.first().unwrap()["event"], "driver_started");
    assert_eq!(lines.last().unwrap()["event"], "driver_stopped");
    assert_eq!(lines.last().unwrap()["reason"], "completed");
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line["sequence"], i);
    }
}

#[test]
fn validate_accepts_fixture() {
    let config = fixture_path("rules.yaml");
    let output = run_judge(&["--quiet", "validate", config.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stdout)
    );
}

#[test]
fn validate_reports_typo_with_suggestion() {
    let config = fixture_path("typo.yaml");
    let output = run_judge(&[
        "--quiet",
        "validate",
        "--format",
        "json",
        config.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));

    let reports: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["valid"], false);
    let errors = reports[0]["errors"].to_string();
    assert!(errors.contains("did you mean 'infantry'"), "{errors}");
}

#[test]
fn validate_empty_file_fails() {
    let config = fixture_path("empty.yaml");
    let output = run_judge(&["--quiet", "validate", config.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("empty"), "{stderr}");
}

#[test]
fn version_json() {
    let output = run_judge(&["version", "--format", "json"]);
    assert!(output.status.success());
    let info: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["name"], "judge-engine");
}
