//! `judge replay`
//!
//! Plays a replay script against a configuration and prints the report.

use chrono::Utc;

use crate::cli::args::{OutputFormat, ReplayArgs};
use crate::config::ConfigLimits;
use crate::error::JudgeError;
use crate::observability::events::{Event, StopReason};
use crate::observability::{EventEmitter, RunSummary};
use crate::replay::{ReplayReport, ReplayScript, run_replay};

use super::{load_config, log_warnings};

/// Runs a replay.
///
/// # Errors
///
/// Returns a config error if the configuration or script is invalid, an
/// I/O error if the events file cannot be created, or a driver error if a
/// callback failed during the replay.
pub fn run(args: &ReplayArgs) -> Result<(), JudgeError> {
    let config = load_config(&args.config)?;
    let (script, warnings) = ReplayScript::load(&args.script, &ConfigLimits::default())?;
    log_warnings(&warnings);

    let mut referee = config.build_referee()?;
    let emitter = match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };

    emitter.emit(Event::DriverStarted {
        timestamp: Utc::now(),
        ruleset: config.ruleset.name.clone(),
        entities: config.roster.len(),
        mode: "replay".to_string(),
    });

    let result = run_replay(&mut referee, &script, Some(&emitter));

    emitter.emit(Event::DriverStopped {
        timestamp: Utc::now(),
        reason: if result.is_ok() {
            StopReason::Completed
        } else {
            StopReason::CallbackFailed
        },
        summary: Some(RunSummary::of(&referee)),
    });

    let report = result?;
    print_report(&report, args.format)
}

fn print_report(report: &ReplayReport, format: OutputFormat) -> Result<(), JudgeError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Human => {
            println!("{}", report.summary);
            println!(
                "commands: {} applied, {} rejected, {} skipped",
                report.applied, report.rejected, report.skipped
            );
            for notification in &report.notifications {
                println!(
                    "  {:>9.3}s  {}",
                    notification.time(),
                    serde_json::to_string(notification)?
                );
            }
        }
    }
    Ok(())
}
