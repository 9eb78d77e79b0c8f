//! `judge serve`
//!
//! Referees a live match. Commands arrive as JSON lines on stdin, one
//! [`Command`] per line; notifications leave as the JSONL event stream.

use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::args::ServeArgs;
use crate::driver::{Driver, DriverExit};
use crate::error::JudgeError;
use crate::observability::events::{Event, StopReason};
use crate::observability::{EventEmitter, RunSummary};
use crate::referee::Command;

use super::load_config;

/// Feed buffer between the stdin reader and the driver.
const FEED_CAPACITY: usize = 256;

/// Runs the live referee until stdin closes or `cancel` fires.
///
/// # Errors
///
/// Returns a config error for an invalid configuration, an I/O error if the
/// events file or metrics listener cannot be set up, or a driver error if a
/// callback failed.
pub async fn run(args: &ServeArgs, cancel: CancellationToken) -> Result<(), JudgeError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        info!(port, "Prometheus metrics endpoint started");
    }

    let config = load_config(&args.config)?;
    let referee = config.build_referee()?;
    let emitter = Arc::new(match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::stdout(),
    });

    emitter.emit(Event::DriverStarted {
        timestamp: Utc::now(),
        ruleset: config.ruleset.name.clone(),
        entities: config.roster.len(),
        mode: "serve".to_string(),
    });

    let (tx, rx) = mpsc::channel(FEED_CAPACITY);
    let reader = tokio::spawn(read_commands(tokio::io::stdin(), tx));

    let mut driver =
        Driver::new(referee, args.tick, Arc::clone(&emitter)).with_cancellation(cancel);
    let result = driver.run(rx).await;
    reader.abort();

    let reason = match &result {
        Ok(DriverExit::FeedClosed) => StopReason::Completed,
        Ok(DriverExit::Cancelled) => StopReason::Interrupted,
        Err(_) => StopReason::CallbackFailed,
    };
    let summary = RunSummary::of(driver.referee());
    info!(%summary, ?reason, "referee stopped");
    emitter.emit(Event::DriverStopped {
        timestamp: Utc::now(),
        reason,
        summary: Some(summary),
    });

    result?;
    Ok(())
}

/// Parses JSON-line commands from `input` onto `feed`.
///
/// Blank lines are ignored; malformed lines are logged and skipped.
/// Returns the number of commands forwarded.
pub async fn read_commands<R: AsyncRead + Unpin>(input: R, feed: mpsc::Sender<Command>) -> usize {
    let mut lines = BufReader::new(input).lines();
    let mut forwarded = 0;
    let mut line_no = 0usize;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "command input failed");
                break;
            }
        };
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Command>(trimmed) {
            Ok(command) => {
                if feed.send(command).await.is_err() {
                    debug!("driver gone, stopping command reader");
                    break;
                }
                forwarded += 1;
            }
            Err(error) => warn!(line = line_no, %error, "malformed command skipped"),
        }
    }

    debug!(forwarded, "command input closed");
    forwarded
}
