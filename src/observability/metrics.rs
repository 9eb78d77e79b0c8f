//! Match metrics.
//!
//! Prometheus-compatible counters and gauges. Every label comes from a
//! closed enum (camp, stage), so label cardinality is bounded. Recording
//! without an installed recorder is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::JudgeError;
use crate::identity::Camp;
use crate::scheduler::Stage;

/// Guard against installing the recorder twice.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global metrics recorder.
///
/// With `Some(port)` a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`; with `None` metrics are recorded in-process only.
///
/// # Errors
///
/// Returns `JudgeError::Io` if the recorder or the listener cannot be
/// installed (for example, the port is taken).
pub fn init_metrics(port: Option<u16>) -> Result<(), JudgeError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| JudgeError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!("judge_kills_total", "Entities killed, by victim camp");
    describe_counter!(
        "judge_damage_total",
        "Health removed by armor hits, by victim camp"
    );
    describe_counter!("judge_revives_total", "Successful revives, by camp");
    describe_counter!("judge_overheats_total", "Overheat penalties, by camp");
    describe_counter!(
        "judge_stage_transitions_total",
        "Stage transitions, by source and target stage"
    );
    describe_gauge!("judge_current_stage", "Current stage (1 = active)");
    describe_gauge!("judge_match_time_seconds", "Current match clock time");
    describe_counter!("judge_settlements_total", "Settled matches, by winner");
}

/// Records a kill.
pub fn record_kill(victim: Camp) {
    counter!("judge_kills_total", "camp" => victim.as_str()).increment(1);
}

/// Records health removed by an armor hit.
pub fn record_damage(victim: Camp, amount: u32) {
    counter!("judge_damage_total", "camp" => victim.as_str()).increment(u64::from(amount));
}

/// Records a successful revive.
pub fn record_revive(camp: Camp) {
    counter!("judge_revives_total", "camp" => camp.as_str()).increment(1);
}

/// Records an overheat penalty.
pub fn record_overheat(camp: Camp) {
    counter!("judge_overheats_total", "camp" => camp.as_str()).increment(1);
}

/// Records a stage transition and moves the current-stage gauge.
pub fn record_stage_transition(from: Stage, to: Stage) {
    counter!(
        "judge_stage_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("judge_current_stage", "stage" => from.as_str()).set(0.0);
    gauge!("judge_current_stage", "stage" => to.as_str()).set(1.0);
}

/// Sets the match clock gauge.
pub fn record_match_time(seconds: f64) {
    gauge!("judge_match_time_seconds").set(seconds);
}

/// Records a settled match; `None` is a draw.
pub fn record_settlement(winner: Option<Camp>) {
    let label = winner.map_or("draw", Camp::as_str);
    counter!("judge_settlements_total", "winner" => label).increment(1);
}
