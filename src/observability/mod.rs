//! Observability
//!
//! Logging, metrics, and the structured event stream used to watch a
//! referee run.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{Event, EventEmitter, RunSummary};
pub use logging::{LogFormat, LogSettings, init_logging};
pub use metrics::init_metrics;
