//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod replay;
pub mod serve;
pub mod validate;
pub mod version;

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::config::{ConfigLoader, JudgeConfig, LoadWarning};
use crate::error::JudgeError;

/// Dispatches a parsed CLI invocation to its handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), JudgeError> {
    match cli.command {
        Commands::Replay(args) => replay::run(&args),
        Commands::Serve(args) => serve::run(&args, cancel).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Version(args) => version::run(&args),
    }
}

/// Loads a configuration file, logging its warnings.
pub(crate) fn load_config(path: &Path) -> Result<Arc<JudgeConfig>, JudgeError> {
    tracing::info!(config = %path.display(), "loading configuration");
    let result = ConfigLoader::with_defaults().load(path)?;
    log_warnings(&result.warnings);
    Ok(result.config)
}

pub(crate) fn log_warnings(warnings: &[LoadWarning]) {
    for warning in warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
}
