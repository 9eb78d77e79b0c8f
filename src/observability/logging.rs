//! Logging setup for the `judge` binary.
//!
//! Verbosity flags raise this crate's level only; dependencies stay at
//! `warn`. `JUDGE_LOG_LEVEL` replaces the whole filter when set.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time;

use crate::cli::args::ColorChoice;

/// Environment variable overriding the verbosity flags.
pub const LOG_LEVEL_ENV: &str = "JUDGE_LOG_LEVEL";

const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines with uptime stamps
    #[default]
    Human,
    /// One flattened JSON object per event
    Json,
}

/// Resolved logging options.
#[derive(Debug, Clone, Copy)]
pub struct LogSettings {
    /// Output format
    pub format: LogFormat,
    /// Count of `-v` flags
    pub verbosity: u8,
    /// Color control for human output
    pub color: ColorChoice,
}

impl LogSettings {
    /// Filter directive for the verbosity flags, e.g. `warn,judge_engine=debug`.
    #[must_use]
    pub fn directive(&self) -> String {
        let level = match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("warn,{CRATE_TARGET}={level}")
    }

    /// Whether human output gets ANSI colors. JSON never does.
    #[must_use]
    pub fn ansi(&self) -> bool {
        if self.format == LogFormat::Json {
            return false;
        }
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new(self.directive()))
    }

    /// Installs the global subscriber on stderr. Returns `false` if one was
    /// already installed.
    pub fn install(self) -> bool {
        let show_target = self.verbosity >= 2;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_target(show_target)
            .with_writer(std::io::stderr);

        match self.format {
            LogFormat::Human => builder
                .with_ansi(self.ansi())
                .with_timer(time::uptime())
                .try_init()
                .is_ok(),
            LogFormat::Json => builder
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .try_init()
                .is_ok(),
        }
    }
}

/// Installs logging for the CLI. Repeated calls keep the first subscriber.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let installed = LogSettings {
        format,
        verbosity,
        color,
    }
    .install();
    if installed {
        tracing::debug!(?format, verbosity, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(format: LogFormat, verbosity: u8, color: ColorChoice) -> LogSettings {
        LogSettings {
            format,
            verbosity,
            color,
        }
    }

    #[test]
    fn test_verbosity_only_raises_own_crate() {
        let quiet = settings(LogFormat::Human, 0, ColorChoice::Never);
        assert_eq!(quiet.directive(), "warn,judge_engine=warn");
        let loud = settings(LogFormat::Human, 9, ColorChoice::Never);
        assert_eq!(loud.directive(), "warn,judge_engine=trace");
        assert!(settings(LogFormat::Human, 2, ColorChoice::Never)
            .directive()
            .ends_with("=debug"));
    }

    #[test]
    fn test_json_is_never_colored() {
        assert!(!settings(LogFormat::Json, 0, ColorChoice::Always).ansi());
        assert!(settings(LogFormat::Human, 0, ColorChoice::Always).ansi());
        assert!(!settings(LogFormat::Human, 0, ColorChoice::Never).ansi());
    }

    #[test]
    fn test_second_install_is_refused() {
        init_logging(LogFormat::Human, 0, ColorChoice::Never);
        assert!(!settings(LogFormat::Json, 3, ColorChoice::Never).install());
    }
}
