//! CLI argument definitions
//!
//! All Clap derive structs for `judge` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Rules engine for an automated robot-combat referee.
#[derive(Parser, Debug)]
#[command(name = "judge", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "JUDGE_LOG_FORMAT")]
    pub log_format: LogFormatArg,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "JUDGE_COLOR")]
    pub color: ColorChoice,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a scripted match against a configuration.
    Replay(ReplayArgs),

    /// Referee a live match fed with JSONL commands on stdin.
    Serve(ServeArgs),

    /// Validate configuration files.
    Validate(ValidateArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `replay`.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "JUDGE_CONFIG")]
    pub config: PathBuf,

    /// Path to the replay script.
    #[arg(short, long)]
    pub script: PathBuf,

    /// Write the JSONL event stream to this file.
    #[arg(long, env = "JUDGE_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Report format on stdout.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "JUDGE_CONFIG")]
    pub config: PathBuf,

    /// Step period.
    #[arg(long, default_value = "10ms", value_parser = humantime::parse_duration)]
    pub tick: Duration,

    /// Write the JSONL event stream to this file instead of stdout.
    #[arg(long, env = "JUDGE_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Expose Prometheus metrics on this port.
    #[arg(long, env = "JUDGE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable lines.
    #[default]
    Human,
    /// JSON lines.
    Json,
}

impl From<LogFormatArg> for crate::observability::LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Human => Self::Human,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_args() {
        let cli = Cli::try_parse_from([
            "judge", "replay", "--config", "rules.yaml", "--script", "match.yaml",
        ])
        .unwrap();
        let Commands::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.script, PathBuf::from("match.yaml"));
        assert_eq!(args.format, OutputFormat::Human);
    }

    #[test]
    fn test_replay_requires_script() {
        let result = Cli::try_parse_from(["judge", "replay", "--config", "rules.yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serve_tick_is_humantime() {
        let cli =
            Cli::try_parse_from(["judge", "serve", "-c", "rules.yaml", "--tick", "50ms"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.tick, Duration::from_millis(50));
        assert_eq!(args.metrics_port, None);
    }

    #[test]
    fn test_validate_requires_files() {
        assert!(Cli::try_parse_from(["judge", "validate"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "judge",
            "version",
            "-vv",
            "--log-format",
            "json",
            "--color",
            "never",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormatArg::Json);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn test_help_output() {
        let err = Cli::try_parse_from(["judge", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
