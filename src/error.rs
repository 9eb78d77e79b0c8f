//! Error types for the referee core
//!
//! Invalid-argument conditions (unknown camp, unknown ammo classification,
//! entities missing from the roster) are errors. Expected precondition
//! failures such as a rejected buff or a revive on a living robot are not;
//! those are reported through enums and booleans by the owning module.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `judge` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Rules error (unknown camp, ammo, entity)
    pub const RULES_ERROR: i32 = 4;

    /// Driver error (callback failure halted the round)
    pub const DRIVER_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for referee operations.
///
/// Aggregates all domain-specific errors and maps each to an exit code.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid argument passed into the rules engine
    #[error(transparent)]
    Rules(#[from] RulesError),

    /// Real-time driver error
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl JudgeError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Rules(_) => ExitCode::RULES_ERROR,
            Self::Driver(_) => ExitCode::DRIVER_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Rules Errors
// ============================================================================

/// Invalid-argument conditions raised by the rules engine.
///
/// These indicate a caller bug (or a corrupt hardware frame) and are never
/// recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    /// Camp name or code does not exist
    #[error("unknown camp: {0}")]
    UnknownCamp(String),

    /// Ammo classification does not exist
    #[error("unknown ammo type: {0}")]
    UnknownAmmo(String),

    /// Stage name does not exist
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    /// Entity is not present in the roster
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Identity text could not be parsed
    #[error("invalid identity '{0}' (expected '<camp>:<id>')")]
    InvalidIdentity(String),

    /// Slot id does not fit the requested encoding
    #[error("id {id} does not fit in {bits} bits")]
    IdOutOfRange {
        /// Offending id
        id: u16,
        /// Width of the target encoding
        bits: u8,
    },

    /// Ruleset has no table entry for the requested lookup
    #[error("ruleset has no {table} entry for {key}")]
    MissingTable {
        /// Name of the table
        table: &'static str,
        /// Lookup key that had no entry
        key: String,
    },
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("file too large: {size} bytes (limit: {limit})")]
    TooLarge {
        /// Actual file size in bytes
        size: usize,
        /// Configured size limit in bytes
        limit: usize,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "roster[2].kind")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Validation failure that prevents the configuration from being used
    Error,
    /// Potential issue that does not prevent loading
    Warning,
}

// ============================================================================
// Driver Errors
// ============================================================================

/// Errors raised by the real-time match driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A scheduled callback panicked; the round is halted
    #[error("scheduled callback failed at t={time:.3}s: {message}")]
    CallbackPanicked {
        /// Match time of the failing step
        time: f64,
        /// Panic payload, when it was a string
        message: String,
    },

    /// The command channel was closed while the driver was running
    #[error("command channel closed")]
    ChannelClosed,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for referee operations.
pub type Result<T> = std::result::Result<T, JudgeError>;

// ============================================================================
// Tests
// ============================================================================
