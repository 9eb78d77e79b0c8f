//! `judge validate`
//!
//! Loads each configuration file through the full pipeline and reports its
//! errors and warnings without building a referee.

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::{ConfigError, JudgeError, Severity, ValidationIssue};

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Validates configuration files.
///
/// Every file is checked and reported before returning.
///
/// # Errors
///
/// Returns the first file's error if any file is invalid. With `--strict`,
/// warnings also fail validation.
pub fn run(args: &ValidateArgs) -> Result<(), JudgeError> {
    let loader = ConfigLoader::with_defaults();
    let mut reports = Vec::with_capacity(args.files.len());
    let mut first_error: Option<ConfigError> = None;

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        let file = path.display().to_string();

        let report = match loader.load(path) {
            Ok(loaded) if args.strict && !loaded.warnings.is_empty() => {
                let issues = strict_issues(&loaded.warnings);
                let report = FileReport {
                    file: file.clone(),
                    valid: false,
                    errors: issues.iter().map(ToString::to_string).collect(),
                    warnings: Vec::new(),
                };
                first_error.get_or_insert(ConfigError::ValidationError {
                    path: file,
                    errors: issues,
                });
                report
            }
            Ok(loaded) => FileReport {
                file,
                valid: true,
                errors: Vec::new(),
                warnings: loaded.warnings.iter().map(ToString::to_string).collect(),
            },
            Err(error) => {
                let errors = match &error {
                    ConfigError::ValidationError { errors, .. } => {
                        errors.iter().map(ToString::to_string).collect()
                    }
                    other => vec![other.to_string()],
                };
                first_error.get_or_insert(error);
                FileReport {
                    file,
                    valid: false,
                    errors,
                    warnings: Vec::new(),
                }
            }
        };
        reports.push(report);
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Human => {
            for report in &reports {
                let mark = if report.valid { "ok" } else { "FAILED" };
                println!("{}: {mark}", report.file);
                for line in report.errors.iter().chain(&report.warnings) {
                    println!("  {line}");
                }
            }
        }
    }

    first_error.map_or(Ok(()), |error| Err(error.into()))
}

fn strict_issues(warnings: &[LoadWarning]) -> Vec<ValidationIssue> {
    warnings
        .iter()
        .map(|w| ValidationIssue {
            path: w.location.clone().unwrap_or_default(),
            message: w.message.clone(),
            severity: Severity::Error,
        })
        .collect()
}
