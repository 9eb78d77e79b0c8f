//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check and UTF-8 BOM strip
//! 2. Environment variable expansion on the raw text
//! 3. YAML parsing into typed config
//! 4. Validation
//! 5. Freeze with `Arc`

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::schema::JudgeConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Size and count limits.
    pub limits: ConfigLimits,

    /// Whether `${VAR}` references are expanded.
    pub expand_env: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            limits: ConfigLimits::default(),
            expand_env: true,
        }
    }
}

/// Limits on configuration input.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum file size in bytes (`JUDGE_MAX_CONFIG_SIZE`).
    pub max_config_size: usize,

    /// Maximum roster size (`JUDGE_MAX_ENTITIES`).
    pub max_entities: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("JUDGE_MAX_CONFIG_SIZE", 1024 * 1024),
            max_entities: env_or("JUDGE_MAX_ENTITIES", 256),
        }
    }
}

/// A loaded, validated and frozen configuration.
#[derive(Debug)]
pub struct LoadResult {
    /// The configuration.
    pub config: Arc<JudgeConfig>,

    /// Warnings collected while loading.
    pub warnings: Vec<LoadWarning>,
}

/// Non-fatal problem found while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Field path or file the warning refers to.
    pub location: Option<String>,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({location})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Loads, validates and freezes the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file is missing or larger than the size limit
    /// - A required environment variable is unset
    /// - YAML parsing fails or the document is empty
    /// - Validation reports errors
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let raw = read_source(path, self.options.limits.max_config_size)?;
        self.load_str(&raw, path)
    }

    /// Runs the pipeline on text already in memory; `origin` labels errors.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file checks.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let (config, mut warnings) =
            parse_document::<JudgeConfig>(raw, origin, self.options.expand_env)?;

        let result = Validator::new().validate(&config, &self.options.limits);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: result.errors,
            });
        }

        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        tracing::debug!(
            path = %origin.display(),
            ruleset = %config.ruleset.name,
            entities = config.roster.len(),
            warnings = warnings.len(),
            "configuration loaded"
        );

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

/// Reads and parses any YAML document with the loader's first stages.
///
/// Used for inputs that share the config file conventions but not its
/// schema, such as replay scripts.
///
/// # Errors
///
/// Returns an error if the file is missing, too large, empty, or does not
/// parse as `T`.
pub fn read_yaml<T: DeserializeOwned>(
    path: &Path,
    limits: &ConfigLimits,
) -> Result<(T, Vec<LoadWarning>), ConfigError> {
    let raw = read_source(path, limits.max_config_size)?;
    parse_document(&raw, path, true)
}

// ============================================================================
// Pipeline Stages
// ============================================================================

fn read_source(path: &Path, limit: usize) -> Result<String, ConfigError> {
    let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })?;
    let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
    if size > limit {
        return Err(ConfigError::TooLarge { size, limit });
    }

    let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })?;
    Ok(match raw.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => raw,
    })
}

fn parse_document<T: DeserializeOwned>(
    raw: &str,
    origin: &Path,
    expand_env: bool,
) -> Result<(T, Vec<LoadWarning>), ConfigError> {
    let mut env = EnvSubstitution::new();
    let text = if expand_env {
        env.expand(raw, origin)?
    } else {
        raw.to_string()
    };

    let parse_error = |e: serde_yaml::Error| ConfigError::ParseError {
        path: origin.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    };

    let value: serde_yaml::Value = serde_yaml::from_str(&text).map_err(parse_error)?;
    if value.is_null() {
        return Err(ConfigError::ParseError {
            path: origin.to_path_buf(),
            line: None,
            message: "document is empty".to_string(),
        });
    }

    // Typed parse from text keeps line numbers on schema errors.
    let document = serde_yaml::from_str(&text).map_err(parse_error)?;
    Ok((document, env.warnings))
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// What to do when a referenced variable is unset.
#[derive(Debug, PartialEq, Eq)]
enum Fallback<'a> {
    /// Expand to nothing and warn.
    Warn,
    /// `${VAR:-default}`
    Default(&'a str),
    /// `${VAR:?message}`
    Require(&'a str),
}

/// Pre-parse expansion of environment references.
///
/// Supports `${VAR}`, `${VAR:-default}`, `${VAR:?message}` and `$$` for a
/// literal dollar sign. Runs on raw text so expanded values keep YAML type
/// inference.
#[derive(Debug, Default)]
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    fn new() -> Self {
        Self::default()
    }

    fn expand(&mut self, text: &str, origin: &Path) -> Result<String, ConfigError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];

            if let Some(after) = tail.strip_prefix('$') {
                out.push('$');
                rest = after;
            } else if let Some(body) = tail.strip_prefix('{') {
                let Some(end) = closing_brace(body) else {
                    let offset = text.len() - rest.len() + pos;
                    return Err(ConfigError::ParseError {
                        path: origin.to_path_buf(),
                        line: Some(text[..offset].matches('\n').count() + 1),
                        message: "unclosed '${' reference".to_string(),
                    });
                };
                self.resolve(&body[..end], origin, &mut out)?;
                rest = &body[end + 1..];
            } else {
                out.push('$');
                rest = tail;
            }
        }

        out.push_str(rest);
        Ok(out)
    }

    fn resolve(&mut self, spec: &str, origin: &Path, out: &mut String) -> Result<(), ConfigError> {
        let (name, fallback) = split_spec(spec);
        if let Ok(value) = std::env::var(name) {
            out.push_str(&value);
            return Ok(());
        }

        match fallback {
            Fallback::Default(default) => out.push_str(default),
            Fallback::Require(message) => {
                return Err(ConfigError::EnvVarNotSet {
                    var: name.to_string(),
                    location: if message.is_empty() {
                        origin.display().to_string()
                    } else {
                        message.to_string()
                    },
                });
            }
            Fallback::Warn => self.warnings.push(LoadWarning {
                message: format!("environment variable '{name}' is not set, expanded to ''"),
                location: Some(origin.display().to_string()),
            }),
        }
        Ok(())
    }
}

fn split_spec(spec: &str) -> (&str, Fallback<'_>) {
    for (i, _) in spec.match_indices(':') {
        match spec[i + 1..].chars().next() {
            Some('-') => return (&spec[..i], Fallback::Default(&spec[i + 2..])),
            Some('?') => return (&spec[..i], Fallback::Require(&spec[i + 2..])),
            _ => {}
        }
    }
    (spec, Fallback::Warn)
}

/// Byte offset of the `}` closing a `${`, allowing nested braces.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Origin label for text that did not come from a file.
#[must_use]
pub fn inline_origin() -> PathBuf {
    PathBuf::from("<inline>")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(text: &str) -> (Result<String, ConfigError>, Vec<LoadWarning>) {
        let mut env = EnvSubstitution::new();
        let result = env.expand(text, Path::new("rules.yaml"));
        (result, env.warnings)
    }

    #[test]
    fn test_expand_set_variable() {
        let (result, warnings) = expand("path: ${PATH}");
        let text = result.unwrap();
        assert!(!text.contains("${PATH}"));
        assert!(text.len() > "path: ".len());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_expand_default() {
        let (result, _) = expand("name: ${JUDGE_TEST_UNSET_NAME_Q7:-scrimmage}");
        assert_eq!(result.unwrap(), "name: scrimmage");
    }

    #[test]
    fn test_expand_nested_default_braces() {
        let (result, _) = expand("x: ${JUDGE_TEST_UNSET_Q7:-{a: 1}}");
        assert_eq!(result.unwrap(), "x: {a: 1}");
    }

    #[test]
    fn test_expand_required_missing() {
        let (result, _) = expand("x: ${JUDGE_TEST_REQUIRED_Q7:?set the league name}");
        match result {
            Err(ConfigError::EnvVarNotSet { var, location }) => {
                assert_eq!(var, "JUDGE_TEST_REQUIRED_Q7");
                assert_eq!(location, "set the league name");
            }
            other => panic!("expected EnvVarNotSet, got {other:?}"),
        }
    }

    #[test]
    fn test_expand_escaped_and_bare_dollar() {
        let (result, _) = expand("a: $$5\nb: $x");
        assert_eq!(result.unwrap(), "a: $5\nb: $x");
    }

    #[test]
    fn test_expand_missing_warns() {
        let (result, warnings) = expand("x: ${JUDGE_TEST_WARN_Q7}");
        assert_eq!(result.unwrap(), "x: ");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("JUDGE_TEST_WARN_Q7"));
    }

    #[test]
    fn test_expand_unclosed_reports_line() {
        let (result, _) = expand("a: 1\nb: ${OOPS\n");
        assert!(matches!(
            result,
            Err(ConfigError::ParseError { line: Some(2), .. })
        ));
    }

    #[test]
    fn test_split_spec_colon_in_name() {
        assert_eq!(split_spec("A:B"), ("A:B", Fallback::Warn));
        assert_eq!(split_spec("A:-x:?y"), ("A", Fallback::Default("x:?y")));
    }

    #[test]
    fn test_load_str_empty_document() {
        let loader = ConfigLoader::with_defaults();
        let err = loader.load_str("# nothing\n", &inline_origin()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_load_str_validation_error() {
        let loader = ConfigLoader::with_defaults();
        let yaml = "ruleset:\n  name: x\n  health:\n    infantri: [100]\n";
        let err = loader.load_str(yaml, &inline_origin()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_load_str_collects_warnings() {
        let loader = ConfigLoader::with_defaults();
        let result = loader.load_str("ruleset:\n  name: ''\n", &inline_origin()).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].location.as_deref(), Some("ruleset.name"));
    }

    #[test]
    fn test_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "ruleset:\n  name: big\n").unwrap();
        let loader = ConfigLoader::new(LoaderOptions {
            limits: ConfigLimits {
                max_config_size: 4,
                max_entities: 8,
            },
            expand_env: true,
        });
        assert!(matches!(
            loader.load(&path),
            Err(ConfigError::TooLarge { limit: 4, .. })
        ));
    }

    #[test]
    fn test_bom_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "\u{feff}ruleset:\n  name: bom\n").unwrap();
        let result = ConfigLoader::with_defaults().load(&path).unwrap();
        assert_eq!(result.config.ruleset.name, "bom");
    }
}
