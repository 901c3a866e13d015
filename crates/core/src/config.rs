//! Configuration settings for PR Metrics.
//!
//! Inputs arrive as optional strings (from the command line, the environment or a
//! TOML file) and are validated into [`Inputs`]. Invalid values never fail a run:
//! they are replaced by their defaults and the replacement is logged.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::ConfigLoadError;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Default number of product code lines at or below which a pull request is small
pub const DEFAULT_BASE_SIZE: u64 = 200;

/// Default multiplier between consecutive size categories
pub const DEFAULT_GROWTH_RATE: f64 = 2.0;

/// Default number of test lines expected per product code line
pub const DEFAULT_TEST_FACTOR: f64 = 1.0;

/// Default glob patterns selecting the files that are measured
pub const DEFAULT_FILE_MATCHING_PATTERNS: [&str; 1] = ["**/*"];

/// Default extensions of files that count as code
pub const DEFAULT_CODE_FILE_EXTENSIONS: [&str; 64] = [
    "ada", "adb", "ads", "asm", "bas", "bb", "bmx", "c", "cbl", "cc", "cjs", "clj", "cls",
    "cob", "cpp", "cs", "cshtml", "css", "cxx", "d", "dart", "e", "erl", "ex", "exs", "f",
    "f90", "fs", "fsx", "go", "groovy", "h", "hpp", "hs", "hxx", "java", "jl", "js", "jsx",
    "kt", "kts", "less", "lua", "m", "mjs", "ml", "mm", "php", "pl", "ps1", "psm1", "py",
    "r", "rb", "rs", "sass", "scala", "scss", "sh", "sql", "swift", "ts", "tsx", "vb",
];

/// Raw, unvalidated inputs as supplied by the user.
///
/// Multi-value inputs are newline separated, matching how pipeline task inputs are
/// provided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawInputs {
    #[serde(default)]
    pub base_size: Option<String>,

    #[serde(default)]
    pub growth_rate: Option<String>,

    #[serde(default)]
    pub test_factor: Option<String>,

    #[serde(default)]
    pub file_matching_patterns: Option<String>,

    #[serde(default)]
    pub code_file_extensions: Option<String>,
}

impl RawInputs {
    /// Returns a copy of `self` where every value present in `overrides` wins.
    pub fn merged_with(&self, overrides: &RawInputs) -> RawInputs {
        fn pick(base: &Option<String>, over: &Option<String>) -> Option<String> {
            over.clone().or_else(|| base.clone())
        }

        RawInputs {
            base_size: pick(&self.base_size, &overrides.base_size),
            growth_rate: pick(&self.growth_rate, &overrides.growth_rate),
            test_factor: pick(&self.test_factor, &overrides.test_factor),
            file_matching_patterns: pick(
                &self.file_matching_patterns,
                &overrides.file_matching_patterns,
            ),
            code_file_extensions: pick(&self.code_file_extensions, &overrides.code_file_extensions),
        }
    }
}

/// Validated inputs used by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    /// Product code lines at or below which the pull request is small
    pub base_size: u64,

    /// Multiplier between consecutive size categories, always greater than 1.0
    pub growth_rate: f64,

    /// Test lines expected per product code line, or `None` when the test coverage
    /// assessment is disabled
    pub test_factor: Option<f64>,

    /// Glob patterns selecting measured files. Entries starting with `!` exclude.
    pub file_matching_patterns: Vec<String>,

    /// Lower-case file extensions, without a leading dot, that count as code
    pub code_file_extensions: BTreeSet<String>,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            base_size: DEFAULT_BASE_SIZE,
            growth_rate: DEFAULT_GROWTH_RATE,
            test_factor: Some(DEFAULT_TEST_FACTOR),
            file_matching_patterns: DEFAULT_FILE_MATCHING_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            code_file_extensions: DEFAULT_CODE_FILE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl Inputs {
    /// Validates raw inputs, substituting defaults for absent or invalid values.
    ///
    /// # Examples
    ///
    /// ```
    /// use pr_metrics_core::config::{Inputs, RawInputs};
    ///
    /// let raw = RawInputs {
    ///     base_size: Some("5".to_string()),
    ///     growth_rate: Some("0.5".to_string()),
    ///     test_factor: Some("0".to_string()),
    ///     ..Default::default()
    /// };
    ///
    /// let inputs = Inputs::from_raw(&raw);
    /// assert_eq!(inputs.base_size, 5);
    /// assert_eq!(inputs.growth_rate, 2.0);
    /// assert_eq!(inputs.test_factor, None);
    /// ```
    pub fn from_raw(raw: &RawInputs) -> Self {
        let inputs = Self {
            base_size: parse_base_size(raw.base_size.as_deref()),
            growth_rate: parse_growth_rate(raw.growth_rate.as_deref()),
            test_factor: parse_test_factor(raw.test_factor.as_deref()),
            file_matching_patterns: parse_file_matching_patterns(
                raw.file_matching_patterns.as_deref(),
            ),
            code_file_extensions: parse_code_file_extensions(raw.code_file_extensions.as_deref()),
        };

        debug!(
            base_size = inputs.base_size,
            growth_rate = inputs.growth_rate,
            test_factor = ?inputs.test_factor,
            patterns = inputs.file_matching_patterns.len(),
            extensions = inputs.code_file_extensions.len(),
            "Resolved inputs"
        );
        inputs
    }
}

fn parse_base_size(value: Option<&str>) -> u64 {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => DEFAULT_BASE_SIZE,
        Some(v) => match v.parse::<u64>() {
            Ok(size) if size > 0 => size,
            _ => {
                info!(
                    value = v,
                    default = DEFAULT_BASE_SIZE,
                    "Base size is not a positive integer; using the default"
                );
                DEFAULT_BASE_SIZE
            }
        },
    }
}

fn parse_growth_rate(value: Option<&str>) -> f64 {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => DEFAULT_GROWTH_RATE,
        Some(v) => match v.parse::<f64>() {
            Ok(rate) if rate.is_finite() && rate > 1.0 => rate,
            _ => {
                info!(
                    value = v,
                    default = DEFAULT_GROWTH_RATE,
                    "Growth rate is not a number greater than 1.0; using the default"
                );
                DEFAULT_GROWTH_RATE
            }
        },
    }
}

fn parse_test_factor(value: Option<&str>) -> Option<f64> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Some(DEFAULT_TEST_FACTOR),
        Some(v) => match v.parse::<f64>() {
            Ok(factor) if factor == 0.0 => {
                info!("Test factor is zero; the test coverage assessment is disabled");
                None
            }
            Ok(factor) if factor.is_finite() && factor > 0.0 => Some(factor),
            _ => {
                info!(
                    value = v,
                    default = DEFAULT_TEST_FACTOR,
                    "Test factor is not a non-negative number; using the default"
                );
                Some(DEFAULT_TEST_FACTOR)
            }
        },
    }
}

fn split_lines(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}

fn parse_file_matching_patterns(value: Option<&str>) -> Vec<String> {
    let patterns = split_lines(value);
    if patterns.is_empty() {
        return DEFAULT_FILE_MATCHING_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .collect();
    }

    patterns
}

fn parse_code_file_extensions(value: Option<&str>) -> BTreeSet<String> {
    let extensions: BTreeSet<String> = split_lines(value)
        .into_iter()
        .map(|e| {
            let e = e.strip_prefix('*').unwrap_or(&e);
            e.strip_prefix('.').unwrap_or(e).to_lowercase()
        })
        .filter(|e| !e.is_empty())
        .collect();

    if extensions.is_empty() {
        return DEFAULT_CODE_FILE_EXTENSIONS
            .iter()
            .map(|e| e.to_string())
            .collect();
    }

    extensions
}

/// Loads raw inputs from a TOML file.
///
/// # Arguments
/// * `path` - Path to the configuration file
///
/// # Returns
/// * `Ok(RawInputs)` if the file was read and parsed
/// * `Err(ConfigLoadError)` if it is missing, unreadable or malformed
pub fn load_inputs_file<P: AsRef<Path>>(path: P) -> Result<RawInputs, ConfigLoadError> {
    let path_ref = path.as_ref();
    let content = match fs::read_to_string(path_ref) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigLoadError::NotFound(path_ref.display().to_string()));
        }
        Err(e) => return Err(ConfigLoadError::Io(e)),
    };

    let raw: RawInputs = toml::from_str(&content)?;
    Ok(raw)
}
