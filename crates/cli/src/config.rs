use std::path::{Path, PathBuf};

use clap::Args;
use pr_metrics_core::config::{load_inputs_file, Inputs, RawInputs};
use pr_metrics_core::errors::ConfigLoadError;
use tracing::{debug, info};

use crate::errors::CliError;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = ".pr-metrics.toml";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Sizing inputs. Each can also be set through an environment variable or the
/// configuration file; command line values win.
#[derive(Args, Debug, Default, Clone)]
pub struct InputArgs {
    /// Product code lines at or below which a pull request is small
    #[arg(long, env = "PR_METRICS_BASE_SIZE")]
    pub base_size: Option<String>,

    /// Multiplier between consecutive size categories (greater than 1.0)
    #[arg(long, env = "PR_METRICS_GROWTH_RATE")]
    pub growth_rate: Option<String>,

    /// Test lines expected per product code line; 0 disables the test check
    #[arg(long, env = "PR_METRICS_TEST_FACTOR")]
    pub test_factor: Option<String>,

    /// Newline separated globs selecting measured files; prefix with ! to exclude
    #[arg(long, env = "PR_METRICS_FILE_MATCHING_PATTERNS")]
    pub file_matching_patterns: Option<String>,

    /// Newline separated extensions of files that count as code
    #[arg(long, env = "PR_METRICS_CODE_FILE_EXTENSIONS")]
    pub code_file_extensions: Option<String>,
}

impl From<&InputArgs> for RawInputs {
    fn from(args: &InputArgs) -> Self {
        RawInputs {
            base_size: args.base_size.clone(),
            growth_rate: args.growth_rate.clone(),
            test_factor: args.test_factor.clone(),
            file_matching_patterns: args.file_matching_patterns.clone(),
            code_file_extensions: args.code_file_extensions.clone(),
        }
    }
}

/// Get the path to the configuration file
pub fn get_config_path(config_path: Option<&str>, working_directory: &Path) -> PathBuf {
    match config_path {
        Some(path) => PathBuf::from(path),
        None => working_directory.join(DEFAULT_CONFIG_FILENAME),
    }
}

/// Resolves the sizing inputs from the configuration file and the arguments.
///
/// A missing default configuration file is not an error; a missing explicitly named
/// one is.
pub fn resolve_inputs(
    args: &InputArgs,
    config_path: Option<&str>,
    working_directory: &Path,
) -> Result<Inputs, CliError> {
    let path = get_config_path(config_path, working_directory);
    debug!(path = %path.display(), "Loading configuration");

    let from_file = match load_inputs_file(&path) {
        Ok(raw) => {
            info!(path = %path.display(), "Loaded configuration file");
            raw
        }
        Err(ConfigLoadError::NotFound(_)) if config_path.is_none() => {
            debug!("No configuration file found; using arguments and defaults");
            RawInputs::default()
        }
        Err(e) => return Err(CliError::ConfigError(e.to_string())),
    };

    let raw = from_file.merged_with(&RawInputs::from(args));
    Ok(Inputs::from_raw(&raw))
}
