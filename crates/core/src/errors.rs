use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

#[derive(Error, Debug)]
pub enum PrMetricsError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("The diff header '{0}' could not be parsed.")]
    DiffHeaderMismatch(String),

    #[error("The diff summary was empty. There are no changes to measure.")]
    EmptyDiffSummary,

    #[error("Developer platform error: {0}")]
    PlatformError(#[from] pr_metrics_developer_platforms::errors::Error),

    #[error("Invalid file matching pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid size parameters: {0}")]
    InvalidSizeParameters(String),

    #[error("The diff summary line '{0}' could not be parsed.")]
    MalformedDiffSummaryLine(String),

    #[error("{field} must be greater than or equal to zero, but was {value}.")]
    NegativeMetric { field: &'static str, value: i64 },

    #[error("{failed} of {total} pull request updates failed. First failure: {first}")]
    OperationsFailed {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),
}
