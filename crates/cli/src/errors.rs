use pr_metrics_core::errors::PrMetricsError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// The run itself failed
    #[error("{0}")]
    RunFailed(#[from] PrMetricsError),
}

impl std::process::Termination for CliError {
    fn report(self) -> std::process::ExitCode {
        std::process::ExitCode::FAILURE
    }
}
