//! # PR Metrics CLI
//!
//! Sizes the pull request being built and keeps its metrics comment, file notices,
//! title prefix and metadata up to date.
//!
//! The pull request, host and credentials are detected from the CI environment
//! (Azure Pipelines or GitHub Actions). Sizing inputs come from the command line,
//! `PR_METRICS_*` environment variables or a `.pr-metrics.toml` file.
//!
//! # Exit Codes
//!
//! - `0` - the pull request was updated, or the run was skipped
//! - `1` - the run failed
//! - `3` - the run was stopped because no access token is available
//!
//! # Examples
//!
//! ```bash
//! pr-metrics --base-size 250 --growth-rate 2.5
//! ```

#![deny(missing_docs)]

use std::path::PathBuf;
use std::process::{ExitCode, Termination};

use clap::Parser;
use pr_metrics_core::localization::ResourceLocalizer;
use pr_metrics_core::{precheck, PrMetrics, RunEnvironment, RunStatus};
use pr_metrics_developer_platforms::azure::AzureReposHost;
use pr_metrics_developer_platforms::git::GitCli;
use pr_metrics_developer_platforms::github::{create_token_client, GitHubHost};
use pr_metrics_developer_platforms::{GitClient, PullRequestHost};
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Command-line configuration handling.
mod config;

/// CI environment detection.
mod environment;

/// Error types specific to the CLI.
mod errors;

use config::{resolve_inputs, InputArgs};
use environment::{detect, HostSettings, PullRequestSettings};
use errors::CliError;

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Exit code reported when a run is stopped before it starts.
const STOPPED_EXIT_CODE: u8 = 3;

/// Command-line interface structure for PR Metrics.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Alternate config file
    #[arg(short, long)]
    config: Option<String>,

    /// Sizing inputs
    #[command(flatten)]
    inputs: InputArgs,
}

/// Main entry point for the PR Metrics CLI.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_env("PR_METRICS_LOG")
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(&cli).await {
        Ok(status) => {
            info!(status = status.message(), "PR Metrics finished");
            ExitCode::from(exit_code(&status))
        }
        Err(e) => {
            error!("PR Metrics failed: {}", e);
            e.report()
        }
    }
}

/// Maps a completed run to its exit code.
fn exit_code(status: &RunStatus) -> u8 {
    match status {
        RunStatus::Succeeded(_) | RunStatus::Skipped(_) => 0,
        RunStatus::Stopped(_) => STOPPED_EXIT_CODE,
    }
}

/// Detects the pull request, resolves the inputs and runs PR Metrics.
#[instrument(skip(cli))]
async fn run(cli: &Cli) -> Result<RunStatus, CliError> {
    let localizer = ResourceLocalizer::english();
    let detection = detect(|name| std::env::var(name).ok())?;

    if let Some(status) = precheck(&detection.run, &localizer) {
        warn!(status = status.message(), "Not running PR Metrics");
        return Ok(status);
    }

    let Some(settings) = detection.settings else {
        return Err(CliError::ConfigError(
            "The pull request settings could not be determined.".to_string(),
        ));
    };

    let working_directory = PathBuf::from(&settings.working_directory);
    let inputs = resolve_inputs(&cli.inputs, cli.config.as_deref(), &working_directory)?;
    let git = GitCli::new(
        &working_directory,
        &settings.target_branch,
        settings.pull_request_id,
    );

    match &settings.host {
        HostSettings::AzureRepos(config) => {
            let host = AzureReposHost::new(config)
                .map_err(|e| CliError::AuthError(e.to_string()))?;
            run_with_host(host, git, localizer, inputs, &detection.run, &settings).await
        }
        HostSettings::GitHub {
            owner,
            repository,
            pull_request_number,
            token,
        } => {
            let client = create_token_client(token).map_err(|e| CliError::AuthError(e.to_string()))?;
            let host = GitHubHost::new(client, owner, repository, *pull_request_number);
            run_with_host(host, git, localizer, inputs, &detection.run, &settings).await
        }
    }
}

/// Runs PR Metrics against a constructed host.
async fn run_with_host<H: PullRequestHost, G: GitClient>(
    host: H,
    git: G,
    localizer: ResourceLocalizer,
    inputs: pr_metrics_core::config::Inputs,
    environment: &RunEnvironment,
    settings: &PullRequestSettings,
) -> Result<RunStatus, CliError> {
    info!(
        host = environment.host_name.as_str(),
        pull_request = settings.pull_request_id,
        target_branch = settings.target_branch.as_str(),
        "Running PR Metrics"
    );

    let metrics = PrMetrics::new(host, git, localizer, inputs);
    Ok(metrics.run(environment).await?)
}
