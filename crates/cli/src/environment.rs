//! Detection of the CI system, pull request and host from environment variables.

use pr_metrics_core::RunEnvironment;
use pr_metrics_developer_platforms::azure::AzureReposConfig;
use tracing::debug;

use crate::errors::CliError;

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;

/// Variable holding an explicitly provided access token
pub const ACCESS_TOKEN_VARIABLE: &str = "PR_METRICS_ACCESS_TOKEN";

const AZURE_REPOS_HOST: &str = "Azure Repos";
const GITHUB_HOST: &str = "GitHub";

/// How to reach the pull request host.
#[derive(Debug, Clone)]
pub enum HostSettings {
    AzureRepos(AzureReposConfig),
    GitHub {
        owner: String,
        repository: String,
        pull_request_number: u64,
        token: String,
    },
}

/// Everything needed to run against a detected pull request.
#[derive(Debug, Clone)]
pub struct PullRequestSettings {
    pub host: HostSettings,

    /// The branch the pull request merges into
    pub target_branch: String,

    /// The number used in the `pull/<n>/merge` ref
    pub pull_request_id: u64,

    /// The root of the git checkout
    pub working_directory: String,
}

/// The outcome of inspecting the environment.
#[derive(Debug, Clone)]
pub struct Detection {
    pub run: RunEnvironment,

    /// Present only when the run can proceed.
    pub settings: Option<PullRequestSettings>,
}

impl Detection {
    fn skipped(host_name: &str, is_pull_request: bool, is_supported_host: bool) -> Self {
        Self {
            run: RunEnvironment {
                is_pull_request,
                host_name: host_name.to_string(),
                is_supported_host,
                has_credential: false,
            },
            settings: None,
        }
    }
}

/// Inspects the environment through `var` to find the pull request being built.
///
/// Azure Pipelines (`TF_BUILD`) and GitHub Actions (`GITHUB_ACTIONS`) are recognised.
/// Anything else is treated as a run outside of a pull request.
///
/// # Errors
///
/// Returns [`CliError::ConfigError`] if the CI system reports a pull request but a
/// variable describing it is missing or malformed.
pub fn detect<F>(var: F) -> Result<Detection, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());

    if var("TF_BUILD").is_some() {
        detect_azure_pipelines(&var)
    } else if var("GITHUB_ACTIONS").as_deref() == Some("true") {
        detect_github_actions(&var)
    } else {
        debug!("No supported CI system detected");
        Ok(Detection::skipped("unknown", false, false))
    }
}

fn detect_azure_pipelines<F>(var: &F) -> Result<Detection, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = var("BUILD_REPOSITORY_PROVIDER").unwrap_or_default();
    let host_name = match provider.as_str() {
        "TfsGit" => AZURE_REPOS_HOST,
        "GitHub" | "GitHubEnterprise" => GITHUB_HOST,
        other => other,
    };

    let Some(pull_request_id) = var("SYSTEM_PULLREQUEST_PULLREQUESTID") else {
        return Ok(Detection::skipped(host_name, false, true));
    };

    debug!(provider = provider.as_str(), "Detected Azure Pipelines");
    let target_branch = required(var, "SYSTEM_PULLREQUEST_TARGETBRANCH")?;
    let working_directory =
        var("BUILD_REPOSITORY_LOCALPATH").unwrap_or_else(|| ".".to_string());

    match host_name {
        AZURE_REPOS_HOST => {
            let pull_request_id = parse_number("SYSTEM_PULLREQUEST_PULLREQUESTID", &pull_request_id)?;
            let token = var(ACCESS_TOKEN_VARIABLE).or_else(|| var("SYSTEM_ACCESSTOKEN"));
            let host = match token {
                Some(access_token) => HostSettings::AzureRepos(AzureReposConfig {
                    collection_uri: required(var, "SYSTEM_TEAMFOUNDATIONCOLLECTIONURI")?,
                    project: required(var, "SYSTEM_TEAMPROJECT")?,
                    repository: required(var, "BUILD_REPOSITORY_NAME")?,
                    pull_request_id,
                    access_token,
                }),
                None => return Ok(Detection::skipped(host_name, true, true)),
            };

            Ok(ready(host_name, host, target_branch, pull_request_id, working_directory))
        }
        GITHUB_HOST => {
            let number = parse_number(
                "SYSTEM_PULLREQUEST_PULLREQUESTNUMBER",
                &required(var, "SYSTEM_PULLREQUEST_PULLREQUESTNUMBER")?,
            )?;
            let Some(token) = var(ACCESS_TOKEN_VARIABLE) else {
                return Ok(Detection::skipped(host_name, true, true));
            };
            let (owner, repository) = split_repository(&required(var, "BUILD_REPOSITORY_NAME")?)?;

            let host = HostSettings::GitHub {
                owner,
                repository,
                pull_request_number: number,
                token,
            };
            Ok(ready(host_name, host, target_branch, number, working_directory))
        }
        _ => Ok(Detection::skipped(host_name, true, false)),
    }
}

fn detect_github_actions<F>(var: &F) -> Result<Detection, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let event = var("GITHUB_EVENT_NAME").unwrap_or_default();
    if event != "pull_request" && event != "pull_request_target" {
        return Ok(Detection::skipped(GITHUB_HOST, false, true));
    }

    debug!(event = event.as_str(), "Detected GitHub Actions");
    let git_ref = required(var, "GITHUB_REF")?;
    let number = git_ref
        .strip_prefix("refs/pull/")
        .and_then(|r| r.split('/').next())
        .ok_or_else(|| {
            CliError::ConfigError(format!(
                "GITHUB_REF '{}' does not reference a pull request.",
                git_ref
            ))
        })
        .and_then(|n| parse_number("GITHUB_REF", n))?;

    let target_branch = required(var, "GITHUB_BASE_REF")?;
    let (owner, repository) = split_repository(&required(var, "GITHUB_REPOSITORY")?)?;
    let working_directory = var("GITHUB_WORKSPACE").unwrap_or_else(|| ".".to_string());

    let Some(token) = var(ACCESS_TOKEN_VARIABLE).or_else(|| var("GITHUB_TOKEN")) else {
        return Ok(Detection::skipped(GITHUB_HOST, true, true));
    };

    let host = HostSettings::GitHub {
        owner,
        repository,
        pull_request_number: number,
        token,
    };
    Ok(ready(GITHUB_HOST, host, target_branch, number, working_directory))
}

fn ready(
    host_name: &str,
    host: HostSettings,
    target_branch: String,
    pull_request_id: u64,
    working_directory: String,
) -> Detection {
    Detection {
        run: RunEnvironment {
            is_pull_request: true,
            host_name: host_name.to_string(),
            is_supported_host: true,
            has_credential: true,
        },
        settings: Some(PullRequestSettings {
            host,
            target_branch,
            pull_request_id,
            working_directory,
        }),
    }
}

fn required<F>(var: &F, name: &str) -> Result<String, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    var(name).ok_or_else(|| {
        CliError::ConfigError(format!("The environment variable '{}' is not set.", name))
    })
}

fn parse_number(name: &str, value: &str) -> Result<u64, CliError> {
    value.trim().parse::<u64>().map_err(|_| {
        CliError::ConfigError(format!(
            "The environment variable '{}' is not a number: '{}'.",
            name, value
        ))
    })
}

fn split_repository(value: &str) -> Result<(String, String), CliError> {
    match value.split_once('/') {
        Some((owner, repository)) if !owner.is_empty() && !repository.is_empty() => {
            Ok((owner.to_string(), repository.to_string()))
        }
        _ => Err(CliError::ConfigError(format!(
            "The repository '{}' is not in the form 'owner/repository'.",
            value
        ))),
    }
}
