use super::*;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| map.get(name).cloned()
}

const AZURE_REPOS: &[(&str, &str)] = &[
    ("TF_BUILD", "True"),
    ("BUILD_REPOSITORY_PROVIDER", "TfsGit"),
    ("SYSTEM_PULLREQUEST_PULLREQUESTID", "42"),
    ("SYSTEM_PULLREQUEST_TARGETBRANCH", "refs/heads/main"),
    ("SYSTEM_TEAMFOUNDATIONCOLLECTIONURI", "https://dev.azure.com/contoso/"),
    ("SYSTEM_TEAMPROJECT", "Project One"),
    ("BUILD_REPOSITORY_NAME", "repo"),
    ("BUILD_REPOSITORY_LOCALPATH", "/agent/s"),
    ("SYSTEM_ACCESSTOKEN", "secret"),
];

const GITHUB_ACTIONS: &[(&str, &str)] = &[
    ("GITHUB_ACTIONS", "true"),
    ("GITHUB_EVENT_NAME", "pull_request"),
    ("GITHUB_REF", "refs/pull/17/merge"),
    ("GITHUB_BASE_REF", "main"),
    ("GITHUB_REPOSITORY", "octocat/hello-world"),
    ("GITHUB_TOKEN", "token"),
];

fn without(pairs: &[(&'static str, &'static str)], name: &str) -> Vec<(&'static str, &'static str)> {
    pairs.iter().filter(|(k, _)| *k != name).copied().collect()
}

fn with(
    pairs: &[(&'static str, &'static str)],
    name: &'static str,
    value: &'static str,
) -> Vec<(&'static str, &'static str)> {
    let mut result = without(pairs, name);
    result.push((name, value));
    result
}

#[test]
fn test_detect_azure_repos_pull_request() {
    let detection = detect(lookup(AZURE_REPOS)).expect("Failed to detect environment");

    assert_eq!(
        detection.run,
        RunEnvironment {
            is_pull_request: true,
            host_name: "Azure Repos".to_string(),
            is_supported_host: true,
            has_credential: true,
        }
    );

    let settings = detection.settings.expect("Expected pull request settings");
    assert_eq!(settings.target_branch, "refs/heads/main");
    assert_eq!(settings.pull_request_id, 42);
    assert_eq!(settings.working_directory, "/agent/s");
    match settings.host {
        HostSettings::AzureRepos(config) => {
            assert_eq!(config.collection_uri, "https://dev.azure.com/contoso/");
            assert_eq!(config.project, "Project One");
            assert_eq!(config.repository, "repo");
            assert_eq!(config.pull_request_id, 42);
            assert_eq!(config.access_token, "secret");
        }
        other => panic!("Expected Azure Repos settings, got {:?}", other),
    }
}

#[test]
fn test_explicit_token_wins_over_pipeline_token() {
    let vars = with(AZURE_REPOS, "PR_METRICS_ACCESS_TOKEN", "explicit");

    let detection = detect(lookup(&vars)).unwrap();

    match detection.settings.map(|s| s.host) {
        Some(HostSettings::AzureRepos(config)) => assert_eq!(config.access_token, "explicit"),
        other => panic!("Expected Azure Repos settings, got {:?}", other),
    }
}

#[test]
fn test_azure_build_without_pull_request_is_skipped() {
    let vars = without(AZURE_REPOS, "SYSTEM_PULLREQUEST_PULLREQUESTID");

    let detection = detect(lookup(&vars)).unwrap();

    assert!(!detection.run.is_pull_request);
    assert!(detection.settings.is_none());
}

#[test]
fn test_azure_pull_request_without_token_has_no_credential() {
    let vars = without(AZURE_REPOS, "SYSTEM_ACCESSTOKEN");

    let detection = detect(lookup(&vars)).unwrap();

    assert!(detection.run.is_pull_request);
    assert!(detection.run.is_supported_host);
    assert!(!detection.run.has_credential);
    assert!(detection.settings.is_none());
}

#[test]
fn test_blank_token_counts_as_missing() {
    let vars = with(AZURE_REPOS, "SYSTEM_ACCESSTOKEN", "  ");

    let detection = detect(lookup(&vars)).unwrap();

    assert!(!detection.run.has_credential);
}

#[test]
fn test_unsupported_repository_provider() {
    let vars = with(AZURE_REPOS, "BUILD_REPOSITORY_PROVIDER", "Bitbucket");

    let detection = detect(lookup(&vars)).unwrap();

    assert!(detection.run.is_pull_request);
    assert!(!detection.run.is_supported_host);
    assert_eq!(detection.run.host_name, "Bitbucket");
}

#[test]
fn test_missing_azure_variable_is_a_configuration_error() {
    let vars = without(AZURE_REPOS, "SYSTEM_TEAMPROJECT");

    let result = detect(lookup(&vars));

    assert!(matches!(
        result,
        Err(CliError::ConfigError(ref m)) if m.contains("SYSTEM_TEAMPROJECT")
    ));
}

#[test]
fn test_non_numeric_pull_request_id() {
    let vars = with(AZURE_REPOS, "SYSTEM_PULLREQUEST_PULLREQUESTID", "abc");

    assert!(matches!(
        detect(lookup(&vars)),
        Err(CliError::ConfigError(_))
    ));
}

#[test]
fn test_github_repository_built_in_azure_pipelines() {
    let vars = [
        ("TF_BUILD", "True"),
        ("BUILD_REPOSITORY_PROVIDER", "GitHub"),
        ("SYSTEM_PULLREQUEST_PULLREQUESTID", "987654"),
        ("SYSTEM_PULLREQUEST_PULLREQUESTNUMBER", "12"),
        ("SYSTEM_PULLREQUEST_TARGETBRANCH", "main"),
        ("BUILD_REPOSITORY_NAME", "octocat/hello-world"),
        ("PR_METRICS_ACCESS_TOKEN", "token"),
    ];

    let detection = detect(lookup(&vars)).unwrap();

    assert_eq!(detection.run.host_name, "GitHub");
    let settings = detection.settings.expect("Expected pull request settings");
    assert_eq!(settings.pull_request_id, 12);
    assert_eq!(settings.working_directory, ".");
    match settings.host {
        HostSettings::GitHub {
            owner,
            repository,
            pull_request_number,
            token,
        } => {
            assert_eq!(owner, "octocat");
            assert_eq!(repository, "hello-world");
            assert_eq!(pull_request_number, 12);
            assert_eq!(token, "token");
        }
        other => panic!("Expected GitHub settings, got {:?}", other),
    }
}

#[test]
fn test_detect_github_actions_pull_request() {
    let detection = detect(lookup(GITHUB_ACTIONS)).unwrap();

    assert!(detection.run.is_pull_request);
    assert!(detection.run.has_credential);
    let settings = detection.settings.expect("Expected pull request settings");
    assert_eq!(settings.pull_request_id, 17);
    assert_eq!(settings.target_branch, "main");
    assert!(matches!(
        settings.host,
        HostSettings::GitHub { ref owner, pull_request_number: 17, .. } if owner == "octocat"
    ));
}

#[test]
fn test_github_push_event_is_not_a_pull_request() {
    let vars = with(GITHUB_ACTIONS, "GITHUB_EVENT_NAME", "push");

    let detection = detect(lookup(&vars)).unwrap();

    assert!(!detection.run.is_pull_request);
}

#[test]
fn test_github_ref_must_reference_pull_request() {
    let vars = with(GITHUB_ACTIONS, "GITHUB_REF", "refs/heads/main");

    assert!(matches!(
        detect(lookup(&vars)),
        Err(CliError::ConfigError(ref m)) if m.contains("refs/heads/main")
    ));
}

#[test]
fn test_github_repository_must_have_owner() {
    let vars = with(GITHUB_ACTIONS, "GITHUB_REPOSITORY", "hello-world");

    assert!(matches!(
        detect(lookup(&vars)),
        Err(CliError::ConfigError(_))
    ));
}

#[test]
fn test_no_ci_system() {
    let detection = detect(lookup(&[])).unwrap();

    assert!(!detection.run.is_pull_request);
    assert!(detection.settings.is_none());
}
