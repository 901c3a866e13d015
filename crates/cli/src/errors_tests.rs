use super::*;

#[test]
fn test_config_error_display() {
    let err = CliError::ConfigError("bad config".to_string());
    assert_eq!(format!("{}", err), "Configuration error: bad config");
}

#[test]
fn test_auth_error_display() {
    let err = CliError::AuthError("bad auth".to_string());
    assert_eq!(format!("{}", err), "Authentication error: bad auth");
}

#[test]
fn test_run_failed_display_is_the_run_error() {
    let err: CliError = PrMetricsError::EmptyDiffSummary.into();
    assert_eq!(
        format!("{}", err),
        "The diff summary was empty. There are no changes to measure."
    );
}
