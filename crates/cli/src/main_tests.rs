use super::*;

#[test]
fn test_exit_codes() {
    assert_eq!(exit_code(&RunStatus::Succeeded("done".to_string())), 0);
    assert_eq!(exit_code(&RunStatus::Skipped("skipped".to_string())), 0);
    assert_eq!(exit_code(&RunStatus::Stopped("stopped".to_string())), 3);
}

#[test]
fn test_cli_parses_inputs() {
    let cli = Cli::try_parse_from([
        "pr-metrics",
        "--verbose",
        "--config",
        "metrics.toml",
        "--base-size",
        "250",
        "--file-matching-patterns",
        "**/*\n!docs/**",
    ])
    .expect("Failed to parse arguments");

    assert!(cli.verbose);
    assert_eq!(cli.config.as_deref(), Some("metrics.toml"));
    assert_eq!(cli.inputs.base_size.as_deref(), Some("250"));
    assert_eq!(
        cli.inputs.file_matching_patterns.as_deref(),
        Some("**/*\n!docs/**")
    );
}

#[test]
fn test_cli_rejects_unknown_arguments() {
    assert!(Cli::try_parse_from(["pr-metrics", "--unknown"]).is_err());
}
