#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Error types for source-control host and git operations.
///
/// This enum represents all failures that can occur while talking to a pull request
/// host (GitHub, Azure Repos) or to the local git installation. Each variant carries
/// enough context to identify the call that failed.
///
/// # Examples
///
/// ```rust
/// use pr_metrics_developer_platforms::errors::Error;
///
/// let missing = Error::MissingField {
///     field: "content".to_string(),
///     context: "AzureReposHost::get_comment_threads".to_string(),
/// };
/// assert_eq!(
///     missing.to_string(),
///     "Field 'content' was missing in AzureReposHost::get_comment_threads"
/// );
///
/// let rate_limit = Error::RateLimitExceeded;
/// assert_eq!(rate_limit.to_string(), "Rate limit exceeded");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic API request failure.
    ///
    /// The string parameter describes the request that failed.
    #[error("API request failed: {0}")]
    ApiError(String),

    /// Authentication failed with the host.
    ///
    /// The provided credentials (personal access token, pipeline token) are invalid,
    /// expired, or insufficient for the requested operation.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Failed to update the pull request.
    ///
    /// Covers comment creation, thread status changes, metadata writes and title or
    /// description updates. The string parameter names the operation that failed.
    #[error("Failed to update the PR: {0}")]
    FailedToUpdatePullRequest(String),

    /// A git command could not be run or exited with a failure code.
    ///
    /// Parameters: the git arguments, and the captured standard error.
    #[error("Git command 'git {0}' failed: {1}")]
    GitCommandFailed(String, String),

    /// Invalid response format from the host API.
    ///
    /// The response could not be decoded into the expected shape.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// A required field on a fetched object was absent.
    ///
    /// The message names both the field and the method that needed it so that the
    /// failure can be diagnosed against the live API response shape.
    #[error("Field '{field}' was missing in {context}")]
    MissingField {
        /// The name of the absent field
        field: String,

        /// The method or context which required the field
        context: String,
    },

    /// Host rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl Error {
    /// Creates a [`Error::MissingField`] for the given field and calling context.
    pub fn missing_field(field: &str, context: &str) -> Self {
        Error::MissingField {
            field: field.to_string(),
            context: context.to_string(),
        }
    }
}
