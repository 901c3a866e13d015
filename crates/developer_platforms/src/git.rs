//! Git porcelain access.
//!
//! Diffs are computed by the local `git` executable between the target branch and the
//! merge ref of the pull request, the way a pipeline checkout of a pull request sees
//! them.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, instrument};

use crate::{errors::Error, GitClient};

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;

/// A [`GitClient`] that runs `git diff` in a local checkout.
#[derive(Debug, Clone)]
pub struct GitCli {
    working_directory: PathBuf,
    target_branch: String,
    pull_request_id: u64,
}

impl GitCli {
    /// Creates a new client for the given checkout.
    ///
    /// # Arguments
    ///
    /// * `working_directory` - The root of the git checkout
    /// * `target_branch` - The branch the pull request merges into. A leading
    ///   `refs/heads/` is stripped.
    /// * `pull_request_id` - The pull request number, used to address the merge ref
    pub fn new(
        working_directory: impl Into<PathBuf>,
        target_branch: &str,
        pull_request_id: u64,
    ) -> Self {
        let target_branch = target_branch
            .strip_prefix("refs/heads/")
            .unwrap_or(target_branch)
            .to_string();

        Self {
            working_directory: working_directory.into(),
            target_branch,
            pull_request_id,
        }
    }

    /// Returns the revision range compared by the diff commands.
    ///
    /// # Examples
    ///
    /// ```
    /// use pr_metrics_developer_platforms::git::GitCli;
    ///
    /// let git = GitCli::new(".", "refs/heads/main", 12);
    /// assert_eq!(git.revision_range(), "origin/main...pull/12/merge");
    /// ```
    pub fn revision_range(&self) -> String {
        format!(
            "origin/{}...pull/{}/merge",
            self.target_branch, self.pull_request_id
        )
    }

    async fn invoke(&self, args: &[&str]) -> Result<String, Error> {
        let joined = args.join(" ");
        debug!(arguments = joined.as_str(), "Running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.working_directory)
            .output()
            .await
            .map_err(|e| {
                error!(arguments = joined.as_str(), error = e.to_string(), "Failed to start git");
                Error::GitCommandFailed(joined.clone(), e.to_string())
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                arguments = joined.as_str(),
                error = stderr.as_str(),
                "Git exited with a failure code"
            );
            return Err(Error::GitCommandFailed(joined, stderr));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::InvalidResponse(format!("git output was not UTF-8: {}", e)))
    }
}

#[async_trait]
impl GitClient for GitCli {
    #[instrument]
    async fn get_diff_summary(&self) -> Result<String, Error> {
        let range = self.revision_range();
        self.invoke(&["diff", "--numstat", "--ignore-all-space", &range])
            .await
    }

    #[instrument]
    async fn get_unified_diff(&self) -> Result<String, Error> {
        let range = self.revision_range();
        self.invoke(&["diff", "--unified=0", "--ignore-all-space", &range])
            .await
    }
}
