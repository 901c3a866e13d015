//! # PR Metrics Developer Platforms
//!
//! Access to the systems PR Metrics reads from and writes to: the pull request host
//! (comment threads, metadata, title and description) and the local git repository
//! (diff summaries and unified diffs).
//!
//! Every host implementation is bound to a single pull request when it is created,
//! so the trait methods take no repository or pull request identifiers.

use async_trait::async_trait;

pub mod azure;

pub mod errors;

pub mod git;

pub mod github;

pub mod models;
use errors::Error;
use models::{CommentThread, CommentThreadStatus, FileLocation, MetadataEntry, PullRequestDetails};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Trait for interacting with the host of a pull request (e.g. GitHub, Azure Repos).
///
/// Implementations translate these host agnostic operations onto the host's API.
/// Operations which a host has no concept of (for instance thread status on GitHub)
/// succeed without doing anything.
///
/// # Example Implementation
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use pr_metrics_developer_platforms::{PullRequestHost, errors::Error};
/// use pr_metrics_developer_platforms::models::{
///     CommentThread, CommentThreadStatus, FileLocation, MetadataEntry, PullRequestDetails,
/// };
///
/// #[derive(Debug)]
/// struct MyHost;
///
/// #[async_trait]
/// impl PullRequestHost for MyHost {
///     async fn get_title_and_description(&self) -> Result<PullRequestDetails, Error> {
///         // Implementation to fetch the pull request from the host
///         # unimplemented!()
///     }
///
///     // Implement other required methods...
///     # async fn set_title_and_description(&self, _: Option<&str>, _: Option<&str>) -> Result<(), Error> { unimplemented!() }
///     # async fn get_current_iteration(&self) -> Result<u64, Error> { unimplemented!() }
///     # async fn get_comment_threads(&self) -> Result<Vec<CommentThread>, Error> { unimplemented!() }
///     # async fn create_comment_thread(&self, _: &str, _: CommentThreadStatus, _: Option<&FileLocation>) -> Result<(), Error> { unimplemented!() }
///     # async fn create_comment(&self, _: &str, _: u64, _: u64) -> Result<(), Error> { unimplemented!() }
///     # async fn delete_comment(&self, _: u64, _: u64) -> Result<(), Error> { unimplemented!() }
///     # async fn set_comment_thread_status(&self, _: u64, _: CommentThreadStatus) -> Result<(), Error> { unimplemented!() }
///     # async fn add_metadata(&self, _: &[MetadataEntry]) -> Result<(), Error> { unimplemented!() }
/// }
/// ```
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// Retrieves the title and description of the pull request.
    async fn get_title_and_description(&self) -> Result<PullRequestDetails, Error>;

    /// Updates the title and/or description of the pull request.
    ///
    /// # Arguments
    ///
    /// * `title` - The new title, or `None` to leave the title unchanged
    /// * `description` - The new description, or `None` to leave it unchanged
    async fn set_title_and_description(
        &self,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), Error>;

    /// Retrieves the current iteration (revision counter) of the pull request.
    async fn get_current_iteration(&self) -> Result<u64, Error>;

    /// Retrieves all comment threads on the pull request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] when a fetched thread or comment lacks a field
    /// that is required to build a [`CommentThread`].
    async fn get_comment_threads(&self) -> Result<Vec<CommentThread>, Error>;

    /// Creates a new comment thread.
    ///
    /// # Arguments
    ///
    /// * `content` - The markdown content of the first comment
    /// * `status` - The status of the new thread
    /// * `file` - The file to attach the thread to, or `None` for a pull request
    ///   scoped thread
    async fn create_comment_thread(
        &self,
        content: &str,
        status: CommentThreadStatus,
        file: Option<&FileLocation>,
    ) -> Result<(), Error>;

    /// Adds a comment to an existing thread, in reply to `parent_comment_id`.
    ///
    /// Hosts whose pull request scoped comments cannot be replied to replace the
    /// content of the parent comment instead.
    async fn create_comment(
        &self,
        content: &str,
        thread_id: u64,
        parent_comment_id: u64,
    ) -> Result<(), Error>;

    /// Deletes a comment from a thread.
    async fn delete_comment(&self, thread_id: u64, comment_id: u64) -> Result<(), Error>;

    /// Changes the status of a thread.
    async fn set_comment_thread_status(
        &self,
        thread_id: u64,
        status: CommentThreadStatus,
    ) -> Result<(), Error>;

    /// Writes the given key/value pairs to the pull request metadata in a single call.
    async fn add_metadata(&self, metadata: &[MetadataEntry]) -> Result<(), Error>;

    /// Returns `true` if file-scoped threads must be anchored to a line of the diff.
    ///
    /// Callers must fall back to a pull request scoped thread when no line is known.
    fn requires_line_anchor(&self) -> bool {
        false
    }
}

/// Trait for reading diffs from the version-control layer.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Returns the `numstat` style diff summary: one `<added>\t<deleted>\t<path>` line
    /// per changed file.
    async fn get_diff_summary(&self) -> Result<String, Error>;

    /// Returns the unified diff of all changed files, each block starting with a
    /// `diff --git` header.
    async fn get_unified_diff(&self) -> Result<String, Error>;
}
