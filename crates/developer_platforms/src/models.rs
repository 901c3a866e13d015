//! # Models
//!
//! This module contains the data models exchanged between PR Metrics and the
//! source-control hosts.
//!
//! They are host agnostic: each host implementation maps its own API objects onto
//! these types, so the engine never sees GitHub or Azure Repos specific shapes.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// A single comment inside a comment thread.
///
/// # Examples
///
/// ```
/// use pr_metrics_developer_platforms::models::Comment;
///
/// let comment = Comment {
///     id: 1,
///     content: "❗ **This file doesn't require review.**".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// The identifier of the comment, unique within its thread
    pub id: u64,

    /// The markdown content of the comment
    pub content: String,
}

/// A read-only snapshot of one existing comment thread on a pull request.
///
/// Threads without a `file_path` are scoped to the whole pull request. Threads with a
/// `file_path` are attached to a file in the change set.
///
/// # Examples
///
/// ```
/// use pr_metrics_developer_platforms::models::{Comment, CommentThread, CommentThreadStatus};
///
/// let thread = CommentThread {
///     id: 42,
///     comments: vec![Comment { id: 1, content: "Looks good".to_string() }],
///     file_path: Some("src/lib.rs".to_string()),
///     status: CommentThreadStatus::Active,
/// };
///
/// assert!(thread.is_file_scoped());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentThread {
    /// The identifier of the thread
    pub id: u64,

    /// The comments in the thread, in posting order
    pub comments: Vec<Comment>,

    /// The repository relative path of the file the thread is attached to, if any
    pub file_path: Option<String>,

    /// The current status of the thread
    pub status: CommentThreadStatus,
}

impl CommentThread {
    /// Returns the first comment of the thread, if the thread has any comments.
    pub fn first_comment(&self) -> Option<&Comment> {
        self.comments.first()
    }

    /// Returns `true` if the thread is attached to a file.
    pub fn is_file_scoped(&self) -> bool {
        self.file_path.is_some()
    }
}

/// The status of a comment thread.
///
/// Hosts with richer status models map onto these values; anything that is neither
/// clearly open nor clearly resolved maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentThreadStatus {
    /// The thread is open and awaits attention
    Active,

    /// The thread is resolved
    Closed,

    /// The host reported a status that does not map onto open or resolved
    Unknown,
}

impl CommentThreadStatus {
    /// Returns the name used by the Azure Repos REST API for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentThreadStatus::Active => "active",
            CommentThreadStatus::Closed => "closed",
            CommentThreadStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CommentThreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The location a file-scoped comment thread is attached to.
///
/// `line` is the first changed line on the destination side of the diff. It is only
/// required by hosts which anchor file comments to a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLocation {
    /// The repository relative path of the file
    pub path: String,

    /// The line to anchor the comment to, if known
    pub line: Option<u32>,
}

/// A key/value pair written to the pull request metadata.
///
/// # Examples
///
/// ```
/// use pr_metrics_developer_platforms::models::MetadataEntry;
///
/// let entry = MetadataEntry::new("Size", "M");
/// assert_eq!(entry.key, "Size");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// The metadata key, without any host specific prefix
    pub key: String,

    /// The metadata value
    pub value: String,
}

impl MetadataEntry {
    /// Creates a new metadata entry.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The title and description of a pull request.
///
/// # Examples
///
/// ```
/// use pr_metrics_developer_platforms::models::PullRequestDetails;
///
/// let details = PullRequestDetails {
///     title: "Add caching to the resolver".to_string(),
///     description: None,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestDetails {
    /// The title of the pull request
    pub title: String,

    /// The description of the pull request, if any
    pub description: Option<String>,
}
