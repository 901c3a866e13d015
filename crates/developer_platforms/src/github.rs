use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    errors::Error,
    models::{
        Comment, CommentThread, CommentThreadStatus, FileLocation, MetadataEntry,
        PullRequestDetails,
    },
    PullRequestHost,
};

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;

const REVIEW_COMMENTS_PAGE_SIZE: usize = 100;

/// Creates an `Octocrab` client authenticated with a personal access token.
///
/// # Errors
///
/// Returns [`Error::AuthError`] if the client cannot be built.
#[instrument(skip(token))]
pub fn create_token_client(token: &str) -> Result<Octocrab, Error> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .map_err(|e| Error::AuthError(format!("Failed to create the GitHub client: {}", e)))
}

fn log_octocrab_error(message: &str, e: octocrab::Error) -> String {
    let description = match &e {
        octocrab::Error::GitHub { source, .. } => source.message.clone(),
        _ => e.to_string(),
    };

    match e {
        octocrab::Error::GitHub { .. } => error!(
            error_message = description.as_str(),
            "{}. Received an error from GitHub", message
        ),
        octocrab::Error::UriParse { .. } | octocrab::Error::Uri { .. } => error!(
            error_message = description.as_str(),
            "{}. Failed to parse URI.", message
        ),
        _ => error!(error_message = description.as_str(), message),
    };

    description
}

/// A review comment as returned by the pull request review comments endpoint.
#[derive(Debug, Deserialize)]
struct ReviewComment {
    id: u64,
    body: Option<String>,
    path: Option<String>,
    in_reply_to_id: Option<u64>,
}

/// Groups review comments into threads keyed by the id of the root comment.
///
/// Replies whose root comment is not part of the list are dropped.
fn group_review_comments(comments: Vec<ReviewComment>) -> Result<Vec<CommentThread>, Error> {
    const CONTEXT: &str = "GitHubHost::get_comment_threads";

    let mut threads: BTreeMap<u64, CommentThread> = BTreeMap::new();
    let mut replies = Vec::new();
    for comment in comments {
        let content = comment
            .body
            .ok_or_else(|| Error::missing_field("body", CONTEXT))?;
        match comment.in_reply_to_id {
            Some(root) => replies.push((root, Comment {
                id: comment.id,
                content,
            })),
            None => {
                let path = comment
                    .path
                    .ok_or_else(|| Error::missing_field("path", CONTEXT))?;
                threads.insert(
                    comment.id,
                    CommentThread {
                        id: comment.id,
                        comments: vec![Comment {
                            id: comment.id,
                            content,
                        }],
                        file_path: Some(path),
                        status: CommentThreadStatus::Unknown,
                    },
                );
            }
        }
    }

    for (root, reply) in replies {
        match threads.get_mut(&root) {
            Some(thread) => thread.comments.push(reply),
            None => debug!(comment = reply.id, root, "Dropping reply without a root comment"),
        }
    }

    Ok(threads.into_values().collect())
}

/// A [`PullRequestHost`] backed by the GitHub REST API.
///
/// Issue comments are pull request scoped threads holding a single comment. Review
/// comments are file-scoped and are grouped into threads by their reply chain.
/// GitHub has no thread status or pull request metadata, so those operations are
/// no-ops.
#[derive(Debug)]
pub struct GitHubHost {
    client: Octocrab,
    owner: String,
    repo: String,
    pull_request_number: u64,
    head_sha: OnceCell<String>,
    review_comment_ids: Mutex<HashSet<u64>>,
}

impl GitHubHost {
    /// Creates a host bound to the given pull request.
    pub fn new(client: Octocrab, owner: &str, repo: &str, pull_request_number: u64) -> Self {
        Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
            pull_request_number,
            head_sha: OnceCell::new(),
            review_comment_ids: Mutex::new(HashSet::new()),
        }
    }

    async fn get_pull_request(&self) -> Result<octocrab::models::pulls::PullRequest, Error> {
        self.client
            .pulls(&self.owner, &self.repo)
            .get(self.pull_request_number)
            .await
            .map_err(|e| {
                Error::InvalidResponse(log_octocrab_error(
                    "Failed to get pull request information",
                    e,
                ))
            })
    }

    async fn head_sha(&self) -> Result<&str, Error> {
        let sha = self
            .head_sha
            .get_or_try_init(|| async {
                let pr = self.get_pull_request().await?;
                Ok::<String, Error>(pr.head.sha)
            })
            .await?;

        Ok(sha.as_str())
    }

    async fn list_issue_comments(&self) -> Result<Vec<CommentThread>, Error> {
        let mut current_page = self
            .client
            .issues(&self.owner, &self.repo)
            .list_comments(self.pull_request_number)
            .send()
            .await
            .map_err(|e| {
                Error::InvalidResponse(log_octocrab_error(
                    "Failed to list comments for pull request",
                    e,
                ))
            })?;

        let mut comments = current_page.take_items();
        loop {
            let next_page = self
                .client
                .get_page(&current_page.next)
                .await
                .map_err(|e| {
                    Error::InvalidResponse(log_octocrab_error(
                        "Failed to get the next page of comments for pull request",
                        e,
                    ))
                })?;

            let Some(mut new_page) = next_page else {
                break;
            };
            comments.extend(new_page.take_items());

            current_page = new_page;
        }

        comments
            .into_iter()
            .map(|c| {
                let content = c.body.ok_or_else(|| {
                    Error::missing_field("body", "GitHubHost::get_comment_threads")
                })?;
                Ok(CommentThread {
                    id: c.id.0,
                    comments: vec![Comment { id: c.id.0, content }],
                    file_path: None,
                    status: CommentThreadStatus::Unknown,
                })
            })
            .collect()
    }

    async fn list_review_comments(&self) -> Result<Vec<ReviewComment>, Error> {
        let mut comments = Vec::new();
        let mut page = 1;
        loop {
            let route = format!(
                "/repos/{}/{}/pulls/{}/comments?per_page={}&page={}",
                self.owner, self.repo, self.pull_request_number, REVIEW_COMMENTS_PAGE_SIZE, page
            );
            let batch: Vec<ReviewComment> =
                self.client.get(route, None::<&()>).await.map_err(|e| {
                    Error::InvalidResponse(log_octocrab_error(
                        "Failed to list review comments for pull request",
                        e,
                    ))
                })?;

            let count = batch.len();
            comments.extend(batch);
            if count < REVIEW_COMMENTS_PAGE_SIZE {
                break;
            }

            page += 1;
        }

        Ok(comments)
    }

    fn is_review_comment(&self, comment_id: u64) -> bool {
        self.review_comment_ids
            .lock()
            .map(|ids| ids.contains(&comment_id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl PullRequestHost for GitHubHost {
    #[instrument]
    async fn get_title_and_description(&self) -> Result<PullRequestDetails, Error> {
        let pr = self.get_pull_request().await?;
        let title = pr
            .title
            .ok_or_else(|| Error::missing_field("title", "GitHubHost::get_title_and_description"))?;

        Ok(PullRequestDetails {
            title,
            description: pr.body,
        })
    }

    #[instrument]
    async fn set_title_and_description(
        &self,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), Error> {
        if title.is_none() && description.is_none() {
            return Ok(());
        }

        let pulls = self.client.pulls(&self.owner, &self.repo);
        let mut request = pulls.update(self.pull_request_number);
        if let Some(title) = title {
            request = request.title(title);
        }

        if let Some(description) = description {
            request = request.body(description);
        }

        request.send().await.map_err(|e| {
            log_octocrab_error("Failed to update the pull request title and description", e);
            Error::FailedToUpdatePullRequest("Failed to update title and description".to_string())
        })?;

        info!(
            repository_owner = self.owner.as_str(),
            repository = self.repo.as_str(),
            pull_request = self.pull_request_number,
            "Updated the pull request title and description"
        );
        Ok(())
    }

    #[instrument]
    async fn get_current_iteration(&self) -> Result<u64, Error> {
        let pr = self.get_pull_request().await?;
        pr.commits
            .ok_or_else(|| Error::missing_field("commits", "GitHubHost::get_current_iteration"))
    }

    #[instrument]
    async fn get_comment_threads(&self) -> Result<Vec<CommentThread>, Error> {
        let mut threads = self.list_issue_comments().await?;

        let review_comments = self.list_review_comments().await?;
        if let Ok(mut ids) = self.review_comment_ids.lock() {
            ids.extend(review_comments.iter().map(|c| c.id));
        }

        threads.extend(group_review_comments(review_comments)?);
        debug!(
            pull_request = self.pull_request_number,
            count = threads.len(),
            "Fetched comment threads"
        );
        Ok(threads)
    }

    #[instrument(skip(content))]
    async fn create_comment_thread(
        &self,
        content: &str,
        status: CommentThreadStatus,
        file: Option<&FileLocation>,
    ) -> Result<(), Error> {
        let Some(file) = file else {
            self.client
                .issues(&self.owner, &self.repo)
                .create_comment(self.pull_request_number, content)
                .await
                .map_err(|e| {
                    log_octocrab_error("Failed to add pull request comment", e);
                    Error::FailedToUpdatePullRequest("Failed to add comment".to_string())
                })?;
            return Ok(());
        };

        let line = file
            .line
            .ok_or_else(|| Error::missing_field("line", "GitHubHost::create_comment_thread"))?;
        let commit_id = self.head_sha().await?;
        let route = format!(
            "/repos/{}/{}/pulls/{}/comments",
            self.owner, self.repo, self.pull_request_number
        );
        let payload = json!({
            "body": content,
            "commit_id": commit_id,
            "path": file.path,
            "line": line,
            "side": "RIGHT",
        });

        let _: serde_json::Value = self.client.post(route, Some(&payload)).await.map_err(|e| {
            log_octocrab_error("Failed to add review comment", e);
            Error::FailedToUpdatePullRequest(format!("Failed to add comment to {}", file.path))
        })?;

        if status == CommentThreadStatus::Closed {
            debug!(file = file.path.as_str(), "GitHub review threads cannot be created resolved");
        }

        Ok(())
    }

    #[instrument(skip(content))]
    async fn create_comment(
        &self,
        content: &str,
        thread_id: u64,
        parent_comment_id: u64,
    ) -> Result<(), Error> {
        if self.is_review_comment(parent_comment_id) {
            let route = format!(
                "/repos/{}/{}/pulls/{}/comments/{}/replies",
                self.owner, self.repo, self.pull_request_number, parent_comment_id
            );
            let _: serde_json::Value = self
                .client
                .post(route, Some(&json!({ "body": content })))
                .await
                .map_err(|e| {
                    log_octocrab_error("Failed to reply to review comment", e);
                    Error::FailedToUpdatePullRequest("Failed to add comment".to_string())
                })?;
            return Ok(());
        }

        debug!(thread = thread_id, "Replacing the content of the issue comment");
        self.client
            .issues(&self.owner, &self.repo)
            .update_comment(parent_comment_id.into(), content)
            .await
            .map_err(|e| {
                log_octocrab_error("Failed to update pull request comment", e);
                Error::FailedToUpdatePullRequest("Failed to update comment".to_string())
            })?;
        Ok(())
    }

    #[instrument]
    async fn delete_comment(&self, thread_id: u64, comment_id: u64) -> Result<(), Error> {
        if !self.is_review_comment(comment_id) {
            return self
                .client
                .issues(&self.owner, &self.repo)
                .delete_comment(comment_id.into())
                .await
                .map_err(|e| {
                    warn!(
                        repository_owner = self.owner.as_str(),
                        repository = self.repo.as_str(),
                        comment = comment_id,
                        "Failed to delete pr comment",
                    );
                    Error::FailedToUpdatePullRequest(format!("Failed to delete comment: {}", e))
                });
        }

        let route = format!(
            "/repos/{}/{}/pulls/comments/{}",
            self.owner, self.repo, comment_id
        );
        let response = self
            .client
            ._delete(route, None::<&()>)
            .await
            .map_err(|e| {
                log_octocrab_error("Failed to delete review comment", e);
                Error::FailedToUpdatePullRequest("Failed to delete comment".to_string())
            })?;

        if !response.status().is_success() {
            warn!(
                thread = thread_id,
                comment = comment_id,
                status = response.status().as_u16(),
                "Failed to delete review comment"
            );
            return Err(Error::FailedToUpdatePullRequest(format!(
                "Failed to delete comment {}",
                comment_id
            )));
        }

        Ok(())
    }

    #[instrument]
    async fn set_comment_thread_status(
        &self,
        thread_id: u64,
        status: CommentThreadStatus,
    ) -> Result<(), Error> {
        debug!(
            thread = thread_id,
            status = status.as_str(),
            "GitHub does not support thread status; skipping"
        );
        Ok(())
    }

    #[instrument]
    async fn add_metadata(&self, metadata: &[MetadataEntry]) -> Result<(), Error> {
        debug!(
            count = metadata.len(),
            "GitHub does not support pull request metadata; skipping"
        );
        Ok(())
    }

    fn requires_line_anchor(&self) -> bool {
        true
    }
}
