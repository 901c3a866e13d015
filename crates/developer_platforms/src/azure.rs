//! Azure Repos host.
//!
//! Talks to the Azure DevOps Git REST API (`api-version=7.1`):
//! - `GET/PATCH .../pullRequests/{id}` for the title and description
//! - `GET .../pullRequests/{id}/iterations` for the current iteration
//! - `GET/POST/PATCH .../pullRequests/{id}/threads` for comment threads
//! - `PATCH .../pullRequests/{id}/properties` for metadata (JSON Patch)

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::{
    errors::Error,
    models::{
        Comment, CommentThread, CommentThreadStatus, FileLocation, MetadataEntry,
        PullRequestDetails,
    },
    PullRequestHost,
};

#[cfg(test)]
#[path = "azure_tests.rs"]
mod tests;

const API_VERSION: &str = "api-version=7.1";

/// Prefix applied to every metadata key written to the pull request properties.
pub const METADATA_KEY_PREFIX: &str = "/PRMetrics.";

/// Connection settings for an Azure Repos pull request.
#[derive(Clone)]
pub struct AzureReposConfig {
    /// The collection URI, e.g. `https://dev.azure.com/contoso/`
    pub collection_uri: String,

    /// The project name or id
    pub project: String,

    /// The repository name or id
    pub repository: String,

    /// The pull request id
    pub pull_request_id: u64,

    /// A personal access token or pipeline access token
    pub access_token: String,
}

impl std::fmt::Debug for AzureReposConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureReposConfig")
            .field("collection_uri", &self.collection_uri)
            .field("project", &self.project)
            .field("repository", &self.repository)
            .field("pull_request_id", &self.pull_request_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IterationResponse {
    id: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadResponse {
    id: Option<u64>,
    #[serde(default)]
    comments: Vec<CommentResponse>,
    thread_context: Option<ThreadContextResponse>,
    status: Option<String>,
    #[serde(default)]
    is_deleted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadContextResponse {
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentResponse {
    id: Option<u64>,
    content: Option<String>,
    #[serde(default)]
    is_deleted: bool,
}

fn parse_status(status: Option<&str>) -> CommentThreadStatus {
    match status {
        Some("active") | Some("pending") => CommentThreadStatus::Active,
        Some("closed") | Some("fixed") | Some("wontFix") | Some("byDesign") => {
            CommentThreadStatus::Closed
        }
        _ => CommentThreadStatus::Unknown,
    }
}

fn convert_thread(thread: ThreadResponse) -> Result<CommentThread, Error> {
    const CONTEXT: &str = "AzureReposHost::get_comment_threads";

    let id = thread.id.ok_or_else(|| Error::missing_field("id", CONTEXT))?;
    let file_path = match thread.thread_context {
        Some(context) => {
            let path = context
                .file_path
                .ok_or_else(|| Error::missing_field("threadContext.filePath", CONTEXT))?;
            Some(path.trim_start_matches('/').to_string())
        }
        None => None,
    };

    let mut comments = Vec::with_capacity(thread.comments.len());
    for comment in thread.comments.into_iter().filter(|c| !c.is_deleted) {
        comments.push(Comment {
            id: comment
                .id
                .ok_or_else(|| Error::missing_field("comments.id", CONTEXT))?,
            content: comment
                .content
                .ok_or_else(|| Error::missing_field("comments.content", CONTEXT))?,
        });
    }

    Ok(CommentThread {
        id,
        comments,
        file_path,
        status: parse_status(thread.status.as_deref()),
    })
}

/// A [`PullRequestHost`] backed by the Azure Repos REST API.
#[derive(Debug)]
pub struct AzureReposHost {
    http: reqwest::Client,
    headers: HeaderMap,
    pull_request_url: String,
}

impl AzureReposHost {
    /// Creates a host bound to the pull request described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthError`] if the access token cannot be used as a header
    /// value, or [`Error::ApiError`] if the HTTP client cannot be built.
    pub fn new(config: &AzureReposConfig) -> Result<Self, Error> {
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!(":{}", config.access_token));
        let mut authorization = HeaderValue::from_str(&format!("Basic {}", credentials))
            .map_err(|_| Error::AuthError("The access token is not a valid header".to_string()))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let http = reqwest::Client::builder()
            .user_agent(concat!("pr-metrics/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::ApiError(format!("Failed to build the HTTP client: {}", e)))?;

        let pull_request_url = format!(
            "{}/{}/_apis/git/repositories/{}/pullRequests/{}",
            config.collection_uri.trim_end_matches('/'),
            urlencoding::encode(&config.project),
            urlencoding::encode(&config.repository),
            config.pull_request_id
        );

        Ok(Self {
            http,
            headers,
            pull_request_url,
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}{}?{}", self.pull_request_url, suffix, API_VERSION)
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response, Error> {
        let response = request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| {
                error!(operation, error = e.to_string(), "Request to Azure Repos failed");
                Error::ApiError(format!("{}: {}", operation, e))
            })?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!(operation, status = response.status().as_u16(), "Access denied");
                Err(Error::AuthError(format!(
                    "{} was rejected with status {}",
                    operation,
                    response.status()
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimitExceeded),
            status => {
                let body = response.text().await.unwrap_or_default();
                error!(
                    operation,
                    status = status.as_u16(),
                    body = body.as_str(),
                    "Azure Repos returned an error"
                );
                Err(Error::ApiError(format!("{} returned status {}", operation, status)))
            }
        }
    }

    async fn send_update(&self, request: RequestBuilder, operation: &str) -> Result<(), Error> {
        self.send(request, operation).await.map_err(|e| match e {
            Error::ApiError(message) => Error::FailedToUpdatePullRequest(message),
            other => other,
        })?;
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        suffix: &str,
        operation: &str,
    ) -> Result<T, Error> {
        let response = self.send(self.http.get(self.url(suffix)), operation).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| Error::InvalidResponse(format!("{}: {}", operation, e)))
    }
}

#[async_trait]
impl PullRequestHost for AzureReposHost {
    #[instrument]
    async fn get_title_and_description(&self) -> Result<PullRequestDetails, Error> {
        let pr: PullRequestResponse = self.get_json("", "Get pull request").await?;
        let title = pr.title.ok_or_else(|| {
            Error::missing_field("title", "AzureReposHost::get_title_and_description")
        })?;

        Ok(PullRequestDetails {
            title,
            description: pr.description,
        })
    }

    #[instrument]
    async fn set_title_and_description(
        &self,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), Error> {
        let mut body = serde_json::Map::new();
        if let Some(title) = title {
            body.insert("title".to_string(), json!(title));
        }

        if let Some(description) = description {
            body.insert("description".to_string(), json!(description));
        }

        if body.is_empty() {
            return Ok(());
        }

        let request = self.http.patch(self.url("")).json(&body);
        self.send_update(request, "Update pull request").await?;
        info!("Updated the pull request title and description");
        Ok(())
    }

    #[instrument]
    async fn get_current_iteration(&self) -> Result<u64, Error> {
        let iterations: ListResponse<IterationResponse> =
            self.get_json("/iterations", "List iterations").await?;

        let mut current = None;
        for iteration in iterations.value {
            let id = iteration.id.ok_or_else(|| {
                Error::missing_field("id", "AzureReposHost::get_current_iteration")
            })?;
            current = current.max(Some(id));
        }

        current.ok_or_else(|| {
            Error::InvalidResponse("The pull request has no iterations".to_string())
        })
    }

    #[instrument]
    async fn get_comment_threads(&self) -> Result<Vec<CommentThread>, Error> {
        let threads: ListResponse<ThreadResponse> =
            self.get_json("/threads", "List threads").await?;

        let result = threads
            .value
            .into_iter()
            .filter(|t| !t.is_deleted)
            .map(convert_thread)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = result.len(), "Fetched comment threads");
        Ok(result)
    }

    #[instrument(skip(content))]
    async fn create_comment_thread(
        &self,
        content: &str,
        status: CommentThreadStatus,
        file: Option<&FileLocation>,
    ) -> Result<(), Error> {
        let mut payload = json!({
            "comments": [{ "parentCommentId": 0, "content": content, "commentType": 1 }],
            "status": status.as_str(),
        });

        if let Some(file) = file {
            let mut context = json!({ "filePath": format!("/{}", file.path) });
            if let Some(line) = file.line {
                context["rightFileStart"] = json!({ "line": line, "offset": 1 });
                context["rightFileEnd"] = json!({ "line": line, "offset": 1 });
            }

            payload["threadContext"] = context;
        }

        let request = self.http.post(self.url("/threads")).json(&payload);
        self.send_update(request, "Create thread").await
    }

    #[instrument(skip(content))]
    async fn create_comment(
        &self,
        content: &str,
        thread_id: u64,
        parent_comment_id: u64,
    ) -> Result<(), Error> {
        let payload = json!({
            "parentCommentId": parent_comment_id,
            "content": content,
            "commentType": 1,
        });

        let request = self
            .http
            .post(self.url(&format!("/threads/{}/comments", thread_id)))
            .json(&payload);
        self.send_update(request, "Create comment").await
    }

    #[instrument]
    async fn delete_comment(&self, thread_id: u64, comment_id: u64) -> Result<(), Error> {
        let request = self.http.delete(self.url(&format!(
            "/threads/{}/comments/{}",
            thread_id, comment_id
        )));
        self.send_update(request, "Delete comment").await
    }

    #[instrument]
    async fn set_comment_thread_status(
        &self,
        thread_id: u64,
        status: CommentThreadStatus,
    ) -> Result<(), Error> {
        let request = self
            .http
            .patch(self.url(&format!("/threads/{}", thread_id)))
            .json(&json!({ "status": status.as_str() }));
        self.send_update(request, "Update thread status").await
    }

    #[instrument]
    async fn add_metadata(&self, metadata: &[MetadataEntry]) -> Result<(), Error> {
        if metadata.is_empty() {
            return Ok(());
        }

        let operations: Vec<_> = metadata
            .iter()
            .map(|entry| {
                json!({
                    "op": "replace",
                    "path": format!("{}{}", METADATA_KEY_PREFIX, entry.key),
                    "value": entry.value,
                })
            })
            .collect();
        let body = serde_json::to_vec(&operations)
            .map_err(|e| Error::InvalidResponse(format!("Failed to encode metadata: {}", e)))?;

        let request = self
            .http
            .patch(self.url("/properties"))
            .header(CONTENT_TYPE, "application/json-patch+json")
            .body(body);
        self.send_update(request, "Add metadata").await
    }
}
