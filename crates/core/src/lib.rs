//! # PR Metrics Core
//!
//! Sizes a pull request from its changed lines and keeps the pull request's metrics
//! comment, per-file "no review required" notices, title prefix and metadata in sync
//! with that size across repeated runs.
//!
//! A run fetches the diff summary, classifies every file as product, test or ignored
//! code, computes a size category and then updates the pull request:
//!
//! - the title gets a size prefix such as `M✔ ◾ `
//! - one metrics comment per pull request, updated in place when the iteration changes
//! - a closed notice on each ignored file without added lines
//! - the metrics as pull request metadata
//!
//! All state is re-derived from the pull request on every run, so running twice
//! against an unchanged pull request changes nothing.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pr_metrics_core::{PrMetrics, RunEnvironment, config::Inputs};
//! use pr_metrics_core::localization::ResourceLocalizer;
//! use pr_metrics_developer_platforms::{GitClient, PullRequestHost};
//!
//! async fn update<H: PullRequestHost, G: GitClient>(host: H, git: G) {
//!     let metrics = PrMetrics::new(host, git, ResourceLocalizer::english(), Inputs::default());
//!     let environment = RunEnvironment {
//!         is_pull_request: true,
//!         host_name: "GitHub".to_string(),
//!         is_supported_host: true,
//!         has_credential: true,
//!     };
//!
//!     match metrics.run(&environment).await {
//!         Ok(status) => println!("{}", status.message()),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```

use futures::future::join_all;
use pr_metrics_developer_platforms::models::{CommentThreadStatus, FileLocation};
use pr_metrics_developer_platforms::{GitClient, PullRequestHost};
use tracing::{debug, error, info, instrument, warn};

pub mod classifier;
use classifier::{ClassifiedDiff, DiffSummaryClassifier};

pub mod comments;
use comments::{
    metadata_entries, metrics_comment_content, metrics_status, CommentOperation,
    CommentReconciler, DesiredMetrics, MetricsCommentHeader,
};

pub mod config;
use config::Inputs;

pub mod diff;
use diff::LazyDiffLineIndex;

pub mod errors;
use errors::PrMetricsError;

pub mod localization;
use localization::Localizer;

pub mod metrics;

pub mod size;
use size::{SizeAssessment, SizeCalculator};

pub mod title;
use title::plan_title_update;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Facts about the invocation that decide whether a run should happen at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEnvironment {
    /// Whether the run was triggered for a pull request
    pub is_pull_request: bool,

    /// The name of the pull request host, used in messages
    pub host_name: String,

    /// Whether the pull request host is one PR Metrics can update
    pub is_supported_host: bool,

    /// Whether a credential for the host is available
    pub has_credential: bool,
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The pull request was updated.
    Succeeded(String),

    /// There was nothing to do, for example because the run is not for a pull request.
    Skipped(String),

    /// The run could not start because something it needs is missing.
    Stopped(String),
}

impl RunStatus {
    /// The human-readable message describing the outcome.
    pub fn message(&self) -> &str {
        match self {
            RunStatus::Succeeded(m) | RunStatus::Skipped(m) | RunStatus::Stopped(m) => m,
        }
    }
}

/// Checks whether a run should be skipped or stopped before any work is done.
///
/// Returns `None` when the run should proceed.
pub fn precheck(environment: &RunEnvironment, localizer: &dyn Localizer) -> Option<RunStatus> {
    if !environment.is_pull_request {
        return Some(RunStatus::Skipped(
            localizer.localize("status.skip_not_pull_request", &[]),
        ));
    }

    if !environment.is_supported_host {
        return Some(RunStatus::Skipped(localizer.localize(
            "status.skip_unsupported_host",
            &[&environment.host_name],
        )));
    }

    if !environment.has_credential {
        return Some(RunStatus::Stopped(
            localizer.localize("status.stop_no_credential", &[]),
        ));
    }

    None
}

/// Runs PR Metrics against one pull request.
///
/// Every collaborator is passed in explicitly; a `PrMetrics` value is meant to be
/// created for a single run.
pub struct PrMetrics<H: PullRequestHost, G: GitClient, L: Localizer> {
    host: H,
    git: G,
    localizer: L,
    inputs: Inputs,
}

impl<H: PullRequestHost, G: GitClient, L: Localizer> PrMetrics<H, G, L> {
    pub fn new(host: H, git: G, localizer: L, inputs: Inputs) -> Self {
        Self {
            host,
            git,
            localizer,
            inputs,
        }
    }

    /// Sizes the pull request and brings its title, comments and metadata up to date.
    ///
    /// # Returns
    ///
    /// * `Ok(RunStatus::Skipped | RunStatus::Stopped)` if a precheck ended the run
    ///   before anything was fetched
    /// * `Ok(RunStatus::Succeeded)` once every update has been applied
    ///
    /// # Errors
    ///
    /// Configuration, diff and host errors are returned as they occur. When several
    /// pull request updates are applied concurrently, all of them are attempted and
    /// [`PrMetricsError::OperationsFailed`] reports the failures.
    #[instrument(skip(self, environment), fields(host = environment.host_name.as_str()))]
    pub async fn run(&self, environment: &RunEnvironment) -> Result<RunStatus, PrMetricsError> {
        if let Some(status) = precheck(environment, &self.localizer) {
            info!(status = ?status, "Not running PR Metrics");
            return Ok(status);
        }

        let summary = self.git.get_diff_summary().await?;
        if summary.trim().is_empty() {
            return Err(PrMetricsError::EmptyDiffSummary);
        }

        let classifier = DiffSummaryClassifier::new(&self.inputs)?;
        let classified = classifier.classify(&summary)?;

        let calculator = SizeCalculator::from_inputs(&self.inputs)?;
        let assessment = calculator.assess(&classified.metrics);
        info!(
            size = %assessment.size,
            product_code = classified.metrics.product_code(),
            test_code = classified.metrics.test_code(),
            ignored_code = classified.metrics.ignored_code(),
            "Sized pull request"
        );

        let (title_result, comments_result) = tokio::join!(
            self.update_title(&assessment),
            self.update_comments(&classified, &assessment)
        );
        title_result?;
        comments_result?;

        Ok(RunStatus::Succeeded(
            self.localizer.localize("status.success", &[]),
        ))
    }

    #[instrument(skip_all)]
    async fn update_title(&self, assessment: &SizeAssessment) -> Result<(), PrMetricsError> {
        let details = self.host.get_title_and_description().await?;
        let update = plan_title_update(
            &self.localizer,
            &details.title,
            details.description.as_deref(),
            assessment,
        );

        if update.is_empty() {
            debug!("Title and description are up to date");
            return Ok(());
        }

        self.host
            .set_title_and_description(update.title.as_deref(), update.description.as_deref())
            .await?;
        info!(
            title_updated = update.title.is_some(),
            description_updated = update.description.is_some(),
            "Updated the pull request title and description"
        );

        Ok(())
    }

    #[instrument(skip_all)]
    async fn update_comments(
        &self,
        classified: &ClassifiedDiff,
        assessment: &SizeAssessment,
    ) -> Result<(), PrMetricsError> {
        let (iteration, threads) = tokio::try_join!(
            self.host.get_current_iteration(),
            self.host.get_comment_threads()
        )?;
        debug!(iteration, threads = threads.len(), "Fetched comment threads");

        let header = MetricsCommentHeader::new(&self.localizer, iteration)?;
        let reconciler = CommentReconciler::new(&self.localizer);
        let state = reconciler.scan(&threads, &header, &classified.ignored_without_lines_added);

        let desired = DesiredMetrics {
            content: metrics_comment_content(
                &self.localizer,
                &header,
                self.inputs.base_size,
                assessment,
                &classified.metrics,
            ),
            status: metrics_status(assessment),
            metadata: metadata_entries(assessment, &classified.metrics),
        };
        let operations = reconciler.decide(&state, &desired);
        if operations.is_empty() {
            info!("Comments are up to date");
            return Ok(());
        }

        let line_index = LazyDiffLineIndex::new(&self.git);
        let results = join_all(
            operations
                .iter()
                .map(|operation| self.apply(operation, &reconciler, &line_index)),
        )
        .await;

        let total = results.len();
        let failures: Vec<PrMetricsError> = operations
            .iter()
            .zip(results)
            .filter_map(|(operation, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    error!(operation = operation.name(), error = %e, "Pull request update failed");
                    Some(e)
                }
            })
            .collect();

        match failures.first() {
            None => {
                info!(operations = total, "Applied comment updates");
                Ok(())
            }
            Some(first) => Err(PrMetricsError::OperationsFailed {
                failed: failures.len(),
                total,
                first: first.to_string(),
            }),
        }
    }

    async fn apply(
        &self,
        operation: &CommentOperation,
        reconciler: &CommentReconciler,
        line_index: &LazyDiffLineIndex<'_, G>,
    ) -> Result<(), PrMetricsError> {
        match operation {
            CommentOperation::CreateMetricsThread { content, status } => {
                self.host
                    .create_comment_thread(content, *status, None)
                    .await?;
            }
            CommentOperation::UpdateMetricsThread {
                thread_id,
                parent_comment_id,
                content,
                status,
            } => {
                self.host
                    .create_comment(content, *thread_id, *parent_comment_id)
                    .await?;
                self.host
                    .set_comment_thread_status(*thread_id, *status)
                    .await?;
            }
            CommentOperation::SetMetricsThreadStatus { thread_id, status } => {
                self.host
                    .set_comment_thread_status(*thread_id, *status)
                    .await?;
            }
            CommentOperation::RecordMetadata(entries) => {
                self.host.add_metadata(entries).await?;
            }
            CommentOperation::CreateNoReviewNotice { file_path } => {
                self.create_notice(file_path, reconciler, line_index).await?;
            }
            CommentOperation::DeleteStaleNotice {
                thread_id,
                comment_id,
                file_path,
            } => {
                debug!(path = file_path.as_str(), "Removing stale notice");
                self.host.delete_comment(*thread_id, *comment_id).await?;
            }
        }

        Ok(())
    }

    async fn create_notice(
        &self,
        file_path: &str,
        reconciler: &CommentReconciler,
        line_index: &LazyDiffLineIndex<'_, G>,
    ) -> Result<(), PrMetricsError> {
        let line = if self.host.requires_line_anchor() {
            match line_index.line_for(file_path).await? {
                Some(line) => Some(line),
                None => {
                    warn!(
                        path = file_path,
                        "No changed line to anchor the notice to; posting it on the pull request"
                    );
                    self.host
                        .create_comment_thread(
                            &reconciler.unanchored_notice(file_path),
                            CommentThreadStatus::Closed,
                            None,
                        )
                        .await?;
                    return Ok(());
                }
            }
        } else {
            None
        };

        let location = FileLocation {
            path: file_path.to_string(),
            line,
        };
        self.host
            .create_comment_thread(
                reconciler.notice(),
                CommentThreadStatus::Closed,
                Some(&location),
            )
            .await?;

        Ok(())
    }
}
