//! # Comment Reconciliation
//!
//! Keeps one metrics comment and a set of per-file "no review required" notices in
//! sync with the current sizing of a pull request.
//!
//! Reconciliation has two phases:
//!
//! 1. [`CommentReconciler::scan`] folds over the existing comment threads, once and
//!    in order, to find the metrics comment and the notices that already exist.
//! 2. [`CommentReconciler::decide`] turns the resulting [`ReconciliationState`] into
//!    [`CommentOperation`]s. The operations are independent of each other and can be
//!    applied concurrently.
//!
//! Running both phases against an unchanged pull request yields no creations, which is
//! what makes repeated runs safe.

use std::collections::BTreeSet;

use pr_metrics_developer_platforms::models::{CommentThread, CommentThreadStatus, MetadataEntry};
use regex::Regex;
use tracing::{debug, instrument};

use crate::errors::PrMetricsError;
use crate::localization::Localizer;
use crate::metrics::CodeMetrics;
use crate::size::SizeAssessment;

#[cfg(test)]
#[path = "comments_tests.rs"]
mod tests;

/// Resource key of the metrics comment header. Takes the iteration as `{0}`.
pub const METRICS_COMMENT_TITLE_KEY: &str = "metrics.comment.title";

/// Resource key of the file scoped "no review required" notice.
pub const NOTICE_KEY: &str = "notice.file";

/// Resource key of the pull request scoped notice naming a file. Takes the path as `{0}`.
pub const UNANCHORED_NOTICE_KEY: &str = "notice.unanchored_file";

/// Recognises metrics comment headers, for the current iteration or any other.
#[derive(Debug, Clone)]
pub struct MetricsCommentHeader {
    current: String,
    pattern: Regex,
}

impl MetricsCommentHeader {
    /// Builds the header for `iteration` from the localized header template.
    ///
    /// The template's `{0}` placeholder becomes a wildcard in the pattern, so headers
    /// written for earlier iterations still match.
    pub fn new(localizer: &dyn Localizer, iteration: u64) -> Result<Self, PrMetricsError> {
        let template = localizer.template(METRICS_COMMENT_TITLE_KEY);
        let pattern = format!(
            "^{}",
            template
                .split("{0}")
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".+")
        );

        Ok(Self {
            current: localizer.localize(METRICS_COMMENT_TITLE_KEY, &[&iteration]),
            pattern: Regex::new(&pattern)?,
        })
    }

    /// The exact header for the current iteration.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Whether `content` starts with a metrics comment header of any iteration.
    pub fn is_metrics_comment(&self, content: &str) -> bool {
        self.pattern.is_match(content)
    }

    /// Whether `content` starts with the header of the current iteration.
    pub fn is_current(&self, content: &str) -> bool {
        content
            .strip_prefix(self.current.as_str())
            .map(|rest| rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n"))
            .unwrap_or(false)
    }
}

/// The existing metrics comment thread found during the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsThread {
    pub thread_id: u64,
    pub comment_id: u64,
    pub status: CommentThreadStatus,
}

/// A notice that no longer applies to its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleNotice {
    pub thread_id: u64,
    pub comment_id: u64,
    pub file_path: String,
}

/// What the scan found on the pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationState {
    /// A metrics comment with the current iteration's header exists.
    pub metrics_comment_present: bool,

    /// The metrics thread to update or check, preferring the current iteration's.
    pub metrics_thread: Option<MetricsThread>,

    /// Ignored files without added lines that do not carry a notice yet.
    pub files_needing_notice: BTreeSet<String>,

    /// Notices on files that are no longer ignored without added lines.
    pub files_with_stale_notice: Vec<StaleNotice>,
}

/// The metrics comment, status and metadata the pull request should end up with.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredMetrics {
    pub content: String,
    pub status: CommentThreadStatus,
    pub metadata: Vec<MetadataEntry>,
}

/// A change to apply to the pull request.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentOperation {
    /// Create a new pull request scoped metrics thread.
    CreateMetricsThread {
        content: String,
        status: CommentThreadStatus,
    },

    /// Post the current metrics into an existing metrics thread and set its status.
    UpdateMetricsThread {
        thread_id: u64,
        parent_comment_id: u64,
        content: String,
        status: CommentThreadStatus,
    },

    /// Only the status of the current metrics thread has drifted.
    SetMetricsThreadStatus {
        thread_id: u64,
        status: CommentThreadStatus,
    },

    /// Write the metrics to the pull request metadata in one batch.
    RecordMetadata(Vec<MetadataEntry>),

    /// Post a closed "no review required" notice on a file.
    CreateNoReviewNotice { file_path: String },

    /// Remove a notice from a file that now needs review.
    DeleteStaleNotice {
        thread_id: u64,
        comment_id: u64,
        file_path: String,
    },
}

impl CommentOperation {
    /// A short name used when logging the operation.
    pub fn name(&self) -> &'static str {
        match self {
            CommentOperation::CreateMetricsThread { .. } => "create_metrics_thread",
            CommentOperation::UpdateMetricsThread { .. } => "update_metrics_thread",
            CommentOperation::SetMetricsThreadStatus { .. } => "set_metrics_thread_status",
            CommentOperation::RecordMetadata(_) => "record_metadata",
            CommentOperation::CreateNoReviewNotice { .. } => "create_no_review_notice",
            CommentOperation::DeleteStaleNotice { .. } => "delete_stale_notice",
        }
    }
}

/// Scans comment threads and decides which changes to make.
#[derive(Debug, Clone)]
pub struct CommentReconciler {
    notice: String,
    unanchored_prefix: String,
    unanchored_suffix: String,
}

impl CommentReconciler {
    pub fn new(localizer: &dyn Localizer) -> Self {
        let unanchored = localizer.template(UNANCHORED_NOTICE_KEY);
        let (prefix, suffix) = unanchored
            .split_once("{0}")
            .map(|(p, s)| (p.to_string(), s.to_string()))
            .unwrap_or_else(|| (unanchored.clone(), String::new()));

        Self {
            notice: localizer.template(NOTICE_KEY),
            unanchored_prefix: prefix,
            unanchored_suffix: suffix,
        }
    }

    /// The notice posted on a file that needs no review.
    pub fn notice(&self) -> &str {
        &self.notice
    }

    /// The pull request scoped notice used when a file comment cannot be anchored.
    pub fn unanchored_notice(&self, file_path: &str) -> String {
        format!(
            "{}{}{}",
            self.unanchored_prefix, file_path, self.unanchored_suffix
        )
    }

    fn unanchored_notice_path<'c>(&self, content: &'c str) -> Option<&'c str> {
        content
            .strip_prefix(self.unanchored_prefix.as_str())?
            .strip_suffix(self.unanchored_suffix.as_str())
            .filter(|path| !path.is_empty())
    }

    /// Folds over `threads` to build the reconciliation state.
    ///
    /// # Arguments
    ///
    /// * `threads` - The comment threads currently on the pull request
    /// * `header` - The metrics comment header for the current iteration
    /// * `ignored_without_lines_added` - Files that should carry a notice
    #[instrument(skip_all, fields(threads = threads.len()))]
    pub fn scan(
        &self,
        threads: &[CommentThread],
        header: &MetricsCommentHeader,
        ignored_without_lines_added: &[String],
    ) -> ReconciliationState {
        let notice_candidates: BTreeSet<&str> = ignored_without_lines_added
            .iter()
            .map(String::as_str)
            .collect();

        let initial = ReconciliationState {
            files_needing_notice: ignored_without_lines_added.iter().cloned().collect(),
            ..Default::default()
        };

        let state = threads.iter().fold(initial, |mut state, thread| {
            let Some(first) = thread.first_comment() else {
                return state;
            };

            match &thread.file_path {
                None => {
                    if header.is_metrics_comment(&first.content) {
                        // Hosts that update by replying leave the current header on a later comment.
                        for comment in &thread.comments {
                            if !header.is_metrics_comment(&comment.content) {
                                continue;
                            }

                            let found = MetricsThread {
                                thread_id: thread.id,
                                comment_id: comment.id,
                                status: thread.status,
                            };

                            if header.is_current(&comment.content) {
                                state.metrics_comment_present = true;
                                state.metrics_thread = Some(found);
                            } else if !state.metrics_comment_present {
                                state.metrics_thread = Some(found);
                            }
                        }
                    } else if thread.comments.len() == 1 {
                        if let Some(path) = self.unanchored_notice_path(&first.content) {
                            self.record_notice(&mut state, &notice_candidates, thread, path);
                        }
                    }
                }
                Some(path) => {
                    if thread.comments.len() == 1 && first.content == self.notice {
                        self.record_notice(&mut state, &notice_candidates, thread, path);
                    }
                }
            }

            state
        });

        debug!(
            metrics_comment_present = state.metrics_comment_present,
            metrics_thread = ?state.metrics_thread.map(|t| t.thread_id),
            files_needing_notice = state.files_needing_notice.len(),
            stale_notices = state.files_with_stale_notice.len(),
            "Scanned comment threads"
        );
        state
    }

    fn record_notice(
        &self,
        state: &mut ReconciliationState,
        notice_candidates: &BTreeSet<&str>,
        thread: &CommentThread,
        path: &str,
    ) {
        if notice_candidates.contains(path) {
            state.files_needing_notice.remove(path);
        } else if let Some(comment) = thread.first_comment() {
            state.files_with_stale_notice.push(StaleNotice {
                thread_id: thread.id,
                comment_id: comment.id,
                file_path: path.to_string(),
            });
        }
    }

    /// Derives the operations needed to reach `desired` from `state`.
    pub fn decide(
        &self,
        state: &ReconciliationState,
        desired: &DesiredMetrics,
    ) -> Vec<CommentOperation> {
        let mut operations = Vec::new();

        if !state.metrics_comment_present {
            operations.push(match state.metrics_thread {
                Some(thread) => CommentOperation::UpdateMetricsThread {
                    thread_id: thread.thread_id,
                    parent_comment_id: thread.comment_id,
                    content: desired.content.clone(),
                    status: desired.status,
                },
                None => CommentOperation::CreateMetricsThread {
                    content: desired.content.clone(),
                    status: desired.status,
                },
            });
            operations.push(CommentOperation::RecordMetadata(desired.metadata.clone()));
        } else if let Some(thread) = state.metrics_thread {
            if thread.status != CommentThreadStatus::Unknown && thread.status != desired.status {
                operations.push(CommentOperation::SetMetricsThreadStatus {
                    thread_id: thread.thread_id,
                    status: desired.status,
                });
            }
        }

        operations.extend(state.files_needing_notice.iter().map(|path| {
            CommentOperation::CreateNoReviewNotice {
                file_path: path.clone(),
            }
        }));

        operations.extend(state.files_with_stale_notice.iter().map(|stale| {
            CommentOperation::DeleteStaleNotice {
                thread_id: stale.thread_id,
                comment_id: stale.comment_id,
                file_path: stale.file_path.clone(),
            }
        }));

        operations
    }
}

/// The status the metrics thread should have.
///
/// Small pull requests that are not known to be under-tested are closed; everything
/// else stays active.
pub fn metrics_status(assessment: &SizeAssessment) -> CommentThreadStatus {
    if assessment.is_small && assessment.is_sufficiently_tested != Some(false) {
        CommentThreadStatus::Closed
    } else {
        CommentThreadStatus::Active
    }
}

/// Builds the markdown body of the metrics comment.
pub fn metrics_comment_content(
    localizer: &dyn Localizer,
    header: &MetricsCommentHeader,
    base_size: u64,
    assessment: &SizeAssessment,
    metrics: &CodeMetrics,
) -> String {
    let mut lines = vec![header.current().to_string()];

    if assessment.is_small {
        lines.push(localizer.localize("metrics.comment.small", &[]));
    } else {
        lines.push(localizer.localize("metrics.comment.large", &[&base_size]));
    }

    match assessment.is_sufficiently_tested {
        Some(true) => lines.push(localizer.localize("metrics.comment.tests_sufficient", &[])),
        Some(false) => lines.push(localizer.localize("metrics.comment.tests_insufficient", &[])),
        None => {}
    }

    let label = |key: &str| localizer.localize(key, &[]);
    lines.push(format!("||{}", label("metrics.comment.lines")));
    lines.push("-|-:".to_string());
    lines.push(format!(
        "{}|{}",
        label("metrics.comment.product_code"),
        metrics.product_code()
    ));
    lines.push(format!(
        "{}|{}",
        label("metrics.comment.test_code"),
        metrics.test_code()
    ));
    lines.push(format!(
        "**{}**|**{}**",
        label("metrics.comment.subtotal"),
        metrics.subtotal()
    ));
    lines.push(format!(
        "{}|{}",
        label("metrics.comment.ignored_code"),
        metrics.ignored_code()
    ));
    lines.push(format!(
        "**{}**|**{}**",
        label("metrics.comment.total"),
        metrics.total()
    ));
    lines.push(String::new());
    lines.push(label("metrics.comment.footer"));

    lines.join("\n")
}

/// Builds the metadata entries written alongside the metrics comment.
pub fn metadata_entries(assessment: &SizeAssessment, metrics: &CodeMetrics) -> Vec<MetadataEntry> {
    let mut entries = vec![
        MetadataEntry::new("Size", assessment.size.to_string()),
        MetadataEntry::new("ProductCode", metrics.product_code().to_string()),
        MetadataEntry::new("TestCode", metrics.test_code().to_string()),
        MetadataEntry::new("Subtotal", metrics.subtotal().to_string()),
        MetadataEntry::new("IgnoredCode", metrics.ignored_code().to_string()),
        MetadataEntry::new("Total", metrics.total().to_string()),
    ];

    if let Some(tested) = assessment.is_sufficiently_tested {
        entries.push(MetadataEntry::new("TestCoverage", tested.to_string()));
    }

    entries
}
