use super::*;
use crate::localization::ResourceLocalizer;
use crate::size::SizeCategory;
use pr_metrics_developer_platforms::models::Comment;

fn thread(
    id: u64,
    file_path: Option<&str>,
    status: CommentThreadStatus,
    contents: &[&str],
) -> CommentThread {
    CommentThread {
        id,
        comments: contents
            .iter()
            .enumerate()
            .map(|(i, c)| Comment {
                id: id * 100 + i as u64 + 1,
                content: c.to_string(),
            })
            .collect(),
        file_path: file_path.map(|p| p.to_string()),
        status,
    }
}

fn desired(status: CommentThreadStatus) -> DesiredMetrics {
    DesiredMetrics {
        content: "# Metrics for iteration 3\nbody".to_string(),
        status,
        metadata: vec![MetadataEntry::new("Size", "M")],
    }
}

fn ignored(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

const NOTICE: &str = "❗ **This file doesn't require review.**";

#[test]
fn test_header_matches_any_iteration() {
    let localizer = ResourceLocalizer::english();
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();

    assert_eq!(header.current(), "# Metrics for iteration 3");
    assert!(header.is_metrics_comment("# Metrics for iteration 1\nbody"));
    assert!(header.is_metrics_comment("# Metrics for iteration 3"));
    assert!(!header.is_metrics_comment("# Metrics for iteration \nbody"));
    assert!(!header.is_metrics_comment("Some review comment"));
}

#[test]
fn test_header_current_requires_exact_line() {
    let localizer = ResourceLocalizer::english();
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();

    assert!(header.is_current("# Metrics for iteration 3"));
    assert!(header.is_current("# Metrics for iteration 3\nbody"));
    assert!(header.is_current("# Metrics for iteration 3\r\nbody"));
    assert!(!header.is_current("# Metrics for iteration 30\nbody"));
    assert!(!header.is_current("# Metrics for iteration 2\nbody"));
}

#[test]
fn test_header_escapes_template_text() {
    let localizer =
        ResourceLocalizer::from_json(r#"{ "metrics.comment.title": "[PR] (v{0}) *stats*" }"#).unwrap();
    let header = MetricsCommentHeader::new(&localizer, 7).unwrap();

    assert_eq!(header.current(), "[PR] (v7) *stats*");
    assert!(header.is_metrics_comment("[PR] (v12) *stats*\n"));
    assert!(!header.is_metrics_comment("P (v12) stats"));
}

#[test]
fn test_scan_of_new_pull_request() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 1).unwrap();

    let state = reconciler.scan(&[], &header, &ignored(&["a.dll", "b.png"]));

    assert_eq!(
        state,
        ReconciliationState {
            metrics_comment_present: false,
            metrics_thread: None,
            files_needing_notice: ["a.dll", "b.png"].iter().map(|s| s.to_string()).collect(),
            files_with_stale_notice: vec![],
        }
    );
}

#[test]
fn test_decide_for_new_pull_request() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 1).unwrap();
    let state = reconciler.scan(&[], &header, &ignored(&["a.dll"]));

    let operations = reconciler.decide(&state, &desired(CommentThreadStatus::Active));

    assert_eq!(
        operations,
        vec![
            CommentOperation::CreateMetricsThread {
                content: "# Metrics for iteration 3\nbody".to_string(),
                status: CommentThreadStatus::Active,
            },
            CommentOperation::RecordMetadata(vec![MetadataEntry::new("Size", "M")]),
            CommentOperation::CreateNoReviewNotice {
                file_path: "a.dll".to_string(),
            },
        ]
    );
}

#[test]
fn test_stale_iteration_is_updated_in_place() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();
    let threads = vec![
        thread(5, None, CommentThreadStatus::Active, &["Please rename this"]),
        thread(
            9,
            None,
            CommentThreadStatus::Closed,
            &["# Metrics for iteration 2\nold body"],
        ),
    ];

    let state = reconciler.scan(&threads, &header, &[]);
    let operations = reconciler.decide(&state, &desired(CommentThreadStatus::Active));

    assert!(!state.metrics_comment_present);
    assert_eq!(
        operations,
        vec![
            CommentOperation::UpdateMetricsThread {
                thread_id: 9,
                parent_comment_id: 901,
                content: "# Metrics for iteration 3\nbody".to_string(),
                status: CommentThreadStatus::Active,
            },
            CommentOperation::RecordMetadata(vec![MetadataEntry::new("Size", "M")]),
        ]
    );
}

#[test]
fn test_rerun_after_iteration_reply_creates_nothing() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();
    let threads = vec![thread(
        4,
        None,
        CommentThreadStatus::Active,
        &["# Metrics for iteration 1\nold", "# Metrics for iteration 3\nbody"],
    )];

    let state = reconciler.scan(&threads, &header, &[]);
    let operations = reconciler.decide(&state, &desired(CommentThreadStatus::Active));

    assert!(state.metrics_comment_present);
    assert_eq!(
        state.metrics_thread,
        Some(MetricsThread {
            thread_id: 4,
            comment_id: 402,
            status: CommentThreadStatus::Active,
        })
    );
    assert!(operations.is_empty());
}

#[test]
fn test_later_stale_reply_is_the_update_parent() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 4).unwrap();
    let threads = vec![thread(
        4,
        None,
        CommentThreadStatus::Active,
        &[
            "# Metrics for iteration 1\nold",
            "Thanks!",
            "# Metrics for iteration 3\nolder",
        ],
    )];

    let state = reconciler.scan(&threads, &header, &[]);

    assert!(!state.metrics_comment_present);
    assert_eq!(state.metrics_thread.map(|t| t.comment_id), Some(403));
}

#[test]
fn test_current_iteration_thread_wins_over_older_ones() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();
    let threads = vec![
        thread(1, None, CommentThreadStatus::Closed, &["# Metrics for iteration 3"]),
        thread(2, None, CommentThreadStatus::Closed, &["# Metrics for iteration 1"]),
    ];

    let state = reconciler.scan(&threads, &header, &[]);

    assert!(state.metrics_comment_present);
    assert_eq!(
        state.metrics_thread,
        Some(MetricsThread {
            thread_id: 1,
            comment_id: 101,
            status: CommentThreadStatus::Closed,
        })
    );
}

#[test]
fn test_rerun_against_unchanged_pull_request_creates_nothing() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();
    let threads = vec![
        thread(
            1,
            None,
            CommentThreadStatus::Active,
            &["# Metrics for iteration 3\nbody"],
        ),
        thread(2, Some("a.dll"), CommentThreadStatus::Closed, &[NOTICE]),
        thread(
            3,
            None,
            CommentThreadStatus::Unknown,
            &["❗ **The changes to `b.png` don't require review.**"],
        ),
    ];

    let state = reconciler.scan(&threads, &header, &ignored(&["a.dll", "b.png"]));
    let operations = reconciler.decide(&state, &desired(CommentThreadStatus::Active));

    assert!(operations.is_empty());
}

#[test]
fn test_rerun_with_status_drift_sets_status_only() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();
    let threads = vec![thread(
        1,
        None,
        CommentThreadStatus::Active,
        &["# Metrics for iteration 3\nbody"],
    )];

    let state = reconciler.scan(&threads, &header, &[]);
    let operations = reconciler.decide(&state, &desired(CommentThreadStatus::Closed));

    assert_eq!(
        operations,
        vec![CommentOperation::SetMetricsThreadStatus {
            thread_id: 1,
            status: CommentThreadStatus::Closed,
        }]
    );
}

#[test]
fn test_unknown_status_is_not_treated_as_drift() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();
    let threads = vec![thread(
        1,
        None,
        CommentThreadStatus::Unknown,
        &["# Metrics for iteration 3\nbody"],
    )];

    let state = reconciler.scan(&threads, &header, &[]);

    assert!(reconciler
        .decide(&state, &desired(CommentThreadStatus::Closed))
        .is_empty());
}

#[test]
fn test_notice_on_file_that_now_needs_review_is_stale() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();
    let threads = vec![
        thread(4, Some("src/lib.rs"), CommentThreadStatus::Closed, &[NOTICE]),
        thread(
            6,
            None,
            CommentThreadStatus::Unknown,
            &["❗ **The changes to `src/main.rs` don't require review.**"],
        ),
    ];

    let state = reconciler.scan(&threads, &header, &[]);

    assert_eq!(
        state.files_with_stale_notice,
        vec![
            StaleNotice {
                thread_id: 4,
                comment_id: 401,
                file_path: "src/lib.rs".to_string(),
            },
            StaleNotice {
                thread_id: 6,
                comment_id: 601,
                file_path: "src/main.rs".to_string(),
            },
        ]
    );

    let operations = reconciler.decide(&state, &desired(CommentThreadStatus::Active));
    assert!(operations.contains(&CommentOperation::DeleteStaleNotice {
        thread_id: 4,
        comment_id: 401,
        file_path: "src/lib.rs".to_string(),
    }));
}

#[test]
fn test_notice_with_replies_is_not_recognised() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();
    let threads = vec![thread(
        4,
        Some("a.dll"),
        CommentThreadStatus::Closed,
        &[NOTICE, "Are you sure?"],
    )];

    let state = reconciler.scan(&threads, &header, &ignored(&["a.dll"]));

    assert!(state.files_needing_notice.contains("a.dll"));
    assert!(state.files_with_stale_notice.is_empty());
}

#[test]
fn test_other_file_comments_are_left_alone() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);
    let header = MetricsCommentHeader::new(&localizer, 3).unwrap();
    let threads = vec![
        thread(4, Some("a.dll"), CommentThreadStatus::Active, &["Why binary?"]),
        thread(5, Some("b.rs"), CommentThreadStatus::Active, &[]),
    ];

    let state = reconciler.scan(&threads, &header, &ignored(&["a.dll"]));

    assert!(state.files_needing_notice.contains("a.dll"));
    assert!(state.files_with_stale_notice.is_empty());
}

#[test]
fn test_unanchored_notice_round_trip() {
    let localizer = ResourceLocalizer::english();
    let reconciler = CommentReconciler::new(&localizer);

    let notice = reconciler.unanchored_notice("docs/a b.md");

    assert_eq!(notice, "❗ **The changes to `docs/a b.md` don't require review.**");
    assert_eq!(reconciler.unanchored_notice_path(&notice), Some("docs/a b.md"));
    assert_eq!(reconciler.unanchored_notice_path(NOTICE), None);
}

fn assessment(is_small: bool, tested: Option<bool>) -> SizeAssessment {
    SizeAssessment {
        size: if is_small { SizeCategory::S } else { SizeCategory::L },
        is_small,
        is_sufficiently_tested: tested,
    }
}

#[test]
fn test_metrics_status() {
    assert_eq!(
        metrics_status(&assessment(true, Some(true))),
        CommentThreadStatus::Closed
    );
    assert_eq!(
        metrics_status(&assessment(true, None)),
        CommentThreadStatus::Closed
    );
    assert_eq!(
        metrics_status(&assessment(true, Some(false))),
        CommentThreadStatus::Active
    );
    assert_eq!(
        metrics_status(&assessment(false, Some(true))),
        CommentThreadStatus::Active
    );
}

#[test]
fn test_metrics_comment_content_small_and_tested() {
    let localizer = ResourceLocalizer::english();
    let header = MetricsCommentHeader::new(&localizer, 2).unwrap();
    let metrics = CodeMetrics::new(9, 12, 4).unwrap();

    let content = metrics_comment_content(
        &localizer,
        &header,
        200,
        &assessment(true, Some(true)),
        &metrics,
    );

    let expected = [
        "# Metrics for iteration 2",
        "✔ **Thanks for keeping your pull request small.**",
        "✔ **Thanks for adding tests.**",
        "||Lines",
        "-|-:",
        "Product Code|9",
        "Test Code|12",
        "**Subtotal**|**21**",
        "Ignored Code|4",
        "**Total**|**25**",
        "",
        "[Metrics computed by PR Metrics.](https://github.com/microsoft/PR-Metrics)",
    ]
    .join("\n");
    assert_eq!(content, expected);
    assert!(header.is_current(&content));
}

#[test]
fn test_metrics_comment_content_large_without_test_factor() {
    let localizer = ResourceLocalizer::english();
    let header = MetricsCommentHeader::new(&localizer, 2).unwrap();
    let metrics = CodeMetrics::new(900, 0, 0).unwrap();

    let content = metrics_comment_content(
        &localizer,
        &header,
        200,
        &assessment(false, None),
        &metrics,
    );

    assert!(content.contains("smaller than 200 lines"));
    assert!(!content.contains("tests"));
}

#[test]
fn test_metadata_entries() {
    let metrics = CodeMetrics::new(20, 5, 3).unwrap();

    let entries = metadata_entries(&assessment(false, Some(false)), &metrics);

    assert_eq!(
        entries,
        vec![
            MetadataEntry::new("Size", "L"),
            MetadataEntry::new("ProductCode", "20"),
            MetadataEntry::new("TestCode", "5"),
            MetadataEntry::new("Subtotal", "25"),
            MetadataEntry::new("IgnoredCode", "3"),
            MetadataEntry::new("Total", "28"),
            MetadataEntry::new("TestCoverage", "false"),
        ]
    );
}

#[test]
fn test_metadata_entries_without_test_factor() {
    let metrics = CodeMetrics::new(1, 0, 0).unwrap();

    let entries = metadata_entries(&assessment(true, None), &metrics);

    assert_eq!(entries.len(), 6);
    assert!(entries.iter().all(|e| e.key != "TestCoverage"));
}
