use super::*;
use serde_json::{from_str, to_string};

#[test]
fn test_comment_thread_deserialization() {
    let json_str = r#"{
        "id": 17,
        "comments": [{ "id": 1, "content": "First" }, { "id": 2, "content": "Second" }],
        "file_path": "src/main.rs",
        "status": "closed"
    }"#;

    let thread: CommentThread = from_str(json_str).expect("Failed to deserialize CommentThread");

    assert_eq!(thread.id, 17);
    assert_eq!(thread.comments.len(), 2);
    assert_eq!(thread.file_path.as_deref(), Some("src/main.rs"));
    assert_eq!(thread.status, CommentThreadStatus::Closed);
}

#[test]
fn test_comment_thread_first_comment() {
    let thread = CommentThread {
        id: 1,
        comments: vec![
            Comment {
                id: 5,
                content: "Header".to_string(),
            },
            Comment {
                id: 6,
                content: "Reply".to_string(),
            },
        ],
        file_path: None,
        status: CommentThreadStatus::Active,
    };

    assert_eq!(thread.first_comment().map(|c| c.id), Some(5));
    assert!(!thread.is_file_scoped());
}

#[test]
fn test_comment_thread_without_comments() {
    let thread = CommentThread {
        id: 1,
        comments: vec![],
        file_path: Some("a.txt".to_string()),
        status: CommentThreadStatus::Unknown,
    };

    assert!(thread.first_comment().is_none());
    assert!(thread.is_file_scoped());
}

#[test]
fn test_comment_thread_status_serialization() {
    let json_str = to_string(&CommentThreadStatus::Active).expect("Failed to serialize status");
    assert_eq!(json_str, r#""active""#);

    assert_eq!(CommentThreadStatus::Closed.to_string(), "closed");
    assert_eq!(CommentThreadStatus::Unknown.as_str(), "unknown");
}

#[test]
fn test_metadata_entry_new() {
    let entry = MetadataEntry::new("ProductCode", 9.to_string());

    assert_eq!(entry.key, "ProductCode");
    assert_eq!(entry.value, "9");
}

#[test]
fn test_pull_request_details_round_trip() {
    let details = PullRequestDetails {
        title: "S✔ ◾ Fix typo".to_string(),
        description: Some("Fixes the typo in the readme.".to_string()),
    };

    let json_str = to_string(&details).expect("Failed to serialize PullRequestDetails");
    let parsed: serde_json::Value = from_str(&json_str).expect("Failed to parse JSON");

    assert_eq!(parsed["title"], "S✔ ◾ Fix typo");
    assert_eq!(parsed["description"], "Fixes the typo in the readme.");
}
