//! # Unified Diff Line Locator
//!
//! Finds the first changed line of each file in a unified diff, so that file scoped
//! comments can be anchored on hosts that require a line.
//!
//! The diff is fetched and parsed at most once per run; see [`LazyDiffLineIndex`].

use std::collections::HashMap;

use lazy_static::lazy_static;
use pr_metrics_developer_platforms::GitClient;
use regex::Regex;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::errors::PrMetricsError;

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;

const DIFF_HEADER_PREFIX: &str = "diff --git ";

lazy_static! {
    static ref DIFF_HEADER_REGEX: Regex =
        Regex::new(r#"^diff --git "?a/(?P<old>.+?)"? "?b/(?P<new>.+?)"?$"#)
            .expect("Failed to compile diff header regex");
}

/// How a file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Renamed,
    Deleted,
}

/// The parsed header and first hunk of one file's diff block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub kind: ChangeKind,

    /// The path after the change. For deleted files this is the removed path.
    pub path: String,

    /// The destination side start line of the first hunk, if there is one.
    pub first_line: Option<u32>,
}

/// Splits concatenated unified diff text into one block per file.
///
/// Each returned block starts with its `diff --git` header. Text before the first
/// header is discarded.
pub fn split_file_blocks(diff: &str) -> Vec<&str> {
    let mut starts: Vec<usize> = Vec::new();
    let mut offset = 0;
    for line in diff.split_inclusive('\n') {
        if line.starts_with(DIFF_HEADER_PREFIX) {
            starts.push(offset);
        }
        offset += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end = starts.get(i + 1).copied().unwrap_or(diff.len());
            &diff[*start..end]
        })
        .collect()
}

/// Parses a single file block.
///
/// # Errors
///
/// Returns [`PrMetricsError::DiffHeaderMismatch`] if the block's first line is not a
/// `diff --git a/<path> b/<path>` header.
pub fn parse_file_block(block: &str) -> Result<FileDiff, PrMetricsError> {
    let mut lines = block.lines();
    let header = lines.next().unwrap_or_default();
    let captures = DIFF_HEADER_REGEX
        .captures(header)
        .ok_or_else(|| PrMetricsError::DiffHeaderMismatch(header.to_string()))?;

    let mut path = captures["new"].to_string();
    let mut kind = ChangeKind::Modified;
    let mut first_line = None;

    for line in lines {
        if line.starts_with("@@") {
            first_line = parse_hunk_new_start(line);
            break;
        }

        if line.starts_with("new file mode") {
            kind = ChangeKind::Added;
        } else if line.starts_with("deleted file mode") {
            kind = ChangeKind::Deleted;
            path = captures["old"].to_string();
        } else if let Some(new_path) = line.strip_prefix("rename to ") {
            kind = ChangeKind::Renamed;
            path = unquote(new_path).to_string();
        } else if let Some(new_path) = line.strip_prefix("+++ ") {
            if new_path != "/dev/null" {
                let new_path = unquote(new_path.trim_end_matches('\t'));
                path = new_path.strip_prefix("b/").unwrap_or(new_path).to_string();
            }
        }
    }

    Ok(FileDiff {
        kind,
        path,
        first_line,
    })
}

fn unquote(path: &str) -> &str {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
}

/// Reads the destination start line from a `@@ -a,b +c,d @@` hunk header.
fn parse_hunk_new_start(line: &str) -> Option<u32> {
    let plus_pos = line.find(" +")?;
    let tail = &line[(plus_pos + 2)..];
    let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();

    digits.parse::<u32>().ok()
}

/// Map from a file's final path to the first changed line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffLineIndex {
    lines: HashMap<String, u32>,
}

impl DiffLineIndex {
    /// Builds the index from unified diff text.
    ///
    /// Added, modified and renamed files with at least one hunk get an entry. Deleted
    /// files, pure renames and hunks starting at line 0 (deletions at the top of a now
    /// empty file) get none.
    ///
    /// # Examples
    ///
    /// ```
    /// use pr_metrics_core::diff::DiffLineIndex;
    ///
    /// let diff = "diff --git a/src/lib.rs b/src/lib.rs\n\
    ///             index 1111111..2222222 100644\n\
    ///             --- a/src/lib.rs\n\
    ///             +++ b/src/lib.rs\n\
    ///             @@ -10,0 +11,2 @@\n\
    ///             +fn added() {}\n\
    ///             +\n";
    ///
    /// let index = DiffLineIndex::parse(diff).unwrap();
    /// assert_eq!(index.line_for("src/lib.rs"), Some(11));
    /// assert_eq!(index.line_for("src/main.rs"), None);
    /// ```
    #[instrument(skip(diff), fields(diff_length = diff.len()))]
    pub fn parse(diff: &str) -> Result<Self, PrMetricsError> {
        let mut lines = HashMap::new();

        for block in split_file_blocks(diff) {
            let file = parse_file_block(block)?;
            match (file.kind, file.first_line) {
                (ChangeKind::Deleted, _) | (_, None) | (_, Some(0)) => {
                    debug!(path = file.path.as_str(), kind = ?file.kind, "No line anchor for file");
                }
                (_, Some(line)) => {
                    lines.insert(file.path, line);
                }
            }
        }

        debug!(entries = lines.len(), "Built diff line index");
        Ok(Self { lines })
    }

    /// Returns the first changed line of `path`, or `None` if it has no entry.
    pub fn line_for(&self, path: &str) -> Option<u32> {
        self.lines.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A [`DiffLineIndex`] that is fetched and parsed on first use.
///
/// Concurrent callers share a single fetch. Once built, the index is never rebuilt
/// for the lifetime of this value.
pub struct LazyDiffLineIndex<'a, G: GitClient + ?Sized> {
    git: &'a G,
    index: OnceCell<DiffLineIndex>,
}

impl<'a, G: GitClient + ?Sized> LazyDiffLineIndex<'a, G> {
    pub fn new(git: &'a G) -> Self {
        Self {
            git,
            index: OnceCell::new(),
        }
    }

    /// Returns the first changed line of `path`, building the index if needed.
    pub async fn line_for(&self, path: &str) -> Result<Option<u32>, PrMetricsError> {
        let index = self
            .index
            .get_or_try_init(|| async {
                let diff = self.git.get_unified_diff().await?;
                DiffLineIndex::parse(&diff)
            })
            .await?;

        Ok(index.line_for(path))
    }
}
