//! # Diff Summary Classification
//!
//! Turns a `git diff --numstat` summary into per-file line counts and sorts every file
//! into product, test or ignored code.
//!
//! Each summary line has the form `<added>\t<deleted>\t<path>`, where a count of `-`
//! marks a binary file. Paths of renamed files use git's rename syntax
//! (`src/{old => new}/file.rs` or `old.rs => new.rs`) and are collapsed to the final
//! path before anything else looks at them.

use std::fmt;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, instrument};

use crate::config::Inputs;
use crate::errors::PrMetricsError;
use crate::metrics::CodeMetrics;

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;

lazy_static! {
    static ref RENAME_GROUP_REGEX: Regex =
        Regex::new(r"\{[^}]*? => ([^}]*?)\}").expect("Failed to compile rename group regex");
}

/// A line count from the diff summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCount {
    Lines(u64),
    /// Git reports `-` for binary files; their line counts are unknown.
    Binary,
}

impl LineCount {
    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "-" => Some(LineCount::Binary),
            v => v.parse::<u64>().ok().map(LineCount::Lines),
        }
    }

    /// The number of lines, with binary files counting as zero.
    pub fn lines(&self) -> u64 {
        match self {
            LineCount::Lines(count) => *count,
            LineCount::Binary => 0,
        }
    }
}

/// The line statistics of a single changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub path: String,
    pub lines_added: LineCount,
    pub lines_deleted: LineCount,
}

impl FileStat {
    /// Parses one diff summary line, normalizing rename syntax in the path.
    ///
    /// # Errors
    ///
    /// Returns [`PrMetricsError::MalformedDiffSummaryLine`] when the line does not
    /// have three tab separated fields or a count is neither a number nor `-`.
    pub fn parse(line: &str) -> Result<Self, PrMetricsError> {
        let normalized = normalize_renames(line);
        let mut fields = normalized.splitn(3, '\t');

        let (added, deleted, path) = match (fields.next(), fields.next(), fields.next()) {
            (Some(added), Some(deleted), Some(path)) if !path.trim().is_empty() => {
                (added, deleted, path.trim())
            }
            _ => return Err(PrMetricsError::MalformedDiffSummaryLine(line.to_string())),
        };

        match (LineCount::parse(added), LineCount::parse(deleted)) {
            (Some(lines_added), Some(lines_deleted)) => Ok(Self {
                path: path.to_string(),
                lines_added,
                lines_deleted,
            }),
            _ => Err(PrMetricsError::MalformedDiffSummaryLine(line.to_string())),
        }
    }
}

/// Collapses git rename syntax to the destination path.
///
/// # Examples
///
/// ```
/// use pr_metrics_core::classifier::normalize_renames;
///
/// assert_eq!(normalize_renames("F{a => i}leT{b => e}st.d{c => l}l"), "FileTest.dll");
/// assert_eq!(normalize_renames("src/{lib => core}/mod.rs"), "src/core/mod.rs");
/// assert_eq!(normalize_renames("old.rs => new.rs"), "new.rs");
/// ```
pub fn normalize_renames(text: &str) -> String {
    let collapsed = RENAME_GROUP_REGEX.replace_all(text, "$1");

    // A whole-path rename has no braces: keep everything after the arrow, but leave
    // any leading count fields in place.
    let collapsed = match collapsed.find(" => ") {
        Some(arrow) => {
            let start = collapsed[..arrow].rfind('\t').map(|i| i + 1).unwrap_or(0);
            format!("{}{}", &collapsed[..start], &collapsed[arrow + 4..])
        }
        None => collapsed.into_owned(),
    };

    let mut normalized = collapsed;
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }

    normalized
}

/// Why a file was left out of the product and test counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The path matched no inclusion pattern, or matched an exclusion pattern.
    Pattern,
    /// The extension is not a code file extension.
    Extension,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::Pattern => write!(f, "pattern"),
            IgnoreReason::Extension => write!(f, "extension"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Product,
    Test,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub stat: FileStat,
    pub classification: Classification,
}

/// The outcome of classifying a whole diff summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedDiff {
    pub metrics: CodeMetrics,

    /// Every parsed file, in summary order.
    pub files: Vec<ClassifiedFile>,

    /// Ignored files with no added lines (or binary). These may get a notice saying
    /// they need no review.
    pub ignored_without_lines_added: Vec<String>,

    /// Ignored files with added lines. These never get a notice.
    pub ignored_with_lines_added: Vec<String>,
}

/// Classifies diff summaries using the configured patterns and extensions.
#[derive(Debug, Clone)]
pub struct DiffSummaryClassifier {
    include: GlobSet,
    exclude: GlobSet,
    code_file_extensions: Vec<String>,
}

impl DiffSummaryClassifier {
    /// Creates a classifier from validated inputs.
    ///
    /// Patterns starting with `!` exclude matching paths. A path is matched when it
    /// matches at least one inclusion pattern and no exclusion pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PrMetricsError::InvalidPattern`] if a pattern is not a valid glob.
    pub fn new(inputs: &Inputs) -> Result<Self, PrMetricsError> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();

        for pattern in &inputs.file_matching_patterns {
            let (builder, glob_text) = match pattern.strip_prefix('!') {
                Some(negated) => (&mut exclude, negated),
                None => (&mut include, pattern.as_str()),
            };

            let glob = Glob::new(glob_text).map_err(|source| PrMetricsError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }

        let build = |builder: GlobSetBuilder| {
            builder
                .build()
                .map_err(|source| PrMetricsError::InvalidPattern {
                    pattern: inputs.file_matching_patterns.join(", "),
                    source,
                })
        };

        Ok(Self {
            include: build(include)?,
            exclude: build(exclude)?,
            code_file_extensions: inputs.code_file_extensions.iter().cloned().collect(),
        })
    }

    /// Decides how a single path is counted.
    pub fn classify_path(&self, path: &str) -> Classification {
        if !self.matches_patterns(path) {
            return Classification::Ignored(IgnoreReason::Pattern);
        }

        if !self.matches_extension(path) {
            return Classification::Ignored(IgnoreReason::Extension);
        }

        if path.to_lowercase().contains("test") {
            Classification::Test
        } else {
            Classification::Product
        }
    }

    /// Classifies every line of a diff summary and totals the added lines.
    ///
    /// Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PrMetricsError::MalformedDiffSummaryLine`] for the first line that
    /// cannot be parsed.
    #[instrument(skip(self, summary), fields(summary_length = summary.len()))]
    pub fn classify(&self, summary: &str) -> Result<ClassifiedDiff, PrMetricsError> {
        let mut product_code: u64 = 0;
        let mut test_code: u64 = 0;
        let mut ignored_code: u64 = 0;
        let mut files = Vec::new();
        let mut ignored_without_lines_added = Vec::new();
        let mut ignored_with_lines_added = Vec::new();

        for line in summary.lines().filter(|l| !l.trim().is_empty()) {
            let stat = FileStat::parse(line)?;
            let classification = self.classify_path(&stat.path);
            let added = stat.lines_added.lines();

            match classification {
                Classification::Product => product_code = product_code.saturating_add(added),
                Classification::Test => test_code = test_code.saturating_add(added),
                Classification::Ignored(reason) => {
                    ignored_code = ignored_code.saturating_add(added);
                    if added == 0 {
                        ignored_without_lines_added.push(stat.path.clone());
                    } else {
                        ignored_with_lines_added.push(stat.path.clone());
                    }

                    debug!(path = stat.path.as_str(), reason = %reason, added, "Ignoring file");
                }
            }

            files.push(ClassifiedFile {
                stat,
                classification,
            });
        }

        let metrics = CodeMetrics::new(
            to_metric(product_code),
            to_metric(test_code),
            to_metric(ignored_code),
        )?;

        debug!(
            product_code = metrics.product_code(),
            test_code = metrics.test_code(),
            ignored_code = metrics.ignored_code(),
            files = files.len(),
            "Classified diff summary"
        );

        Ok(ClassifiedDiff {
            metrics,
            files,
            ignored_without_lines_added,
            ignored_with_lines_added,
        })
    }

    fn matches_patterns(&self, path: &str) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }

    fn matches_extension(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let extension = e.to_lowercase();
                self.code_file_extensions.iter().any(|c| *c == extension)
            })
            .unwrap_or(false)
    }
}

fn to_metric(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
