//! # Title and Description
//!
//! Prefixes the pull request title with its size and test verdict, for example
//! `M✔ ◾ Add caching to the resolver`, and asks for a description when there is none.

use lazy_static::lazy_static;
use regex::Regex;

use crate::localization::Localizer;
use crate::size::SizeAssessment;

#[cfg(test)]
#[path = "title_tests.rs"]
mod tests;

/// Resource key of the text placed in an empty description.
pub const DESCRIPTION_PLACEHOLDER_KEY: &str = "description.placeholder";

const SUFFICIENTLY_TESTED_INDICATOR: &str = "✔";
const INSUFFICIENTLY_TESTED_INDICATOR: &str = "⚠️";
const TITLE_SEPARATOR: &str = " ◾ ";

lazy_static! {
    static ref TITLE_PREFIX_REGEX: Regex = Regex::new(r"^(?:XS|S|M|L|\d*XL)(?:✔|⚠️)? ◾ ")
        .expect("Failed to compile title prefix regex");
}

/// The changes to make to the title and description. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TitleUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Returns the size prefix for a title, separator included.
///
/// # Examples
///
/// ```
/// use pr_metrics_core::size::{SizeAssessment, SizeCategory};
/// use pr_metrics_core::title::title_prefix;
///
/// let assessment = SizeAssessment {
///     size: SizeCategory::XL(2),
///     is_small: false,
///     is_sufficiently_tested: Some(false),
/// };
///
/// assert_eq!(title_prefix(&assessment), "2XL⚠️ ◾ ");
/// ```
pub fn title_prefix(assessment: &SizeAssessment) -> String {
    let indicator = match assessment.is_sufficiently_tested {
        Some(true) => SUFFICIENTLY_TESTED_INDICATOR,
        Some(false) => INSUFFICIENTLY_TESTED_INDICATOR,
        None => "",
    };

    format!("{}{}{}", assessment.size, indicator, TITLE_SEPARATOR)
}

/// Returns `title` with its size prefix replaced by the one for `assessment`.
pub fn title_with_size(title: &str, assessment: &SizeAssessment) -> String {
    let stripped = TITLE_PREFIX_REGEX.replace(title, "");
    format!("{}{}", title_prefix(assessment), stripped)
}

/// Works out which of the title and description need to change.
pub fn plan_title_update(
    localizer: &dyn Localizer,
    title: &str,
    description: Option<&str>,
    assessment: &SizeAssessment,
) -> TitleUpdate {
    let new_title = title_with_size(title, assessment);
    let needs_description = description.map(|d| d.trim().is_empty()).unwrap_or(true);

    TitleUpdate {
        title: (new_title != title).then_some(new_title),
        description: needs_description
            .then(|| localizer.localize(DESCRIPTION_PLACEHOLDER_KEY, &[])),
    }
}
