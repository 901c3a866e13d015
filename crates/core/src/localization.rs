//! # Localization
//!
//! All human-readable text produced by PR Metrics, including the comment headers that
//! are later matched against existing comments, is looked up by key. Templates use
//! positional placeholders: `{0}`, `{1}`, ...

use std::collections::HashMap;
use std::fmt::Display;

use lazy_static::lazy_static;
use tracing::warn;

#[cfg(test)]
#[path = "localization_tests.rs"]
mod tests;

lazy_static! {
    static ref EN_US: HashMap<String, String> =
        serde_json::from_str(include_str!("../resources/en-US.json"))
            .expect("Failed to parse the embedded en-US resources");
}

/// Looks up human-readable strings by key.
pub trait Localizer: Send + Sync {
    /// Returns the raw template for `key`, placeholders included.
    fn template(&self, key: &str) -> String;

    /// Returns the string for `key` with `{n}` replaced by `params[n]`.
    fn localize(&self, key: &str, params: &[&dyn Display]) -> String {
        format_template(&self.template(key), params)
    }
}

/// Replaces the positional placeholders of `template` with `params`.
///
/// # Examples
///
/// ```
/// use pr_metrics_core::localization::format_template;
///
/// assert_eq!(format_template("{0} of {1}", &[&3, &"five"]), "3 of five");
/// ```
pub fn format_template(template: &str, params: &[&dyn Display]) -> String {
    params
        .iter()
        .enumerate()
        .fold(template.to_string(), |text, (index, param)| {
            text.replace(&format!("{{{}}}", index), &param.to_string())
        })
}

/// A [`Localizer`] backed by a key/value string table.
#[derive(Debug, Clone)]
pub struct ResourceLocalizer {
    resources: HashMap<String, String>,
}

impl ResourceLocalizer {
    /// Creates a localizer using the embedded English resources.
    pub fn english() -> Self {
        Self {
            resources: EN_US.clone(),
        }
    }

    /// Creates a localizer from a JSON object of key/template pairs.
    ///
    /// Keys missing from `json` fall back to the embedded English resources.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let overrides: HashMap<String, String> = serde_json::from_str(json)?;
        let mut resources = EN_US.clone();
        resources.extend(overrides);

        Ok(Self { resources })
    }
}

impl Default for ResourceLocalizer {
    fn default() -> Self {
        Self::english()
    }
}

impl Localizer for ResourceLocalizer {
    fn template(&self, key: &str) -> String {
        match self.resources.get(key) {
            Some(template) => template.clone(),
            None => {
                warn!(key, "No resource found for key");
                key.to_string()
            }
        }
    }
}
