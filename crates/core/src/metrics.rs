//! # Code Metrics
//!
//! Line counts for a pull request, split into product, test and ignored code.

use serde::{Deserialize, Serialize};

use crate::errors::PrMetricsError;

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;

/// The added-line counts of a pull request.
///
/// Values can only be created through [`CodeMetrics::new`], which rejects negative
/// components.
///
/// # Examples
///
/// ```
/// use pr_metrics_core::metrics::CodeMetrics;
///
/// let metrics = CodeMetrics::new(9, 3, 2).unwrap();
/// assert_eq!(metrics.subtotal(), 12);
/// assert_eq!(metrics.total(), 14);
///
/// assert!(CodeMetrics::new(-1, 0, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeMetrics {
    product_code: u64,
    test_code: u64,
    ignored_code: u64,
}

impl CodeMetrics {
    /// Creates a new set of metrics.
    ///
    /// # Errors
    ///
    /// Returns [`PrMetricsError::NegativeMetric`] naming the first negative field.
    pub fn new(product_code: i64, test_code: i64, ignored_code: i64) -> Result<Self, PrMetricsError> {
        Ok(Self {
            product_code: non_negative("productCode", product_code)?,
            test_code: non_negative("testCode", test_code)?,
            ignored_code: non_negative("ignoredCode", ignored_code)?,
        })
    }

    pub fn product_code(&self) -> u64 {
        self.product_code
    }

    pub fn test_code(&self) -> u64 {
        self.test_code
    }

    pub fn ignored_code(&self) -> u64 {
        self.ignored_code
    }

    /// Product and test code together. Saturates at `u64::MAX`.
    pub fn subtotal(&self) -> u64 {
        self.product_code.saturating_add(self.test_code)
    }

    /// All added lines, ignored code included.
    pub fn total(&self) -> u64 {
        self.subtotal().saturating_add(self.ignored_code)
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, PrMetricsError> {
    u64::try_from(value).map_err(|_| PrMetricsError::NegativeMetric { field, value })
}
