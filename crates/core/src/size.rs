//! # PR Size Analysis
//!
//! This module turns the number of added product code lines into a size category.
//!
//! Categories follow a geometric ladder. `S` ends at the base size, and each category
//! after it ends at the previous threshold multiplied by the growth rate:
//!
//! | Category | Product code lines                      |
//! |----------|-----------------------------------------|
//! | `XS`     | 0, or fewer than `base / growth`        |
//! | `S`      | up to `base`                            |
//! | `M`      | up to `base * growth`                   |
//! | `L`      | up to `base * growth^2`                 |
//! | `XL`     | up to `base * growth^3`                 |
//! | `nXL`    | up to `base * growth^(n + 2)`           |

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::config::Inputs;
use crate::errors::PrMetricsError;
use crate::metrics::CodeMetrics;

#[cfg(test)]
#[path = "size_tests.rs"]
mod tests;

/// The size category of a pull request.
///
/// Categories are ordered from smallest to largest, so `XL(2)` sorts after `XL(1)`.
///
/// # Examples
///
/// ```
/// use pr_metrics_core::size::SizeCategory;
///
/// assert!(SizeCategory::S < SizeCategory::M);
/// assert_eq!(SizeCategory::XL(1).to_string(), "XL");
/// assert_eq!(SizeCategory::XL(3).to_string(), "3XL");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SizeCategory {
    XS,
    S,
    M,
    L,
    /// Beyond `L`. The multiplier starts at 1 and grows by one per ladder step.
    XL(u32),
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeCategory::XS => write!(f, "XS"),
            SizeCategory::S => write!(f, "S"),
            SizeCategory::M => write!(f, "M"),
            SizeCategory::L => write!(f, "L"),
            SizeCategory::XL(1) => write!(f, "XL"),
            SizeCategory::XL(multiplier) => write!(f, "{}XL", multiplier),
        }
    }
}

impl Serialize for SizeCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The full size assessment of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeAssessment {
    pub size: SizeCategory,

    /// Whether the product code fits within the base size.
    pub is_small: bool,

    /// Whether enough test code was added. `None` when no test factor is configured.
    pub is_sufficiently_tested: Option<bool>,
}

/// Calculates size categories from a base size and growth rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeCalculator {
    base_size: f64,
    growth_rate: f64,
    test_factor: Option<f64>,
}

impl SizeCalculator {
    /// Creates a calculator.
    ///
    /// # Errors
    ///
    /// Returns [`PrMetricsError::InvalidSizeParameters`] if the base size is not
    /// positive, the growth rate is not a finite number greater than 1.0, or the test
    /// factor is negative or not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use pr_metrics_core::size::{SizeCalculator, SizeCategory};
    ///
    /// let calculator = SizeCalculator::new(5, 2.0, None).unwrap();
    /// assert_eq!(calculator.size(0), SizeCategory::XS);
    /// assert_eq!(calculator.size(20), SizeCategory::L);
    ///
    /// assert!(SizeCalculator::new(5, 1.0, None).is_err());
    /// ```
    pub fn new(
        base_size: u64,
        growth_rate: f64,
        test_factor: Option<f64>,
    ) -> Result<Self, PrMetricsError> {
        if base_size == 0 {
            return Err(PrMetricsError::InvalidSizeParameters(
                "the base size must be greater than zero".to_string(),
            ));
        }

        if !growth_rate.is_finite() || growth_rate <= 1.0 {
            return Err(PrMetricsError::InvalidSizeParameters(format!(
                "the growth rate must be greater than 1.0, but was {}",
                growth_rate
            )));
        }

        if let Some(factor) = test_factor {
            if !factor.is_finite() || factor < 0.0 {
                return Err(PrMetricsError::InvalidSizeParameters(format!(
                    "the test factor must be zero or greater, but was {}",
                    factor
                )));
            }
        }

        Ok(Self {
            base_size: base_size as f64,
            growth_rate,
            test_factor,
        })
    }

    /// Creates a calculator from validated inputs.
    pub fn from_inputs(inputs: &Inputs) -> Result<Self, PrMetricsError> {
        Self::new(inputs.base_size, inputs.growth_rate, inputs.test_factor)
    }

    /// Returns the size category for the given number of product code lines.
    pub fn size(&self, product_code: u64) -> SizeCategory {
        let lines = product_code as f64;

        if product_code == 0 || lines < self.base_size / self.growth_rate {
            return SizeCategory::XS;
        }

        if lines <= self.base_size {
            return SizeCategory::S;
        }

        let mut threshold = self.base_size;
        let mut steps: u32 = 0;
        while lines > threshold {
            threshold *= self.growth_rate;
            steps = steps.saturating_add(1);
        }

        match steps {
            1 => SizeCategory::M,
            2 => SizeCategory::L,
            n => SizeCategory::XL(n - 2),
        }
    }

    /// Whether the product code fits within the base size.
    pub fn is_small(&self, product_code: u64) -> bool {
        product_code as f64 <= self.base_size
    }

    /// Whether the test code covers the product code at the configured test factor.
    ///
    /// Returns `None` when no test factor is configured.
    pub fn is_sufficiently_tested(&self, metrics: &CodeMetrics) -> Option<bool> {
        self.test_factor.map(|factor| {
            metrics.test_code() as f64 >= metrics.product_code() as f64 * factor
        })
    }

    /// Computes the size, smallness and test verdict together.
    pub fn assess(&self, metrics: &CodeMetrics) -> SizeAssessment {
        let assessment = SizeAssessment {
            size: self.size(metrics.product_code()),
            is_small: self.is_small(metrics.product_code()),
            is_sufficiently_tested: self.is_sufficiently_tested(metrics),
        };

        debug!(
            size = %assessment.size,
            is_small = assessment.is_small,
            is_sufficiently_tested = ?assessment.is_sufficiently_tested,
            "Assessed pull request size"
        );
        assessment
    }
}
