//! Immutable configuration passed into every fit call
//!
//! All thresholds live here rather than in process-wide state, so fitting a
//! feature is reentrant and can be tested in isolation.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::column::ColumnKind;
use super::encoder::FallbackPolicy;
use super::error::ConfigError;
use super::monotonicity::MonotonicityConstraint;

/// Smoothing constant added to both counts of a bin with a zero count
pub const DEFAULT_SMOOTHING: f64 = 0.5;

/// Minimum difference between floats needed to deem them equal
pub const DEFAULT_NUMERIC_ACCURACY: f64 = 1e-6;

/// Complete configuration for validating, binning and encoding one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WoeConfig {
    pub validator: ValidatorConfig,
    pub binning: BinningConfig,
    pub encoding: EncodingConfig,
    /// Smoothing constant shared by the binner's monotonic merge and the encoder
    pub smoothing: f64,
}

/// Eligibility rules applied by the feature validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Features with a larger share of missing values are ineligible
    pub missing_rate_threshold: f64,
    /// Minimum distinct non-missing values for an eligible feature
    pub min_distinct_values: usize,
    pub accepted_kinds: BTreeSet<ColumnKind>,
    /// More distinct strings than this and a column is treated as free text
    pub max_categories: usize,
    /// Strings that denote a missing value
    pub missing_markers: Vec<String>,
    /// Treat strings that parse as finite numbers as numeric values
    pub coerce_numeric_strings: bool,
    /// Raise `ValidationError::Ineligible` instead of returning a failing verdict
    pub strict: bool,
}

/// Split search and merging parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BinningConfig {
    /// Maximum recursive split depth (at most 2^depth bins per value axis)
    pub max_depth: usize,
    /// Minimum leaf population as a fraction of the non-missing observations.
    /// The effective minimum is the larger of this and `min_leaf_count`, so
    /// a small fraction on a small sample is overridden by the count.
    pub min_leaf_fraction: f64,
    /// Minimum leaf population as an absolute count; see `min_leaf_fraction`
    pub min_leaf_count: usize,
    /// Fewer distinct values than this and every value gets its own bin
    pub min_bins: usize,
    /// Adjacent bins whose chi-squared p-value exceeds this are merged
    pub significance_threshold: f64,
    /// Boundary rounding tolerance
    pub numeric_accuracy: f64,
    pub monotonicity: MonotonicityConstraint,
}

/// WoE lookup parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    pub fallback: FallbackPolicy,
}

impl Default for WoeConfig {
    fn default() -> Self {
        Self {
            validator: ValidatorConfig::default(),
            binning: BinningConfig::default(),
            encoding: EncodingConfig::default(),
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            missing_rate_threshold: 0.95,
            min_distinct_values: 2,
            accepted_kinds: [ColumnKind::Numeric, ColumnKind::Categorical, ColumnKind::Mixed]
                .into_iter()
                .collect(),
            max_categories: 1000,
            missing_markers: ["", "NA", "N/A", "NaN", "null"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            coerce_numeric_strings: true,
            strict: false,
        }
    }
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            min_leaf_fraction: 0.05,
            min_leaf_count: 5,
            min_bins: 3,
            significance_threshold: 0.05,
            numeric_accuracy: DEFAULT_NUMERIC_ACCURACY,
            monotonicity: MonotonicityConstraint::None,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::NearestBin,
        }
    }
}

impl WoeConfig {
    /// Parse a JSON configuration; omitted fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: WoeConfig =
            serde_json::from_str(json).context("Failed to parse WoE configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.validator;
        let b = &self.binning;

        check_range(
            "missing_rate_threshold",
            v.missing_rate_threshold,
            (0.0..=1.0).contains(&v.missing_rate_threshold),
            "within [0, 1]",
        )?;
        if v.min_distinct_values == 0 {
            return Err(out_of_range("min_distinct_values", "at least 1", 0));
        }
        if v.max_categories == 0 {
            return Err(out_of_range("max_categories", "at least 1", 0));
        }
        check_range(
            "min_leaf_fraction",
            b.min_leaf_fraction,
            (0.0..1.0).contains(&b.min_leaf_fraction),
            "within [0, 1)",
        )?;
        check_range(
            "significance_threshold",
            b.significance_threshold,
            (0.0..=1.0).contains(&b.significance_threshold),
            "within [0, 1]",
        )?;
        check_range(
            "numeric_accuracy",
            b.numeric_accuracy,
            b.numeric_accuracy.is_finite() && b.numeric_accuracy > 0.0,
            "a positive finite number",
        )?;
        check_range(
            "smoothing",
            self.smoothing,
            self.smoothing.is_finite() && self.smoothing > 0.0,
            "a positive finite number",
        )?;
        if b.max_depth > 32 {
            return Err(out_of_range("max_depth", "at most 32", b.max_depth));
        }
        Ok(())
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.binning.max_depth = max_depth;
        self
    }

    pub fn with_min_leaf_fraction(mut self, fraction: f64) -> Self {
        self.binning.min_leaf_fraction = fraction;
        self
    }

    pub fn with_min_leaf_count(mut self, count: usize) -> Self {
        self.binning.min_leaf_count = count;
        self
    }

    pub fn with_significance_threshold(mut self, threshold: f64) -> Self {
        self.binning.significance_threshold = threshold;
        self
    }

    pub fn with_numeric_accuracy(mut self, accuracy: f64) -> Self {
        self.binning.numeric_accuracy = accuracy;
        self
    }

    pub fn with_monotonicity(mut self, constraint: MonotonicityConstraint) -> Self {
        self.binning.monotonicity = constraint;
        self
    }

    pub fn with_missing_rate_threshold(mut self, threshold: f64) -> Self {
        self.validator.missing_rate_threshold = threshold;
        self
    }

    pub fn with_min_distinct_values(mut self, count: usize) -> Self {
        self.validator.min_distinct_values = count;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.validator.strict = strict;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.encoding.fallback = fallback;
        self
    }
}

fn check_range(field: &'static str, value: f64, ok: bool, expected: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(out_of_range(field, expected, value))
    }
}

fn out_of_range(field: &'static str, expected: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        expected,
        value: value.to_string(),
    }
}
