//! Feature eligibility checks and value cleaning
//!
//! Missing values are never dropped: they are normalised to
//! [`FeatureValue::Missing`] so that row alignment with the target and with
//! sibling features is preserved, and are routed to the missing bin later.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::column::{ColumnKind, FeatureColumn, FeatureValue, Target};
use super::config::{ValidatorConfig, DEFAULT_NUMERIC_ACCURACY};
use super::error::ValidationError;

/// Maximum number of offending values listed in an out-of-domain message
const MAX_REPORTED_VALUES: usize = 5;

/// Why a feature failed eligibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ReasonCode {
    MissingRateExceeded { rate: f64, threshold: f64 },
    /// Constant feature: at most one distinct non-missing value
    SingleValued,
    TooFewDistinctValues { found: usize, required: usize },
    UnsupportedType { kind: ColumnKind },
    /// Too many distinct strings to be a categorical feature
    TooManyCategories { categories: usize, max: usize },
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasonCode::MissingRateExceeded { rate, threshold } => write!(
                f,
                "missing rate {:.1}% exceeds threshold {:.1}%",
                rate * 100.0,
                threshold * 100.0
            ),
            ReasonCode::SingleValued => write!(f, "constant feature (single distinct value)"),
            ReasonCode::TooFewDistinctValues { found, required } => {
                write!(f, "{} distinct values, at least {} required", found, required)
            }
            ReasonCode::UnsupportedType { kind } => write!(f, "unsupported column type: {}", kind),
            ReasonCode::TooManyCategories { categories, max } => write!(
                f,
                "{} distinct strings exceeds the categorical limit of {} (free text?)",
                categories, max
            ),
        }
    }
}

/// Value domain observed while fitting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureDomain {
    /// Observed (min, max) of the numeric part
    pub numeric_range: Option<(f64, f64)>,
    /// Observed categorical indicators
    pub categories: BTreeSet<String>,
}

/// Result of validating one feature
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationVerdict {
    pub feature: String,
    pub eligible: bool,
    pub reasons: Vec<ReasonCode>,
    pub kind: ColumnKind,
    pub missing_rate: f64,
    pub distinct_values: usize,
    pub domain: FeatureDomain,
    /// Cleaned column, same length and row order as the input
    pub cleaned: FeatureColumn,
}

/// Value normalisation applied before binning and before every lookup
///
/// Stored in each fitted spec so that serving cleans raw values exactly
/// as they were cleaned at fit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningRules {
    /// Strings (compared after trimming) that denote a missing value
    pub missing_markers: Vec<String>,
    /// Strings that parse as finite numbers become numeric values
    pub coerce_numeric_strings: bool,
}

impl Default for CleaningRules {
    fn default() -> Self {
        Self::from(&ValidatorConfig::default())
    }
}

impl From<&ValidatorConfig> for CleaningRules {
    fn from(config: &ValidatorConfig) -> Self {
        Self {
            missing_markers: config.missing_markers.clone(),
            coerce_numeric_strings: config.coerce_numeric_strings,
        }
    }
}

impl CleaningRules {
    /// Missing markers and non-finite numbers become `Missing`; numeric
    /// strings become numbers when coercion is enabled. Idempotent.
    pub fn clean(&self, value: &FeatureValue) -> FeatureValue {
        match value {
            FeatureValue::Missing => FeatureValue::Missing,
            FeatureValue::Numeric(v) if !v.is_finite() => FeatureValue::Missing,
            FeatureValue::Numeric(v) => FeatureValue::Numeric(*v),
            FeatureValue::Category(s) => {
                let trimmed = s.trim();
                if self.missing_markers.iter().any(|m| m == trimmed) {
                    return FeatureValue::Missing;
                }
                if self.coerce_numeric_strings {
                    if let Ok(v) = trimmed.parse::<f64>() {
                        if v.is_finite() {
                            return FeatureValue::Numeric(v);
                        }
                    }
                }
                FeatureValue::Category(s.clone())
            }
        }
    }

    pub fn clean_column(&self, column: &FeatureColumn) -> FeatureColumn {
        FeatureColumn {
            name: column.name.clone(),
            values: column.values.iter().map(|v| self.clean(v)).collect(),
        }
    }
}

/// Gatekeeper that decides which columns are eligible for binning
#[derive(Debug, Clone)]
pub struct FeatureValidator {
    config: ValidatorConfig,
    rules: CleaningRules,
}

impl Default for FeatureValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl FeatureValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        let rules = CleaningRules::from(&config);
        Self { config, rules }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn cleaning_rules(&self) -> &CleaningRules {
        &self.rules
    }

    /// Validate a feature against its aligned target.
    ///
    /// In strict mode an ineligible feature is an error; otherwise the failing
    /// verdict is returned and the caller decides whether to exclude it.
    pub fn fit_validate(
        &self,
        column: &FeatureColumn,
        target: &Target,
    ) -> Result<ValidationVerdict, ValidationError> {
        if column.len() != target.len() {
            return Err(ValidationError::LengthMismatch {
                feature: column.name.clone(),
                column_len: column.len(),
                target_len: target.len(),
            });
        }

        let cleaned = self.transform(column);
        let kind = cleaned.kind();
        let missing_rate = if cleaned.is_empty() {
            1.0
        } else {
            cleaned.missing_count() as f64 / cleaned.len() as f64
        };

        let domain = observed_domain(&cleaned);
        let distinct_values = distinct_numeric_count(&cleaned) + domain.categories.len();

        let mut reasons = Vec::new();
        if missing_rate > self.config.missing_rate_threshold {
            reasons.push(ReasonCode::MissingRateExceeded {
                rate: missing_rate,
                threshold: self.config.missing_rate_threshold,
            });
        }
        if distinct_values <= 1 {
            reasons.push(ReasonCode::SingleValued);
        } else if distinct_values < self.config.min_distinct_values {
            reasons.push(ReasonCode::TooFewDistinctValues {
                found: distinct_values,
                required: self.config.min_distinct_values,
            });
        }
        if !self.config.accepted_kinds.contains(&kind) {
            reasons.push(ReasonCode::UnsupportedType { kind });
        }
        if domain.categories.len() > self.config.max_categories {
            reasons.push(ReasonCode::TooManyCategories {
                categories: domain.categories.len(),
                max: self.config.max_categories,
            });
        }

        let verdict = ValidationVerdict {
            feature: column.name.clone(),
            eligible: reasons.is_empty(),
            reasons,
            kind,
            missing_rate,
            distinct_values,
            domain,
            cleaned,
        };

        tracing::debug!(
            feature = %verdict.feature,
            eligible = verdict.eligible,
            kind = %verdict.kind,
            missing_rate = verdict.missing_rate,
            distinct = verdict.distinct_values,
            "validated feature"
        );

        if self.config.strict && !verdict.eligible {
            return Err(ValidationError::ineligible(&verdict));
        }
        Ok(verdict)
    }

    /// Clean a column: missing markers and non-finite numbers become
    /// `Missing`, numeric strings become numbers when coercion is enabled.
    /// Applying it twice gives the same result as applying it once.
    pub fn transform(&self, column: &FeatureColumn) -> FeatureColumn {
        self.rules.clean_column(column)
    }

    /// Report serve-time values that fall outside a fitted domain.
    ///
    /// Numeric values may exceed the fitted range by the default numeric
    /// accuracy before they are reported.
    pub fn check_domain(
        &self,
        column: &FeatureColumn,
        domain: &FeatureDomain,
    ) -> Result<(), ValidationError> {
        let cleaned = self.transform(column);
        let mut below = 0usize;
        let mut above = 0usize;
        let mut unseen: BTreeSet<&str> = BTreeSet::new();

        for value in &cleaned.values {
            match value {
                FeatureValue::Numeric(v) => match domain.numeric_range {
                    Some((min, max)) => {
                        if min - v > DEFAULT_NUMERIC_ACCURACY {
                            below += 1;
                        } else if v - max > DEFAULT_NUMERIC_ACCURACY {
                            above += 1;
                        }
                    }
                    None => above += 1,
                },
                FeatureValue::Category(c) => {
                    if !domain.categories.contains(c) {
                        unseen.insert(c.as_str());
                    }
                }
                FeatureValue::Missing => {}
            }
        }

        let mut problems = Vec::new();
        match domain.numeric_range {
            Some((min, max)) => {
                if below > 0 {
                    problems.push(format!("{} value(s) below the minimum {}", below, min));
                }
                if above > 0 {
                    problems.push(format!("{} value(s) above the maximum {}", above, max));
                }
            }
            None if above > 0 => {
                problems.push(format!("{} numeric value(s) but no numeric range was fitted", above));
            }
            None => {}
        }
        if !unseen.is_empty() {
            let listed: Vec<&str> = unseen.iter().take(MAX_REPORTED_VALUES).copied().collect();
            problems.push(format!(
                "{} unrecognised categorical value(s): {:?}",
                unseen.len(),
                listed
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::OutOfDomain {
                feature: column.name.clone(),
                detail: problems.join("; "),
            })
        }
    }
}

fn observed_domain(column: &FeatureColumn) -> FeatureDomain {
    let mut numeric_range: Option<(f64, f64)> = None;
    let mut categories = BTreeSet::new();

    for value in &column.values {
        match value {
            FeatureValue::Numeric(v) => {
                numeric_range = Some(match numeric_range {
                    Some((lo, hi)) => (lo.min(*v), hi.max(*v)),
                    None => (*v, *v),
                });
            }
            FeatureValue::Category(c) => {
                categories.insert(c.clone());
            }
            FeatureValue::Missing => {}
        }
    }

    FeatureDomain {
        numeric_range,
        categories,
    }
}

fn distinct_numeric_count(column: &FeatureColumn) -> usize {
    let mut values: Vec<f64> = column
        .values
        .iter()
        .filter_map(|v| match v {
            FeatureValue::Numeric(x) => Some(*x),
            _ => None,
        })
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    values.len()
}
