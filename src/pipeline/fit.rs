//! Per-feature fit contract and parallel batch fitting
//!
//! Each feature runs validate → bin → encode in sequence. Features are
//! independent, so a batch is fitted in parallel with rayon and a failure
//! in one feature is recorded without affecting the others.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use super::binning::{Bin, Binner, SupervisedBinner};
use super::column::{FeatureColumn, Target};
use super::config::WoeConfig;
use super::encoder::{WoeEncoder, WoeSpec};
use super::error::{ConfigError, EncodingError, WoeError};
use super::validator::{FeatureValidator, ValidationVerdict};
use crate::utils::progress::{create_progress_bar, finish_with_success, finish_with_warning};

/// Everything produced by fitting one eligible feature
#[derive(Debug, Clone)]
pub struct FittedFeature {
    pub verdict: ValidationVerdict,
    pub bins: Vec<Bin>,
    pub spec: WoeSpec,
    /// Gini of the WoE encoding on the training sample
    pub gini: f64,
}

impl FittedFeature {
    pub fn name(&self) -> &str {
        self.spec.feature()
    }

    pub fn iv(&self) -> f64 {
        self.spec.iv()
    }

    /// Encode a raw column; the spec cleans it the way it was cleaned at fit time
    pub fn transform(&self, column: &FeatureColumn) -> Result<Vec<f64>, EncodingError> {
        encode_feature(column, &self.spec)
    }
}

#[derive(Debug, Clone)]
pub enum FeatureOutcome {
    Fitted(FittedFeature),
    /// Ineligible in lenient mode; the feature is left out of the output
    Excluded(ValidationVerdict),
}

impl FeatureOutcome {
    pub fn fitted(&self) -> Option<&FittedFeature> {
        match self {
            FeatureOutcome::Fitted(f) => Some(f),
            FeatureOutcome::Excluded(_) => None,
        }
    }
}

/// Fit one feature against the target.
///
/// Returns `Excluded` for an ineligible feature unless the validator is
/// strict, in which case the failure surfaces as `ValidationError::Ineligible`.
pub fn fit_feature(column: &FeatureColumn, target: &Target, config: &WoeConfig) -> Result<FeatureOutcome, WoeError> {
    config.validate()?;
    fit_validated_config(column, target, config)
}

fn fit_validated_config(
    column: &FeatureColumn,
    target: &Target,
    config: &WoeConfig,
) -> Result<FeatureOutcome, WoeError> {
    let validator = FeatureValidator::new(config.validator.clone());
    let verdict = validator.fit_validate(column, target)?;
    if !verdict.eligible {
        return Ok(FeatureOutcome::Excluded(verdict));
    }

    let binner = SupervisedBinner::new(config.binning.clone(), config.smoothing);
    let bins = binner.fit(&verdict.cleaned, target)?;

    let mut encoder = WoeEncoder::new(config.encoding.clone(), config.smoothing)
        .with_cleaning(validator.cleaning_rules().clone());
    encoder.fit(&verdict.cleaned, target, &bins)?;
    let spec = encoder.into_spec()?;
    let gini = spec.gini();

    Ok(FeatureOutcome::Fitted(FittedFeature {
        verdict,
        bins,
        spec,
        gini,
    }))
}

/// Encode a raw column with a fitted spec and its recorded cleaning rules
pub fn encode_feature(column: &FeatureColumn, spec: &WoeSpec) -> Result<Vec<f64>, EncodingError> {
    spec.transform(column)
}

/// Result of fitting one feature of a batch
#[derive(Debug, Clone)]
pub struct FeatureResult {
    pub feature: String,
    pub outcome: Result<FeatureOutcome, WoeError>,
}

/// Outcome of a batch fit, in input column order
#[derive(Debug, Clone, Default)]
pub struct FitSummary {
    pub results: Vec<FeatureResult>,
}

impl FitSummary {
    pub fn fitted(&self) -> impl Iterator<Item = &FittedFeature> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().ok().and_then(FeatureOutcome::fitted))
    }

    pub fn excluded(&self) -> impl Iterator<Item = &ValidationVerdict> {
        self.results.iter().filter_map(|r| match &r.outcome {
            Ok(FeatureOutcome::Excluded(verdict)) => Some(verdict),
            _ => None,
        })
    }

    /// Features whose fit raised an error, with the error
    pub fn failed(&self) -> impl Iterator<Item = (&str, &WoeError)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            Err(e) => Some((r.feature.as_str(), e)),
            Ok(_) => None,
        })
    }

    /// Feature name → spec for every fitted feature
    pub fn specs(&self) -> BTreeMap<String, WoeSpec> {
        self.fitted()
            .map(|f| (f.spec.feature().to_string(), f.spec.clone()))
            .collect()
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureResult> {
        self.results.iter().find(|r| r.feature == feature)
    }
}

/// Fit many features against one target in parallel.
///
/// Only an invalid configuration aborts the batch; per-feature errors are
/// recorded in the summary.
pub fn fit_features(
    columns: &[FeatureColumn],
    target: &Target,
    config: &WoeConfig,
    show_progress: bool,
) -> Result<FitSummary, ConfigError> {
    config.validate()?;

    let total = columns.len() as u64;
    let pb = create_progress_bar(total, "Fitting WoE", show_progress);
    let progress_counter = AtomicU64::new(0);

    let results: Vec<FeatureResult> = columns
        .par_iter()
        .map(|column| {
            let outcome = fit_validated_config(column, target, config);

            let count = progress_counter.fetch_add(1, Ordering::Relaxed);
            if count % 10 == 0 || count + 1 == total {
                pb.set_position(count + 1);
            }

            match &outcome {
                Ok(FeatureOutcome::Excluded(verdict)) => {
                    let reasons: Vec<String> = verdict.reasons.iter().map(|r| r.to_string()).collect();
                    tracing::warn!(feature = %column.name, reasons = %reasons.join("; "), "excluded feature");
                }
                Err(e) => tracing::warn!(feature = %column.name, error = %e, "failed to fit feature"),
                Ok(FeatureOutcome::Fitted(_)) => {}
            }

            FeatureResult {
                feature: column.name.clone(),
                outcome,
            }
        })
        .collect();

    let summary = FitSummary { results };
    let fitted = summary.fitted().count();
    let excluded = summary.excluded().count();
    let failed = summary.failed().count();

    let message = format!(
        "Fitted {} of {} features ({} excluded, {} failed)",
        fitted,
        columns.len(),
        excluded,
        failed
    );
    if excluded + failed == 0 {
        finish_with_success(&pb, &message);
    } else {
        finish_with_warning(&pb, &message);
    }
    tracing::info!(fitted, excluded, failed, "batch fit complete");

    Ok(summary)
}
