//! Error taxonomy for validation, binning and encoding
//!
//! Errors are local to a single feature. A failure while fitting one feature
//! never touches the specs already fitted for its siblings.

use thiserror::Error;

use super::validator::{ReasonCode, ValidationVerdict};

/// A feature was rejected by the validator, or its inputs are malformed.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// The feature failed one or more eligibility rules (strict mode only)
    #[error("feature '{feature}' is not eligible for binning: {}", format_reasons(.reasons))]
    Ineligible {
        feature: String,
        reasons: Vec<ReasonCode>,
    },

    /// Feature column and target are not positionally aligned
    #[error("feature '{feature}' has {column_len} values but the target has {target_len}")]
    LengthMismatch {
        feature: String,
        column_len: usize,
        target_len: usize,
    },

    /// Target contains something other than 0/1
    #[error("target must be binary (0/1): {reason}")]
    InvalidTarget { reason: String },

    /// Serve-time values fall outside the domain observed during fit
    #[error("feature '{feature}' has values outside its fitted domain: {detail}")]
    OutOfDomain { feature: String, detail: String },
}

/// Split search or merging could not produce bins for a feature.
#[derive(Debug, Clone, Error)]
pub enum BinningError {
    #[error("feature '{feature}' has {observations} observation(s); at least 2 are required")]
    InsufficientData {
        feature: String,
        observations: usize,
    },

    #[error("feature '{feature}' has no variation in target (all 0s or all 1s)")]
    DegenerateTarget { feature: String },

    #[error("feature '{feature}' has no non-missing values to bin")]
    NoBinnableValues { feature: String },

    #[error("feature '{feature}' has {column_len} values but the target has {target_len}")]
    LengthMismatch {
        feature: String,
        column_len: usize,
        target_len: usize,
    },
}

/// Misuse of the encoder or an internally inconsistent spec.
#[derive(Debug, Clone, Error)]
pub enum EncodingError {
    #[error("WoE encoder has not been fitted; call fit() or load a spec first")]
    NotFitted,

    #[error("spec for feature '{feature}' does not cover its value domain: {detail}")]
    DomainMismatch { feature: String, detail: String },

    #[error("feature '{feature}' has {column_len} values but the target has {target_len}")]
    LengthMismatch {
        feature: String,
        column_len: usize,
        target_len: usize,
    },

    #[error("target has no events or no non-events for feature '{feature}'")]
    DegenerateTarget { feature: String },

    #[error("failed to (de)serialize WoE spec: {0}")]
    Serialization(String),
}

/// Invalid configuration values.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("'{field}' must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Umbrella error for the per-feature fit contract.
#[derive(Debug, Clone, Error)]
pub enum WoeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Binning(#[from] BinningError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ValidationError {
    pub(crate) fn ineligible(verdict: &ValidationVerdict) -> Self {
        ValidationError::Ineligible {
            feature: verdict.feature.clone(),
            reasons: verdict.reasons.clone(),
        }
    }
}

fn format_reasons(reasons: &[ReasonCode]) -> String {
    reasons
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
