//! Per-feature IV and Gini diagnostics

use serde::{Deserialize, Serialize};

use crate::pipeline::{ColumnKind, FitSummary};

/// Conventional IV strength bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IvStrength {
    Useless,
    Weak,
    Medium,
    Strong,
    /// Too predictive to be plausible; often target leakage
    Suspicious,
}

impl IvStrength {
    pub fn from_iv(iv: f64) -> Self {
        if iv < 0.02 {
            IvStrength::Useless
        } else if iv < 0.1 {
            IvStrength::Weak
        } else if iv < 0.3 {
            IvStrength::Medium
        } else if iv < 0.5 {
            IvStrength::Strong
        } else {
            IvStrength::Suspicious
        }
    }
}

impl std::fmt::Display for IvStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IvStrength::Useless => write!(f, "Useless"),
            IvStrength::Weak => write!(f, "Weak"),
            IvStrength::Medium => write!(f, "Medium"),
            IvStrength::Strong => write!(f, "Strong"),
            IvStrength::Suspicious => write!(f, "Suspicious"),
        }
    }
}

/// Diagnostics row for one fitted feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub feature: String,
    pub kind: ColumnKind,
    pub bins: usize,
    pub iv: f64,
    pub gini: f64,
    pub strength: IvStrength,
    pub missing_rate: f64,
}

/// One row per fitted feature, strongest IV first (ties by name)
pub fn summarize(summary: &FitSummary) -> Vec<FeatureSummary> {
    let mut rows: Vec<FeatureSummary> = summary
        .fitted()
        .map(|f| FeatureSummary {
            feature: f.spec.feature().to_string(),
            kind: f.spec.kind(),
            bins: f.spec.woe_bins().len(),
            iv: f.spec.iv(),
            gini: f.gini,
            strength: IvStrength::from_iv(f.spec.iv()),
            missing_rate: f.verdict.missing_rate,
        })
        .collect();
    rows.sort_by(|a, b| b.iv.total_cmp(&a.iv).then_with(|| a.feature.cmp(&b.feature)));
    rows
}

/// Names of fitted features whose IV falls below `threshold`
pub fn get_low_iv_features(summary: &FitSummary, threshold: f64) -> Vec<String> {
    summary
        .fitted()
        .filter(|f| f.spec.iv() < threshold)
        .map(|f| f.spec.feature().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iv_strength_bands() {
        assert_eq!(IvStrength::from_iv(0.0), IvStrength::Useless);
        assert_eq!(IvStrength::from_iv(0.02), IvStrength::Weak);
        assert_eq!(IvStrength::from_iv(0.15), IvStrength::Medium);
        assert_eq!(IvStrength::from_iv(0.3), IvStrength::Strong);
        assert_eq!(IvStrength::from_iv(2.0), IvStrength::Suspicious);
        assert_eq!(IvStrength::Medium.to_string(), "Medium");
    }
}
