//! Export and import of fitted WoE specs

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::summary::{summarize, FeatureSummary};
use crate::pipeline::{FitSummary, WoeConfig, WoeSpec};

/// Metadata about the fitting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Timestamp of the export (ISO 8601 format)
    pub timestamp: String,
    /// Crate version that produced the specs
    pub woebin_version: String,
    /// Configuration the specs were fitted with
    pub config: WoeConfig,
}

/// A failed or excluded feature and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFeature {
    pub feature: String,
    pub reason: String,
}

/// Everything needed to redeploy a fitted batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecBundle {
    pub metadata: ExportMetadata,
    pub summary: Vec<FeatureSummary>,
    #[serde(default)]
    pub skipped: Vec<SkippedFeature>,
    pub specs: BTreeMap<String, WoeSpec>,
}

impl SpecBundle {
    pub fn from_summary(summary: &FitSummary, config: &WoeConfig) -> Self {
        let mut skipped: Vec<SkippedFeature> = summary
            .excluded()
            .map(|verdict| SkippedFeature {
                feature: verdict.feature.clone(),
                reason: verdict
                    .reasons
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            })
            .collect();
        skipped.extend(summary.failed().map(|(feature, err)| SkippedFeature {
            feature: feature.to_string(),
            reason: err.to_string(),
        }));

        Self {
            metadata: ExportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                woebin_version: env!("CARGO_PKG_VERSION").to_string(),
                config: config.clone(),
            },
            summary: summarize(summary),
            skipped,
            specs: summary.specs(),
        }
    }

    /// Parse a bundle and check every spec in it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let bundle: SpecBundle = serde_json::from_str(json).context("Failed to parse WoE spec bundle")?;
        for (name, spec) in &bundle.specs {
            spec.validate()
                .with_context(|| format!("Invalid spec for feature '{}'", name))?;
        }
        Ok(bundle)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize WoE spec bundle to JSON")
    }
}

/// Write the fitted specs of a batch to a JSON file
pub fn export_specs(summary: &FitSummary, config: &WoeConfig, output_path: &Path) -> Result<SpecBundle> {
    let bundle = SpecBundle::from_summary(summary, config);
    write_bundle(&bundle, output_path)?;
    Ok(bundle)
}

pub fn write_bundle(bundle: &SpecBundle, output_path: &Path) -> Result<()> {
    let json = bundle.to_json_string()?;
    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write WoE specs to {}", output_path.display()))?;
    Ok(())
}

pub fn read_bundle(path: &Path) -> Result<SpecBundle> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read WoE specs from {}", path.display()))?;
    SpecBundle::from_json_str(&json).with_context(|| format!("Invalid WoE spec file {}", path.display()))
}
