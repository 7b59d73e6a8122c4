//! woebin: supervised binning and Weight-of-Evidence encoding
//!
//! Validates feature columns against a binary target, derives bins with a
//! Gini split search and chi-squared merging, and produces deployable
//! WoE specs with Information Value and Gini diagnostics.

pub mod pipeline;
pub mod report;
pub mod utils;
