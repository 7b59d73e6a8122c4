//! Utility helpers

pub mod progress;
