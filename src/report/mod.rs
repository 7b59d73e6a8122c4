//! Report module - diagnostics and spec export

pub mod spec_export;
pub mod summary;

pub use spec_export::*;
pub use summary::*;
