//! Pipeline module - validation, binning and WoE encoding

pub mod binning;
pub mod column;
pub mod config;
pub mod encoder;
pub mod error;
pub mod fit;
pub mod frame;
pub mod monotonicity;
pub mod stats;
pub mod validator;

pub use binning::{Bin, Binner, PreSpecifiedBinner, SupervisedBinner};
pub use column::*;
pub use config::*;
pub use encoder::*;
pub use error::*;
pub use fit::*;
pub use frame::*;
pub use monotonicity::MonotonicityConstraint;
pub use validator::*;
