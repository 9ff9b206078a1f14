//! Numeric kernels.
//!
//! - summary statistics, correlation, moving average (`stats`)
//! - least-squares solve (`ols`)

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
