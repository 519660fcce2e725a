//! Mathematical utilities: least squares and series statistics.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
