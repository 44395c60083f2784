//! Mathematical utilities: descriptive statistics, correlation and scaling.

pub mod scaler;
pub mod stats;

pub use scaler::*;
pub use stats::*;
