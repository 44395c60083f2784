//! Probabilistic regressors used by the forecaster.
//!
//! Every model returns a predictive mean and standard deviation per row so
//! the forecaster can turn them into bounds without knowing which model ran.

pub mod bayes_ridge;
pub mod gp;
pub mod model;

pub use bayes_ridge::BayesianRidge;
pub use gp::{GaussianProcess, GpHyper};
pub use model::*;
