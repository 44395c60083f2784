//! ProbabilisticRegressor interface and dispatch by `RegressorKind`.
//!
//! The forecaster relies on two primitive operations:
//! - fit on a standardised design matrix and target vector
//! - predict a mean and a standard deviation per row
//!
//! Both regressors work in standardised space; callers convert back.

use nalgebra::{DMatrix, DVector};

use crate::domain::RegressorKind;
use crate::error::ForecastError;
use crate::models::{BayesianRidge, GaussianProcess};

/// Predictive mean and standard deviation for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub mean: f64,
    pub std: f64,
}

/// A fitted model that can score new rows with uncertainty.
pub trait ProbabilisticRegressor {
    fn predict_row(&self, row: &[f64]) -> Result<Prediction, ForecastError>;

    fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<Prediction>, ForecastError> {
        x.row_iter()
            .map(|r| {
                let row: Vec<f64> = r.iter().copied().collect();
                self.predict_row(&row)
            })
            .collect()
    }
}

/// Fit the configured regressor.
pub fn fit_regressor(
    kind: RegressorKind,
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    gp_max_rows: usize,
) -> Result<Box<dyn ProbabilisticRegressor>, ForecastError> {
    if x.nrows() != y.len() {
        return Err(ForecastError::Numerical(format!(
            "design has {} rows but target has {}",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(ForecastError::Numerical("no rows to fit".to_string()));
    }
    match kind {
        RegressorKind::BayesRidge => Ok(Box::new(BayesianRidge::fit(x, y)?)),
        RegressorKind::Gp => Ok(Box::new(GaussianProcess::fit(x, y, gp_max_rows)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_shapes_are_rejected() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let y = DVector::from_vec(vec![1.0]);
        let err = fit_regressor(RegressorKind::BayesRidge, &x, &y, 100).err().unwrap();
        assert!(matches!(err, ForecastError::Numerical(_)));
    }

    #[test]
    fn both_kinds_fit_and_predict_finite_values() {
        let x = DMatrix::from_fn(20, 2, |i, j| (i as f64 / 10.0) - 1.0 + j as f64 * 0.1 * (i % 3) as f64);
        let y = DVector::from_fn(20, |i, _| (i as f64 / 10.0) - 1.0);
        for kind in [RegressorKind::BayesRidge, RegressorKind::Gp] {
            let model = fit_regressor(kind, &x, &y, 100).unwrap();
            for p in model.predict(&x).unwrap() {
                assert!(p.mean.is_finite());
                assert!(p.std.is_finite() && p.std >= 0.0);
            }
        }
    }
}
