//! Bayesian ridge regression (evidence approximation).
//!
//! Model: `y = Xw + ε`, `w ~ N(0, λ⁻¹ I)`, `ε ~ N(0, α⁻¹)`.
//!
//! The precisions `α` and `λ` are re-estimated by maximising the marginal
//! likelihood (MacKay updates with weak Gamma priors). Working in the
//! eigenbasis of `XᵀX` makes every iteration a diagonal solve.
//!
//! Predictive variance of a row `x` is `xᵀ Σ x + 1/α` where
//! `Σ = (α XᵀX + λ I)⁻¹` is the posterior weight covariance.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::ForecastError;
use crate::models::{Prediction, ProbabilisticRegressor};

const MAX_ITER: usize = 300;
/// Convergence tolerance on the L1 change of the coefficients.
const TOL: f64 = 1e-3;
/// Gamma hyperprior shape/rate for `α` and `λ`.
const PRIOR: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct BayesianRidge {
    coef: DVector<f64>,
    intercept: f64,
    x_mean: DVector<f64>,
    sigma: DMatrix<f64>,
    /// Noise precision.
    alpha: f64,
}

impl BayesianRidge {
    pub fn fit(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<Self, ForecastError> {
        let n = x.nrows();
        let p = x.ncols();
        if n == 0 {
            return Err(ForecastError::Numerical("no rows to fit".to_string()));
        }
        let nf = n as f64;

        let x_mean = DVector::from_iterator(p, x.column_iter().map(|c| c.sum() / nf));
        let y_mean = y.sum() / nf;
        let mut xc = x.clone();
        for (j, mut col) in xc.column_iter_mut().enumerate() {
            let m = x_mean[j];
            col.apply(|v| *v -= m);
        }
        let yc = y.map(|v| v - y_mean);

        let xtx = xc.transpose() * &xc;
        let eig = SymmetricEigen::new(xtx);
        let evals: Vec<f64> = eig.eigenvalues.iter().map(|e| e.max(0.0)).collect();
        let evecs = eig.eigenvectors;
        let vty = evecs.transpose() * (xc.transpose() * &yc);

        let y_var = yc.norm_squared() / nf;
        let mut alpha = 1.0 / (y_var + f64::EPSILON);
        let mut lambda = 1.0;
        let mut coef_old: Option<DVector<f64>> = None;

        for _ in 0..MAX_ITER {
            let coef = posterior_mean(&evecs, &vty, &evals, alpha, lambda);
            let rss = (&yc - &xc * &coef).norm_squared();
            let gamma: f64 = evals.iter().map(|e| alpha * e / (lambda + alpha * e)).sum();

            lambda = (gamma + 2.0 * PRIOR) / (coef.norm_squared() + 2.0 * PRIOR);
            alpha = (nf - gamma + 2.0 * PRIOR) / (rss + 2.0 * PRIOR);

            let converged = coef_old
                .as_ref()
                .is_some_and(|old| (old - &coef).abs().sum() < TOL);
            coef_old = Some(coef);
            if converged {
                break;
            }
        }

        if !(alpha.is_finite() && alpha > 0.0 && lambda.is_finite() && lambda > 0.0) {
            return Err(ForecastError::Numerical(format!(
                "degenerate precisions (alpha={alpha}, lambda={lambda})"
            )));
        }

        let coef = posterior_mean(&evecs, &vty, &evals, alpha, lambda);
        let inv_diag = DVector::from_iterator(p, evals.iter().map(|e| 1.0 / (alpha * e + lambda)));
        let sigma = &evecs * DMatrix::from_diagonal(&inv_diag) * evecs.transpose();
        let intercept = y_mean - x_mean.dot(&coef);

        if !(coef.iter().all(|c| c.is_finite()) && intercept.is_finite()) {
            return Err(ForecastError::Numerical("non-finite coefficients".to_string()));
        }

        Ok(Self {
            coef,
            intercept,
            x_mean,
            sigma,
            alpha,
        })
    }

    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coef
    }
}

impl ProbabilisticRegressor for BayesianRidge {
    fn predict_row(&self, row: &[f64]) -> Result<Prediction, ForecastError> {
        if row.len() != self.coef.len() {
            return Err(ForecastError::Numerical(format!(
                "row has {} features, model expects {}",
                row.len(),
                self.coef.len()
            )));
        }
        let x = DVector::from_column_slice(row);
        let mean = x.dot(&self.coef) + self.intercept;
        let centred = &x - &self.x_mean;
        let var = centred.dot(&(&self.sigma * &centred)) + 1.0 / self.alpha;
        Ok(Prediction {
            mean,
            std: var.max(0.0).sqrt(),
        })
    }
}

/// `w = V diag(1 / (e + λ/α)) Vᵀ Xᵀy`, with `vty = Vᵀ Xᵀy` precomputed.
fn posterior_mean(evecs: &DMatrix<f64>, vty: &DVector<f64>, evals: &[f64], alpha: f64, lambda: f64) -> DVector<f64> {
    let ratio = lambda / alpha;
    let scaled = DVector::from_iterator(vty.len(), vty.iter().zip(evals).map(|(v, e)| v / (e + ratio)));
    evecs * scaled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_noise_free_linear_relation() {
        // y = 2 + 3a - b
        let x = DMatrix::from_fn(30, 2, |i, j| if j == 0 { i as f64 * 0.1 } else { ((i * 7) % 11) as f64 * 0.2 });
        let y = DVector::from_fn(30, |i, _| 2.0 + 3.0 * x[(i, 0)] - x[(i, 1)]);
        let model = BayesianRidge::fit(&x, &y).unwrap();

        assert!((model.coefficients()[0] - 3.0).abs() < 1e-3);
        assert!((model.coefficients()[1] + 1.0).abs() < 1e-3);

        let p = model.predict_row(&[5.0, 1.0]).unwrap();
        assert!((p.mean - 16.0).abs() < 1e-2);
        assert!(p.std < 0.1);
    }

    #[test]
    fn noisier_data_gives_wider_intervals() {
        let x = DMatrix::from_fn(40, 1, |i, _| i as f64 / 40.0);
        let clean = DVector::from_fn(40, |i, _| x[(i, 0)]);
        let noisy = DVector::from_fn(40, |i, _| x[(i, 0)] + if i % 2 == 0 { 0.3 } else { -0.3 });

        let a = BayesianRidge::fit(&x, &clean).unwrap().predict_row(&[0.5]).unwrap();
        let b = BayesianRidge::fit(&x, &noisy).unwrap().predict_row(&[0.5]).unwrap();
        assert!(b.std > a.std);
        assert!((b.mean - 0.5).abs() < 0.1);
    }

    #[test]
    fn constant_target_predicts_the_constant() {
        let x = DMatrix::from_fn(12, 2, |i, j| (i + j) as f64);
        let y = DVector::from_element(12, 4.0);
        let model = BayesianRidge::fit(&x, &y).unwrap();
        let p = model.predict_row(&[3.0, 4.0]).unwrap();
        assert!((p.mean - 4.0).abs() < 1e-6);
    }
}
