//! Gaussian-process regression with a `amplitude * RBF(ℓ) + noise` kernel.
//!
//! Hyperparameters are chosen by maximising the log marginal likelihood over
//! a fixed log-spaced grid. Every candidate reuses the same pairwise squared
//! distance matrix, so the cost is one Cholesky factorisation per candidate.
//!
//! Training is capped at the most recent `max_rows` rows to bound the
//! cubic factorisation cost on long histories.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use tracing::debug;

use crate::error::ForecastError;
use crate::models::{Prediction, ProbabilisticRegressor};

const LENGTH_SCALES: [f64; 7] = [0.1, 0.2154, 0.4642, 1.0, 2.154, 4.642, 10.0];
const NOISE_LEVELS: [f64; 4] = [1e-5, 1e-3, 1e-1, 1.0];
const AMPLITUDES: [f64; 3] = [0.5, 1.0, 2.0];
/// Added to the diagonal for numerical stability.
const JITTER: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpHyper {
    pub amplitude: f64,
    pub length_scale: f64,
    pub noise: f64,
}

pub struct GaussianProcess {
    x_train: DMatrix<f64>,
    y_mean: f64,
    /// `K⁻¹ (y - ȳ)`.
    weights: DVector<f64>,
    /// Lower Cholesky factor of the training covariance.
    l: DMatrix<f64>,
    hyper: GpHyper,
    log_marginal_likelihood: f64,
}

impl GaussianProcess {
    pub fn fit(x: &DMatrix<f64>, y: &DVector<f64>, max_rows: usize) -> Result<Self, ForecastError> {
        let total = x.nrows();
        let keep = total.min(max_rows.max(1));
        let skip = total - keep;
        let x_train = x.rows(skip, keep).into_owned();
        let y_train = y.rows(skip, keep).into_owned();
        if keep < total {
            debug!(total, keep, "gaussian process trains on the most recent rows");
        }

        let y_mean = y_train.mean();
        let yc = y_train.map(|v| v - y_mean);
        let dist = squared_distances(&x_train, &x_train);

        let mut best: Option<(f64, GpHyper, Cholesky<f64, Dyn>, DVector<f64>)> = None;
        for &amplitude in &AMPLITUDES {
            for &length_scale in &LENGTH_SCALES {
                for &noise in &NOISE_LEVELS {
                    let hyper = GpHyper {
                        amplitude,
                        length_scale,
                        noise,
                    };
                    let mut k = kernel(&dist, hyper);
                    for i in 0..keep {
                        k[(i, i)] += noise + JITTER;
                    }
                    let Some(chol) = Cholesky::new(k) else {
                        continue;
                    };
                    let weights = chol.solve(&yc);
                    let log_det: f64 = chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum();
                    let lml = -0.5 * yc.dot(&weights)
                        - log_det
                        - 0.5 * keep as f64 * (2.0 * std::f64::consts::PI).ln();
                    if !lml.is_finite() {
                        continue;
                    }
                    if best.as_ref().is_none_or(|(b, ..)| lml > *b) {
                        best = Some((lml, hyper, chol, weights));
                    }
                }
            }
        }

        let Some((lml, hyper, chol, weights)) = best else {
            return Err(ForecastError::Numerical(
                "no kernel candidate produced a positive-definite covariance".to_string(),
            ));
        };
        debug!(
            amplitude = hyper.amplitude,
            length_scale = hyper.length_scale,
            noise = hyper.noise,
            lml,
            "gaussian process hyperparameters"
        );

        Ok(Self {
            x_train,
            y_mean,
            weights,
            l: chol.l(),
            hyper,
            log_marginal_likelihood: lml,
        })
    }

    pub fn hyperparameters(&self) -> GpHyper {
        self.hyper
    }

    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_marginal_likelihood
    }
}

impl ProbabilisticRegressor for GaussianProcess {
    fn predict_row(&self, row: &[f64]) -> Result<Prediction, ForecastError> {
        if row.len() != self.x_train.ncols() {
            return Err(ForecastError::Numerical(format!(
                "row has {} features, model expects {}",
                row.len(),
                self.x_train.ncols()
            )));
        }
        let query = DMatrix::from_row_slice(1, row.len(), row);
        let k_star = kernel(&squared_distances(&self.x_train, &query), self.hyper).column(0).into_owned();

        let mean = self.y_mean + k_star.dot(&self.weights);
        let v = self
            .l
            .solve_lower_triangular(&k_star)
            .ok_or_else(|| ForecastError::Numerical("singular Cholesky factor".to_string()))?;
        let var = self.hyper.amplitude + self.hyper.noise - v.norm_squared();
        Ok(Prediction {
            mean,
            std: var.max(0.0).sqrt(),
        })
    }
}

/// `D[i, j] = |a_i - b_j|²` for the rows of `a` and `b`.
fn squared_distances(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), b.nrows(), |i, j| {
        a.row(i)
            .iter()
            .zip(b.row(j).iter())
            .map(|(p, q)| (p - q) * (p - q))
            .sum()
    })
}

fn kernel(dist: &DMatrix<f64>, hyper: GpHyper) -> DMatrix<f64> {
    let denom = 2.0 * hyper.length_scale * hyper.length_scale;
    dist.map(|d| hyper.amplitude * (-d / denom).exp())
}
