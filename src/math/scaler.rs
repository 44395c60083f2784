//! Column standardisation (zero mean, unit variance).
//!
//! Statistics are always fitted on the rows a model trains on; transforming
//! held-out or synthetic rows reuses those statistics unchanged.

use nalgebra::{DMatrix, DVector};

/// Columns with a standard deviation below this are only centred.
const STD_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit per-column mean and (population) standard deviation.
    ///
    /// Returns `None` for a matrix without rows.
    pub fn fit(x: &DMatrix<f64>) -> Option<Self> {
        if x.nrows() == 0 {
            return None;
        }
        let n = x.nrows() as f64;
        let mut means = Vec::with_capacity(x.ncols());
        let mut scales = Vec::with_capacity(x.ncols());
        for col in x.column_iter() {
            let m = col.sum() / n;
            let var = col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            means.push(m);
            scales.push(scale_from_var(var));
        }
        Some(Self { means, scales })
    }

    /// Fit a single-column scaler (used for the target).
    pub fn fit_vector(y: &DVector<f64>) -> Option<Self> {
        Self::fit(&DMatrix::from_column_slice(y.len(), 1, y.as_slice()))
    }

    pub fn transform(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = x.clone();
        for (j, mut col) in out.column_iter_mut().enumerate() {
            let (m, s) = (self.means[j], self.scales[j]);
            col.apply(|v| *v = (*v - m) / s);
        }
        out
    }

    pub fn transform_vector(&self, y: &DVector<f64>) -> DVector<f64> {
        y.map(|v| (v - self.means[0]) / self.scales[0])
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Map a standardised value of column `col` back to original units.
    pub fn inverse_value(&self, col: usize, value: f64) -> f64 {
        value * self.scales[col] + self.means[col]
    }

    /// Map a standardised spread (std dev) of column `col` back to original units.
    pub fn inverse_spread(&self, col: usize, spread: f64) -> f64 {
        spread * self.scales[col]
    }
}

fn scale_from_var(var: f64) -> f64 {
    let s = var.sqrt();
    if s.is_finite() && s > STD_EPS { s } else { 1.0 }
}
