//! Held-out validation artifact and its error metrics.

use chrono::NaiveDate;
use serde::Serialize;

/// One held-out row: actual vs predicted target, with predictive std.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidationRow {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub train_rows: usize,
    pub rows: Vec<ValidationRow>,
    pub mae: f64,
    pub rmse: f64,
    /// Coefficient of determination; 0 when the actuals have no variance.
    pub r2: f64,
}

impl ValidationReport {
    pub fn from_rows(train_rows: usize, rows: Vec<ValidationRow>) -> Self {
        let n = rows.len() as f64;
        if rows.is_empty() {
            return Self {
                train_rows,
                rows,
                mae: 0.0,
                rmse: 0.0,
                r2: 0.0,
            };
        }

        let mae = rows.iter().map(|r| (r.actual - r.predicted).abs()).sum::<f64>() / n;
        let sse: f64 = rows.iter().map(|r| (r.actual - r.predicted).powi(2)).sum();
        let rmse = (sse / n).sqrt();

        let mean_actual = rows.iter().map(|r| r.actual).sum::<f64>() / n;
        let sst: f64 = rows.iter().map(|r| (r.actual - mean_actual).powi(2)).sum();
        let r2 = if sst > 1e-12 { 1.0 - sse / sst } else { 0.0 };

        Self {
            train_rows,
            rows,
            mae,
            rmse,
            r2,
        }
    }

    /// Share of held-out actuals inside `predicted ± z·std`.
    pub fn coverage(&self, z: f64) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let inside = self
            .rows
            .iter()
            .filter(|r| (r.actual - r.predicted).abs() <= z * r.std)
            .count();
        inside as f64 / self.rows.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, actual: f64, predicted: f64) -> ValidationRow {
        ValidationRow {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            actual,
            predicted,
            std: 1.0,
        }
    }

    #[test]
    fn metrics_match_hand_computation() {
        let report = ValidationReport::from_rows(10, vec![row(1, 1.0, 2.0), row(2, 3.0, 3.0), row(3, 5.0, 2.0)]);
        assert!((report.mae - 4.0 / 3.0).abs() < 1e-12);
        assert!((report.rmse - (10.0f64 / 3.0).sqrt()).abs() < 1e-12);
        // sst = 8, sse = 10
        assert!((report.r2 - (1.0 - 10.0 / 8.0)).abs() < 1e-12);
        assert!((report.coverage(1.0) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_actuals_give_zero_r2() {
        let report = ValidationReport::from_rows(5, vec![row(1, 2.0, 2.5), row(2, 2.0, 1.5)]);
        assert_eq!(report.r2, 0.0);
        assert!((report.mae - 0.5).abs() < 1e-12);
    }
}
