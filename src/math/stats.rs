//! Descriptive statistics and correlation helpers.
//!
//! Undefined results (empty input, zero variance) are reported as `None`
//! rather than NaN so callers must decide on a default explicitly.

/// Variance below this is treated as zero (constant series).
const VAR_EPS: f64 = 1e-12;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (denominator `n`).
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (denominator `n - 1`).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some((ss / (values.len() as f64 - 1.0)).sqrt())
}

/// Pearson correlation of two equally long slices.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);

    let x_mean = mean(x)?;
    let y_mean = mean(y)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - x_mean;
        let dy = b - y_mean;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let scale_x = var_x / n as f64;
    let scale_y = var_y / n as f64;
    if scale_x < VAR_EPS || scale_y < VAR_EPS {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    Some(r.clamp(-1.0, 1.0))
}

/// Correlation between `target(t)` and `driver(t - lag)` over all `t` where both exist.
pub fn lagged_correlation(target: &[f64], driver: &[f64], lag: usize) -> Option<f64> {
    let n = target.len().min(driver.len());
    if lag >= n {
        return None;
    }
    pearson(&target[lag..n], &driver[..n - lag])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_of_linear_relation_is_one() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        let r = pearson(&x, &y).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let neg: Vec<f64> = y.iter().map(|v| -v).collect();
        assert!((pearson(&x, &neg).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_of_constant_series_is_undefined() {
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), None);
        assert_eq!(pearson(&[1.0], &[2.0]), None);
    }

    #[test]
    fn lagged_correlation_aligns_target_with_past_driver() {
        let driver = [0.0, 1.0, 0.0, 2.0, 0.0, 3.0, 1.0, 0.0];
        let mut target = vec![9.0, 9.0];
        target.extend_from_slice(&driver[..driver.len() - 2]);

        let r2 = lagged_correlation(&target, &driver, 2).unwrap();
        assert!((r2 - 1.0).abs() < 1e-12);
        assert!(lagged_correlation(&target, &driver, 8).is_none());
    }

    #[test]
    fn sample_std_known_value() {
        let s = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((s - 2.138089935).abs() < 1e-6);
        assert!(sample_std(&[1.0]).is_none());
    }
}
