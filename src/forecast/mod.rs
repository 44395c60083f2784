//! Forecaster: chronological validation, final fit and recursive projection.
//!
//! Features and target are standardised with statistics from the rows each
//! fit trains on. The projection works on an append-only history of
//! observations: every future step appends one synthetic record, rebuilds its
//! features from the history with `features::build_row`, predicts, and writes
//! the prediction back into that record so later rolling means see it.

pub mod validation;

use chrono::{Duration, NaiveDate};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{
    Feature, FeatureConfig, FeatureRow, FeatureTable, Field, ForecastConfig, ForecastPoint, Observation, RegressorKind,
};
use crate::error::ForecastError;
use crate::features::build_row;
use crate::math::StandardScaler;
use crate::models::{Prediction, ProbabilisticRegressor, fit_regressor};
use crate::unify::{PER_POPULATION, incidence_per_100k};

pub use validation::{ValidationReport, ValidationRow};

/// Two-sided ≈95% Gaussian interval.
pub const INTERVAL_Z: f64 = 1.96;

#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    /// `None` when the training split was too small to validate.
    pub validation: Option<ValidationReport>,
    pub regressor: RegressorKind,
    /// Features actually used, in configured order.
    pub features: Vec<Feature>,
    pub training_rows: usize,
}

/// A regressor plus the scalers fitted on its training rows.
struct ScaledModel {
    x_scaler: StandardScaler,
    y_scaler: StandardScaler,
    model: Box<dyn ProbabilisticRegressor>,
}

impl ScaledModel {
    fn fit(x: &DMatrix<f64>, y: &DVector<f64>, config: &ForecastConfig) -> Result<Self, ForecastError> {
        let x_scaler = StandardScaler::fit(x).ok_or_else(|| ForecastError::Numerical("empty design".to_string()))?;
        let y_scaler =
            StandardScaler::fit_vector(y).ok_or_else(|| ForecastError::Numerical("empty target".to_string()))?;
        let model = fit_regressor(
            config.regressor,
            &x_scaler.transform(x),
            &y_scaler.transform_vector(y),
            config.gp_max_train_rows,
        )?;
        Ok(Self {
            x_scaler,
            y_scaler,
            model,
        })
    }

    /// Predict in original units.
    fn predict(&self, row: &[f64]) -> Result<Prediction, ForecastError> {
        let scaled = self.model.predict_row(&self.x_scaler.transform_row(row))?;
        let mean = self.y_scaler.inverse_value(0, scaled.mean);
        let std = self.y_scaler.inverse_spread(0, scaled.std);
        if !(mean.is_finite() && std.is_finite()) {
            return Err(ForecastError::Numerical(format!("non-finite prediction (mean={mean}, std={std})")));
        }
        Ok(Prediction { mean, std })
    }
}

/// Run validation, the final fit and an `H`-day recursive projection.
///
/// `feature_config` must be the configuration that built `table`; the
/// projection rebuilds features for synthetic records with it.
pub fn forecast(
    table: &FeatureTable,
    config: &ForecastConfig,
    feature_config: &FeatureConfig,
) -> Result<Forecast, ForecastError> {
    let features = available_features(table, &config.features)?;
    let usable: Vec<&FeatureRow> = table
        .rows()
        .iter()
        .filter(|r| r.is_resolved(&features) && r.observation.get(config.target).is_finite())
        .collect();
    let required = config.min_rows.max(1);
    if usable.len() < required {
        return Err(ForecastError::InsufficientData {
            rows: usable.len(),
            required,
        });
    }

    let x = design_matrix(&usable, &features);
    let y = DVector::from_iterator(usable.len(), usable.iter().map(|r| r.observation.get(config.target)));

    let validation = validate(&usable, &x, &y, config)?;
    if let Some(report) = &validation {
        info!(
            train = report.train_rows,
            held_out = report.rows.len(),
            mae = report.mae,
            rmse = report.rmse,
            r2 = report.r2,
            "validation pass"
        );
    }

    let model = ScaledModel::fit(&x, &y, config)?;
    let history: Vec<Observation> = table.rows().iter().map(|r| r.observation.clone()).collect();
    let points = project(history, &model, &features, config, feature_config)?;
    info!(
        regressor = config.regressor.display_name(),
        rows = usable.len(),
        horizon = points.len(),
        "forecast ready"
    );

    Ok(Forecast {
        points,
        validation,
        regressor: config.regressor,
        features,
        training_rows: usable.len(),
    })
}

/// Configured features that the table carries; unknown ones are dropped.
fn available_features(table: &FeatureTable, requested: &[Feature]) -> Result<Vec<Feature>, ForecastError> {
    let mut out = Vec::with_capacity(requested.len());
    for f in requested {
        if out.contains(f) {
            continue;
        }
        if table.has_feature(*f) {
            out.push(*f);
        } else {
            warn!(feature = %f, "forecast feature not in feature table; dropped");
        }
    }
    if out.is_empty() {
        return Err(ForecastError::NoFeatures);
    }
    Ok(out)
}

fn design_matrix(rows: &[&FeatureRow], features: &[Feature]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), features.len(), |i, j| {
        rows[i].value(features[j]).unwrap_or(f64::NAN)
    })
}

fn feature_vector(row: &FeatureRow, features: &[Feature]) -> Result<Vec<f64>, ForecastError> {
    features
        .iter()
        .map(|f| {
            row.value(*f)
                .filter(|v| v.is_finite())
                .ok_or_else(|| ForecastError::Numerical(format!("unresolved feature {f} on {}", row.date())))
        })
        .collect()
}

/// Chronological hold-out of the most recent `validation_fraction` of rows.
fn validate(
    rows: &[&FeatureRow],
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    config: &ForecastConfig,
) -> Result<Option<ValidationReport>, ForecastError> {
    let n = rows.len();
    let fraction = config.validation_fraction.clamp(0.0, 1.0);
    let split = (n as f64 * (1.0 - fraction)).floor() as usize;
    if split < config.min_train_rows || split >= n {
        warn!(split, rows = n, "not enough rows to validate; skipping validation");
        return Ok(None);
    }

    let train_x = x.rows(0, split).into_owned();
    let train_y = y.rows(0, split).into_owned();
    let model = ScaledModel::fit(&train_x, &train_y, config)?;

    let mut out = Vec::with_capacity(n - split);
    for i in split..n {
        let row: Vec<f64> = x.row(i).iter().copied().collect();
        let p = model.predict(&row)?;
        out.push(ValidationRow {
            date: rows[i].date(),
            actual: y[i],
            predicted: p.mean,
            std: p.std,
        });
    }
    Ok(Some(ValidationReport::from_rows(split, out)))
}

fn project(
    mut history: Vec<Observation>,
    model: &ScaledModel,
    features: &[Feature],
    config: &ForecastConfig,
    feature_config: &FeatureConfig,
) -> Result<Vec<ForecastPoint>, ForecastError> {
    let mut points = Vec::with_capacity(config.horizon);
    for _ in 0..config.horizon {
        let next = next_record(&history)
            .ok_or_else(|| ForecastError::Numerical("empty history for projection".to_string()))?;
        history.push(next);

        let row = build_row(&history, feature_config)
            .ok_or_else(|| ForecastError::Numerical("empty history for projection".to_string()))?;
        let p = model.predict(&feature_vector(&row, features)?)?;
        let point = interval(row.date(), p);
        debug!(date = %point.date, point = point.point, std = p.std, "projected step");

        if let Some(last) = history.last_mut() {
            write_back(last, config.target, point.point);
        }
        points.push(point);
    }
    Ok(points)
}

/// Synthetic record for the day after the last one in `history`.
///
/// Exogenous values, population and the target carry forward unchanged; the
/// target is overwritten once predicted.
pub fn next_record(history: &[Observation]) -> Option<Observation> {
    let last = history.last()?;
    let mut next = last.clone();
    next.date = last.date + Duration::days(1);
    Some(next)
}

/// Store a predicted target and keep the case/incidence pair consistent.
pub fn write_back(record: &mut Observation, target: Field, value: f64) {
    record.set(target, value);
    match target {
        Field::Incidence if record.population_estimate > 0.0 => {
            record.case_count = value * record.population_estimate / PER_POPULATION;
        }
        Field::CaseCount => {
            if let Some(incidence) = incidence_per_100k(value, record.population_estimate) {
                record.incidence = incidence;
            }
        }
        _ => {}
    }
}

/// Clamp a prediction to a non-negative point with a ±z·σ band.
pub fn interval(date: NaiveDate, p: Prediction) -> ForecastPoint {
    let spread = INTERVAL_Z * p.std.max(0.0);
    ForecastPoint {
        date,
        point: p.mean.max(0.0),
        lower: (p.mean - spread).max(0.0),
        upper: (p.mean + spread).max(0.0),
    }
}
