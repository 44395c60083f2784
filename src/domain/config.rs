//! Run configuration.
//!
//! Every tunable constant of the pipeline lives here so stages can be tested
//! with their own parameters. The CLI builds a `PipelineConfig` from flags
//! (see `app::config_from_args`); tests usually start from `Default`.

use std::time::Duration;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{Feature, Field};

/// Which probabilistic regressor the forecaster fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RegressorKind {
    /// Bayesian linear regression with evidence-maximised priors.
    BayesRidge,
    /// Gaussian process with a constant × RBF + white-noise kernel.
    Gp,
}

impl RegressorKind {
    pub fn display_name(self) -> &'static str {
        match self {
            RegressorKind::BayesRidge => "Bayesian ridge",
            RegressorKind::Gp => "Gaussian process",
        }
    }
}

/// Rolling-window feature settings.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Fields that receive rolling means (the target should be among them).
    pub rolled_fields: Vec<Field>,
    pub windows: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            rolled_fields: vec![Field::Incidence, Field::Temperature, Field::Humidity],
            windows: vec![7, 14],
        }
    }
}

/// Consensus causal discovery settings.
#[derive(Debug, Clone)]
pub struct CausalConfig {
    pub target: Feature,
    pub candidates: Vec<Feature>,
    /// Largest lag (days) scanned by the lagged-correlation test.
    pub max_lag: usize,
    /// Minimum absolute correlation for either test to accept a candidate.
    pub threshold: f64,
}

impl Default for CausalConfig {
    fn default() -> Self {
        Self {
            target: Feature::Raw(Field::Incidence),
            candidates: vec![
                Feature::Raw(Field::Temperature),
                Feature::Raw(Field::Humidity),
                Feature::Raw(Field::Rainfall),
                Feature::Raw(Field::Radiance),
            ],
            max_lag: 7,
            threshold: 0.25,
        }
    }
}

/// Forecasting settings.
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub target: Field,
    pub features: Vec<Feature>,
    /// Days projected past the last known date.
    pub horizon: usize,
    /// Share of the most recent rows held out for validation.
    pub validation_fraction: f64,
    /// Fewer usable rows than this skips forecasting altogether.
    pub min_rows: usize,
    /// Fewer training rows than this skips the validation pass.
    pub min_train_rows: usize,
    pub regressor: RegressorKind,
    /// Cap on the number of (most recent) rows a Gaussian process trains on.
    pub gp_max_train_rows: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            target: Field::Incidence,
            features: vec![
                Feature::DayOfYear,
                Feature::Monsoon,
                Feature::RollingMean { field: Field::Temperature, window: 14 },
                Feature::RollingMean { field: Field::Humidity, window: 14 },
                Feature::RollingMean { field: Field::Incidence, window: 7 },
            ],
            horizon: 14,
            validation_fraction: 0.2,
            min_rows: 10,
            min_train_rows: 5,
            regressor: RegressorKind::BayesRidge,
            gp_max_train_rows: 365,
        }
    }
}

/// Per-case economic constants (USD).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostModel {
    /// Direct treatment cost per case.
    pub cost_per_case: f64,
    /// Lost productivity per case.
    pub productivity_loss_per_case: f64,
    /// Vector-control spend per resident.
    pub prevention_cost_per_capita: f64,
    /// Share of cases a prevention programme is assumed to avert.
    pub prevention_efficacy: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            cost_per_case: 150.0,
            productivity_loss_per_case: 500.0,
            prevention_cost_per_capita: 5.0,
            prevention_efficacy: 0.5,
        }
    }
}

/// Geographic point used for the live weather lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Default for Coordinates {
    /// Dhaka.
    fn default() -> Self {
        Self {
            lat: 23.8103,
            lon: 90.4125,
        }
    }
}

/// Inclusive analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A full run's configuration as understood by the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Restrict the unified series to this window (defaults to the span of the
    /// mandatory sources).
    pub window: Option<DateWindow>,
    pub features: FeatureConfig,
    pub causal: CausalConfig,
    pub forecast: ForecastConfig,
    pub costs: CostModel,
    pub location: Coordinates,
    /// Upper bound on the live weather request.
    pub live_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: None,
            features: FeatureConfig::default(),
            causal: CausalConfig::default(),
            forecast: ForecastConfig::default(),
            costs: CostModel::default(),
            location: Coordinates::default(),
            live_timeout: Duration::from_secs(10),
        }
    }
}
