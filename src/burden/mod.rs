//! Burden & trend estimation over the historical series and the forecast.
//!
//! Everything here is closed-form arithmetic on already-computed tables:
//! - economic burden: `total cases × (direct cost + productivity loss)`
//! - 7-day trend label (two-window mean comparison)
//! - forecast peak
//! - prevention ROI, case statistics and incidence severity

pub mod risk;

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{CostModel, Field, ForecastPoint, UnifiedSeries};
use crate::math::{mean, sample_std};

pub use risk::{RiskLevel, classify_risk};

/// Days in each of the two trend windows.
pub const TREND_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BurdenEstimate {
    pub total_cases: f64,
    pub direct_cost: f64,
    pub productivity_loss: f64,
    /// `direct_cost + productivity_loss`.
    pub total: f64,
}

pub fn estimate_burden(total_cases: f64, costs: &CostModel) -> BurdenEstimate {
    let direct_cost = total_cases * costs.cost_per_case;
    let productivity_loss = total_cases * costs.productivity_loss_per_case;
    BurdenEstimate {
        total_cases,
        direct_cost,
        productivity_loss,
        total: total_cases * (costs.cost_per_case + costs.productivity_loss_per_case),
    }
}

/// Sum of `case_count` over the unified series.
pub fn total_cases(series: &UnifiedSeries) -> f64 {
    series.values(Field::CaseCount).iter().sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Increasing,
    StableOrDecreasing,
}

impl TrendLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendLabel::Increasing => "increasing",
            TrendLabel::StableOrDecreasing => "stable/decreasing",
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare the mean of the last 7 values to the mean of the 7 before.
///
/// Strictly greater is "increasing"; equality and histories shorter than
/// two full windows are "stable/decreasing".
pub fn trend_label(values: &[f64]) -> TrendLabel {
    let n = values.len();
    if n < 2 * TREND_WINDOW {
        return TrendLabel::StableOrDecreasing;
    }
    let last = mean(&values[n - TREND_WINDOW..]);
    let prev = mean(&values[n - 2 * TREND_WINDOW..n - TREND_WINDOW]);
    match (last, prev) {
        (Some(l), Some(p)) if l > p => TrendLabel::Increasing,
        _ => TrendLabel::StableOrDecreasing,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPeak {
    pub date: NaiveDate,
    pub value: f64,
}

/// Forecast day with the largest point estimate; the earliest wins ties.
pub fn peak_forecast(points: &[ForecastPoint]) -> Option<ForecastPeak> {
    let mut best: Option<&ForecastPoint> = None;
    for p in points {
        if best.is_none_or(|b| p.point > b.point) {
            best = Some(p);
        }
    }
    best.map(|p| ForecastPeak {
        date: p.date,
        value: p.point,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreventionRoi {
    pub prevention_cost: f64,
    pub potential_savings: f64,
    /// `(savings - cost) / cost × 100`; 0 when the cost is not positive.
    pub roi_percent: f64,
}

pub fn prevention_roi(total_cases: f64, latest_population: f64, costs: &CostModel) -> PreventionRoi {
    let prevention_cost = latest_population * costs.prevention_cost_per_capita;
    let potential_savings =
        total_cases * costs.prevention_efficacy * (costs.cost_per_case + costs.productivity_loss_per_case);
    let roi_percent = if prevention_cost > 0.0 {
        (potential_savings - prevention_cost) / prevention_cost * 100.0
    } else {
        0.0
    };
    PreventionRoi {
        prevention_cost,
        potential_savings,
        roi_percent,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaseStatistics {
    pub total: f64,
    pub daily_mean: f64,
    pub daily_max: f64,
    pub daily_min: f64,
    /// Sample standard deviation (0 for fewer than two days).
    pub std_dev: f64,
}

pub fn case_statistics(cases: &[f64]) -> Option<CaseStatistics> {
    let daily_mean = mean(cases)?;
    Some(CaseStatistics {
        total: cases.iter().sum(),
        daily_mean,
        daily_max: cases.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        daily_min: cases.iter().copied().fold(f64::INFINITY, f64::min),
        std_dev: sample_std(cases).unwrap_or(0.0),
    })
}

/// Incidence severity bands (per 100k).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub fn from_incidence(incidence: f64) -> Self {
        if incidence < 10.0 {
            Severity::Low
        } else if incidence < 50.0 {
            Severity::Moderate
        } else if incidence < 100.0 {
            Severity::High
        } else {
            Severity::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the estimator derives for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurdenReport {
    pub burden: BurdenEstimate,
    pub trend: TrendLabel,
    pub peak: Option<ForecastPeak>,
    pub roi: PreventionRoi,
    pub cases: Option<CaseStatistics>,
    pub latest_severity: Option<Severity>,
}

/// Run the estimator. `forecast` may be empty when forecasting was skipped.
pub fn assess(series: &UnifiedSeries, forecast: &[ForecastPoint], costs: &CostModel) -> BurdenReport {
    let cases = series.values(Field::CaseCount);
    let total = total_cases(series);
    let latest = series.records().last();
    let population = latest.map_or(0.0, |o| o.population_estimate);

    BurdenReport {
        burden: estimate_burden(total, costs),
        trend: trend_label(&cases),
        peak: peak_forecast(forecast),
        roi: prevention_roi(total, population, costs),
        cases: case_statistics(&cases),
        latest_severity: latest.map(|o| Severity::from_incidence(o.incidence)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observation;
    use chrono::Duration;
    use proptest::prelude::*;

    fn point(day: i64, value: f64) -> ForecastPoint {
        ForecastPoint {
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap() + Duration::days(day),
            point: value,
            lower: 0.0,
            upper: value * 2.0,
        }
    }

    #[test]
    fn burden_uses_both_cost_components() {
        let b = estimate_burden(1_000.0, &CostModel::default());
        assert_eq!(b.direct_cost, 150_000.0);
        assert_eq!(b.productivity_loss, 500_000.0);
        assert_eq!(b.total, 650_000.0);
    }

    #[test]
    fn equal_windows_are_not_increasing() {
        assert_eq!(trend_label(&[10.0; 30]), TrendLabel::StableOrDecreasing);
        let mut rising = vec![10.0; 7];
        rising.extend([10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.01]);
        assert_eq!(trend_label(&rising), TrendLabel::Increasing);
        assert_eq!(trend_label(&[1.0, 2.0, 3.0]), TrendLabel::StableOrDecreasing);
        assert_eq!(TrendLabel::StableOrDecreasing.to_string(), "stable/decreasing");
    }

    #[test]
    fn only_last_fourteen_days_matter_for_trend() {
        let mut values = vec![1_000.0; 20];
        values.extend(vec![1.0; 7]);
        values.extend(vec![2.0; 7]);
        assert_eq!(trend_label(&values), TrendLabel::Increasing);
    }

    #[test]
    fn peak_prefers_first_maximum() {
        let points = [point(0, 3.0), point(1, 7.0), point(2, 7.0), point(3, 1.0)];
        let peak = peak_forecast(&points).unwrap();
        assert_eq!(peak.value, 7.0);
        assert_eq!(peak.date, points[1].date);
        assert!(peak_forecast(&[]).is_none());
    }

    #[test]
    fn roi_follows_prevention_economics() {
        let roi = prevention_roi(10_000.0, 100_000.0, &CostModel::default());
        assert_eq!(roi.prevention_cost, 500_000.0);
        assert_eq!(roi.potential_savings, 3_250_000.0);
        assert!((roi.roi_percent - 550.0).abs() < 1e-9);
        assert_eq!(prevention_roi(10.0, 0.0, &CostModel::default()).roi_percent, 0.0);
    }

    #[test]
    fn severity_bands() {
        assert_eq!(Severity::from_incidence(0.0), Severity::Low);
        assert_eq!(Severity::from_incidence(10.0), Severity::Moderate);
        assert_eq!(Severity::from_incidence(49.9), Severity::Moderate);
        assert_eq!(Severity::from_incidence(99.0), Severity::High);
        assert_eq!(Severity::from_incidence(100.0), Severity::Critical);
    }

    #[test]
    fn statistics_of_daily_cases() {
        let s = case_statistics(&[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(s.total, 12.0);
        assert_eq!(s.daily_mean, 4.0);
        assert_eq!(s.daily_max, 6.0);
        assert_eq!(s.daily_min, 2.0);
        assert!((s.std_dev - 2.0).abs() < 1e-12);
        assert!(case_statistics(&[]).is_none());
    }

    #[test]
    fn assess_constant_series() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records = (0..30)
            .map(|i| {
                let mut o = Observation::zeroed(start + Duration::days(i));
                o.case_count = 10.0;
                o.population_estimate = 100_000.0;
                o.incidence = 10.0;
                o
            })
            .collect();
        let series = UnifiedSeries::new(records, Vec::new());
        let report = assess(&series, &[], &CostModel::default());
        assert_eq!(report.burden.total_cases, 300.0);
        assert_eq!(report.burden.total, 300.0 * 650.0);
        assert_eq!(report.trend, TrendLabel::StableOrDecreasing);
        assert!(report.peak.is_none());
        assert_eq!(report.latest_severity, Some(Severity::Moderate));
    }

    proptest! {
        #[test]
        fn burden_is_linear_in_cases(cases in 0.0f64..1e7, cost in 0.0f64..1e4, loss in 0.0f64..1e4) {
            let costs = CostModel { cost_per_case: cost, productivity_loss_per_case: loss, ..CostModel::default() };
            let b = estimate_burden(cases, &costs);
            let expected = cases * (cost + loss);
            prop_assert!((b.total - expected).abs() <= 1e-9 * expected.abs().max(1.0));
            prop_assert!((b.direct_cost + b.productivity_loss - b.total).abs() <= 1e-6 * b.total.abs().max(1.0));
        }

        #[test]
        fn trend_matches_window_means(values in proptest::collection::vec(0.0f64..1e3, 14..60)) {
            let n = values.len();
            let last: f64 = values[n - 7..].iter().sum::<f64>() / 7.0;
            let prev: f64 = values[n - 14..n - 7].iter().sum::<f64>() / 7.0;
            let expected = if last > prev { TrendLabel::Increasing } else { TrendLabel::StableOrDecreasing };
            prop_assert_eq!(trend_label(&values), expected);
        }
    }
}
