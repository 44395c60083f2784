//! Feature Engineer: calendar fields and trailing rolling means.
//!
//! All features of a row are pure functions of the records at or before that
//! row, so the same code builds rows for the historical table and for
//! synthetic future records during recursive forecasting.

use tracing::{debug, warn};

use crate::domain::{
    FeatureConfig, FeatureRow, FeatureTable, Field, Observation, RollingValue, UnifiedSeries, day_of_year, is_monsoon,
};

/// Engineer features for every record of the unified series.
///
/// Rows with any non-finite value are dropped as a final integrity guard;
/// with the Unifier's fill policy this should never trigger.
pub fn engineer(series: &UnifiedSeries, config: &FeatureConfig) -> FeatureTable {
    let records = series.records();
    let mut rows = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for end in 0..records.len() {
        let Some(row) = build_row(&records[..=end], config) else {
            continue;
        };
        if row_is_finite(&row) {
            rows.push(row);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        warn!(dropped, "dropped feature rows with unresolved values");
    }
    debug!(rows = rows.len(), windows = ?config.windows, "feature table ready");
    FeatureTable::new(rows)
}

/// Build the feature row for the last record of `history`.
///
/// Returns `None` for an empty history.
pub fn build_row(history: &[Observation], config: &FeatureConfig) -> Option<FeatureRow> {
    let current = history.last()?;
    let end = history.len() - 1;

    let mut rolling = Vec::with_capacity(config.rolled_fields.len() * config.windows.len());
    for &field in &config.rolled_fields {
        for &window in &config.windows {
            rolling.push(RollingValue {
                field,
                window,
                value: rolling_mean_of(history, field, end, window),
            });
        }
    }

    Some(FeatureRow {
        observation: current.clone(),
        day_of_year: day_of_year(current.date),
        monsoon: is_monsoon(current.date),
        rolling,
    })
}

/// Mean of `values[end + 1 - window ..= end]`, clipped at the start of the slice.
///
/// A window of 0 is treated as 1. Early records average over however many
/// values exist (at least one).
pub fn rolling_mean(values: &[f64], end: usize, window: usize) -> f64 {
    let window = window.max(1);
    let start = (end + 1).saturating_sub(window);
    let slice = &values[start..=end];
    slice.iter().sum::<f64>() / slice.len() as f64
}

fn rolling_mean_of(history: &[Observation], field: Field, end: usize, window: usize) -> f64 {
    let window = window.max(1);
    let start = (end + 1).saturating_sub(window);
    let slice = &history[start..=end];
    slice.iter().map(|o| o.get(field)).sum::<f64>() / slice.len() as f64
}

fn row_is_finite(row: &FeatureRow) -> bool {
    Field::ALL.iter().all(|f| row.observation.get(*f).is_finite()) && row.rolling.iter().all(|r| r.value.is_finite())
}
