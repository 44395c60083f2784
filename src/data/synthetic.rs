//! Seeded synthetic dataset for `demo` runs.
//!
//! Shapes follow the real inputs: daily disease and weather tables, monthly
//! population and night-light tables, yearly economic indicators, and one
//! live reading for the day after the history ends. Cases respond to
//! temperature `driver_lag` days earlier so the causal stage has something
//! to find.

use std::f64::consts::PI;

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Field, LiveObservation, SourceKind, SourceRow, SourceSet, SourceTable};
use crate::error::{AppError, EXIT_INPUT, EXIT_RUNTIME};

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub start: NaiveDate,
    pub days: usize,
    pub seed: u64,
    /// Days between a temperature change and the case response.
    pub driver_lag: usize,
    pub base_population: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            days: 730,
            seed: 42,
            driver_lag: 5,
            base_population: 22_000_000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DemoData {
    pub sources: SourceSet,
    pub live: LiveObservation,
}

pub fn generate_demo(config: &DemoConfig) -> Result<DemoData, AppError> {
    if config.days < 2 {
        return Err(AppError::new(EXIT_INPUT, "Demo needs at least 2 days."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::new(EXIT_RUNTIME, format!("Noise distribution error: {e}")))?;
    let mut noise = |scale: f64| normal.sample(&mut rng) * scale;

    // One extra day of weather feeds the live reading.
    let total = config.days + 1;
    let dates: Vec<NaiveDate> = (0..total).map(|i| config.start + Duration::days(i as i64)).collect();

    let mut temperature = Vec::with_capacity(total);
    let mut humidity = Vec::with_capacity(total);
    let mut rainfall = Vec::with_capacity(total);
    for date in &dates {
        let season = seasonal(*date);
        temperature.push(27.0 + 4.0 * season + noise(0.8));
        humidity.push((76.0 + 12.0 * season + noise(3.0)).clamp(30.0, 100.0));
        rainfall.push((6.0 + 8.0 * season + noise(4.0)).max(0.0));
    }

    let mut cases = Vec::with_capacity(config.days);
    let mut deaths = Vec::with_capacity(config.days);
    let mut cumulative = 0.0;
    for i in 0..config.days {
        let driver = temperature[i.saturating_sub(config.driver_lag)];
        let c = (60.0 + 30.0 * (driver - 27.0) + noise(10.0)).max(0.0).round();
        cumulative += (c * 0.003).round();
        cases.push(c);
        deaths.push(cumulative);
    }

    let disease_rows = (0..config.days)
        .map(|i| SourceRow {
            date: dates[i],
            values: vec![Some(cases[i]), Some(deaths[i])],
        })
        .collect();
    let weather_rows = (0..config.days)
        .map(|i| SourceRow {
            date: dates[i],
            values: vec![Some(temperature[i]), Some(humidity[i]), Some(rainfall[i])],
        })
        .collect();

    let months = month_starts(config.start, dates[config.days - 1]);
    let population_rows = months
        .iter()
        .enumerate()
        .map(|(m, date)| SourceRow {
            date: *date,
            values: vec![Some((config.base_population * 1.0015f64.powi(m as i32)).round())],
        })
        .collect();
    let nightlight_rows = months
        .iter()
        .enumerate()
        .map(|(m, date)| SourceRow {
            date: *date,
            values: vec![Some(30.0 + 0.1 * m as f64 + noise(0.5))],
        })
        .collect();

    let economic_rows = (config.start.year()..=dates[config.days - 1].year())
        .filter_map(|y| NaiveDate::from_ymd_opt(y, 1, 1))
        .map(|date| SourceRow {
            date,
            values: vec![Some(6.0 + noise(0.5)), Some(7.5 + noise(1.0))],
        })
        .collect();

    let tables = vec![
        SourceTable::new(
            SourceKind::Disease,
            vec![Field::CaseCount, Field::CumulativeDeaths],
            disease_rows,
        )?,
        SourceTable::new(
            SourceKind::Weather,
            vec![Field::Temperature, Field::Humidity, Field::Rainfall],
            weather_rows,
        )?,
        SourceTable::new(SourceKind::Population, vec![Field::PopulationEstimate], population_rows)?,
        SourceTable::new(SourceKind::NightLight, vec![Field::Radiance], nightlight_rows)?,
        SourceTable::new(
            SourceKind::Economic,
            vec![Field::GdpGrowthRate, Field::InflationRate],
            economic_rows,
        )?,
    ];

    let live = LiveObservation {
        date: dates[config.days],
        temperature: temperature[config.days],
        humidity: humidity[config.days],
        rainfall: Some(rainfall[config.days]),
    };

    Ok(DemoData {
        sources: SourceSet { tables, live: None },
        live,
    })
}

/// Annual cycle peaking in mid-July, in [-1, 1].
fn seasonal(date: NaiveDate) -> f64 {
    (2.0 * PI * (date.ordinal() as f64 - 105.0) / 365.0).sin()
}

/// First day of every month overlapping `[start, end]`, starting with `start`'s month.
fn month_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut cursor = NaiveDate::from_ymd_opt(start.year(), start.month(), 1);
    while let Some(d) = cursor {
        if d > end {
            break;
        }
        out.push(d);
        cursor = if d.month() == 12 {
            NaiveDate::from_ymd_opt(d.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(d.year(), d.month() + 1, 1)
        };
    }
    out
}
