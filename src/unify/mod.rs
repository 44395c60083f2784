//! Unifier: fuse date-keyed source tables into one continuous daily series.
//!
//! Steps:
//! 1. check that every mandatory source is present (fatal otherwise)
//! 2. resolve the daily span (mandatory sources, or the configured window); the live
//!    row may extend it by at most one day
//! 3. collect known `(date, value)` knots per field, later sources overriding earlier ones
//! 4. fill each calendar day by time-weighted interpolation, then edge fill
//! 5. derive incidence per 100k with a guarded denominator
//!
//! The input tables are never modified; a new `UnifiedSeries` is returned.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use crate::domain::{
    DataQualityIssue, DateWindow, Field, MacroContext, Observation, SourceKind, SourceSet, SourceTable,
    UnifiedSeries,
};
use crate::error::UnifyError;

/// Population denominator for the incidence rate.
pub const PER_POPULATION: f64 = 100_000.0;

/// Build the unified daily series from all sources.
pub fn unify(sources: &SourceSet, window: Option<DateWindow>) -> Result<UnifiedSeries, UnifyError> {
    for kind in SourceKind::MANDATORY {
        if sources.get(kind).is_none() {
            return Err(UnifyError::MissingSource(kind));
        }
    }

    let mut tables: Vec<&SourceTable> = sources
        .tables
        .iter()
        .filter(|t| t.kind() != SourceKind::Live)
        .collect();
    let (start, mut end) = resolve_span(&tables, window)?;

    let mut issues = Vec::new();
    let live_table = match &sources.live {
        Some(live) if live_in_reach(live.date, start, end, window) => {
            end = end.max(live.date);
            Some(live.to_source_table())
        }
        Some(live) => {
            warn!(date = %live.date, %start, %end, "live reading is not adjacent to the history; left out of the series");
            issues.push(DataQualityIssue::LiveOutsideSpan { date: live.date });
            None
        }
        None => None,
    };
    tables.extend(live_table.as_ref());
    tables.sort_by_key(|t| precedence(t.kind()));

    let days: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
    debug!(%start, %end, days = days.len(), "resolved analysis span");

    let knots = collect_knots(&tables, &mut issues);

    let mut records: Vec<Observation> = days.iter().map(|d| Observation::zeroed(*d)).collect();
    for field in Field::ALL.into_iter().filter(|f| f.is_observed()) {
        let Some(points) = knots.get(&field).filter(|p| !p.is_empty()) else {
            warn!(field = %field, "no source supplies this field; defaulting to 0");
            issues.push(DataQualityIssue::NoObservations { field });
            continue;
        };
        let points: Vec<(NaiveDate, f64)> = points.iter().map(|(d, v)| (*d, *v)).collect();
        for record in &mut records {
            record.set(field, interpolate_time(&points, record.date));
        }
    }

    for record in &mut records {
        match incidence_per_100k(record.case_count, record.population_estimate) {
            Some(rate) => record.incidence = rate,
            None => {
                warn!(date = %record.date, population = record.population_estimate, "invalid population; incidence set to 0");
                issues.push(DataQualityIssue::InvalidPopulation { date: record.date });
                record.incidence = 0.0;
            }
        }
    }

    info!(records = records.len(), issues = issues.len(), "unified series ready");
    Ok(UnifiedSeries::new(records, issues))
}

/// `cases * 100k / population`, or `None` when the population cannot be a denominator.
pub fn incidence_per_100k(cases: f64, population: f64) -> Option<f64> {
    if !(population.is_finite() && population > 0.0) {
        return None;
    }
    let rate = cases * PER_POPULATION / population;
    rate.is_finite().then_some(rate)
}

/// Latest growth/inflation figures from the economic table (zeros when absent).
pub fn macro_context(sources: &SourceSet) -> MacroContext {
    let Some(table) = sources.get(SourceKind::Economic) else {
        info!("no economic indicators; macro context defaults to zero");
        return MacroContext::default();
    };
    let latest = |field: Field| {
        table
            .values_of(field)
            .into_iter()
            .max_by_key(|(d, _)| *d)
            .map(|(_, v)| v)
            .unwrap_or(0.0)
    };
    MacroContext {
        gdp_growth_rate: latest(Field::GdpGrowthRate),
        inflation_rate: latest(Field::InflationRate),
    }
}

/// Time-weighted linear interpolation over sorted knots, with edge fill.
///
/// Dates before the first knot take its value (back fill); dates after the
/// last knot take the last value (forward fill).
pub fn interpolate_time(knots: &[(NaiveDate, f64)], date: NaiveDate) -> f64 {
    match knots.binary_search_by_key(&date, |(d, _)| *d) {
        Ok(i) => knots[i].1,
        Err(0) => knots.first().map_or(0.0, |(_, v)| *v),
        Err(i) if i >= knots.len() => knots.last().map_or(0.0, |(_, v)| *v),
        Err(i) => {
            let (d0, v0) = knots[i - 1];
            let (d1, v1) = knots[i];
            let span = (d1 - d0).num_days() as f64;
            let elapsed = (date - d0).num_days() as f64;
            v0 + (v1 - v0) * (elapsed / span)
        }
    }
}

/// Whether the live reading belongs in the series.
///
/// Without a configured window it may sit anywhere in the history or on the
/// day right after it; a later reading would force-fill every day in between.
fn live_in_reach(date: NaiveDate, start: NaiveDate, end: NaiveDate, window: Option<DateWindow>) -> bool {
    match window {
        Some(_) => start <= date && date <= end,
        None => start <= date && date <= end + Duration::days(1),
    }
}

/// Later ranks override earlier ones for the same (date, field).
fn precedence(kind: SourceKind) -> u8 {
    match kind {
        SourceKind::Disease => 0,
        SourceKind::Weather => 1,
        SourceKind::Population => 2,
        SourceKind::NightLight => 3,
        SourceKind::Economic => 4,
        SourceKind::Live => 5,
    }
}

fn resolve_span(tables: &[&SourceTable], window: Option<DateWindow>) -> Result<(NaiveDate, NaiveDate), UnifyError> {
    if let Some(w) = window {
        if w.start > w.end {
            return Err(UnifyError::EmptyWindow {
                start: w.start,
                end: w.end,
            });
        }
        return Ok((w.start, w.end));
    }

    let mut dates = tables
        .iter()
        .filter(|t| t.kind().is_mandatory())
        .flat_map(|t| t.rows().iter().map(|r| r.date));
    let first = dates.next().ok_or(UnifyError::NoDates)?;
    let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Ok((start, end))
}

fn collect_knots(tables: &[&SourceTable], issues: &mut Vec<DataQualityIssue>) -> BTreeMap<Field, BTreeMap<NaiveDate, f64>> {
    let mut knots: BTreeMap<Field, BTreeMap<NaiveDate, f64>> = BTreeMap::new();

    for table in tables {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for row in table.rows() {
            if !seen.insert(row.date) && reported.insert(row.date) {
                warn!(source = %table.kind(), date = %row.date, "duplicate date; keeping last row");
                issues.push(DataQualityIssue::DuplicateDate {
                    table: table.kind(),
                    date: row.date,
                });
            }
        }

        for &field in table.columns() {
            let entry = knots.entry(field).or_default();
            for (date, value) in table.values_of(field) {
                entry.insert(date, value);
            }
        }
    }

    knots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LiveObservation, SourceRow};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn table(kind: SourceKind, columns: Vec<Field>, rows: Vec<(NaiveDate, Vec<Option<f64>>)>) -> SourceTable {
        let rows = rows
            .into_iter()
            .map(|(date, values)| SourceRow { date, values })
            .collect();
        SourceTable::new(kind, columns, rows).unwrap()
    }

    fn base_sources() -> SourceSet {
        SourceSet {
            tables: vec![
                table(
                    SourceKind::Disease,
                    vec![Field::CaseCount],
                    vec![(d(1), Some(10.0)), (d(3), Some(30.0)), (d(5), Some(50.0))]
                        .into_iter()
                        .map(|(dt, v)| (dt, vec![v]))
                        .collect(),
                ),
                table(
                    SourceKind::Weather,
                    vec![Field::Temperature, Field::Humidity, Field::Rainfall],
                    vec![
                        (d(2), vec![Some(28.0), Some(70.0), Some(1.0)]),
                        (d(4), vec![Some(30.0), None, Some(3.0)]),
                    ],
                ),
                table(
                    SourceKind::Population,
                    vec![Field::PopulationEstimate],
                    vec![(d(1), vec![Some(100_000.0)])],
                ),
                table(SourceKind::NightLight, vec![Field::Radiance], vec![(d(1), vec![Some(40.0)])]),
            ],
            live: None,
        }
    }

    #[test]
    fn span_is_gap_free_and_strictly_increasing() {
        let series = unify(&base_sources(), None).unwrap();
        let dates: Vec<NaiveDate> = series.records().iter().map(|r| r.date).collect();
        assert_eq!(dates, (1..=5).map(d).collect::<Vec<_>>());
        for pair in dates.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 1);
        }
    }

    #[test]
    fn interior_gaps_interpolate_and_edges_fill() {
        let series = unify(&base_sources(), None).unwrap();
        let cases = series.values(Field::CaseCount);
        assert_eq!(cases, vec![10.0, 20.0, 30.0, 40.0, 50.0]);

        let temp = series.values(Field::Temperature);
        // back fill day 1, interpolate day 3, forward fill day 5
        assert_eq!(temp, vec![28.0, 28.0, 29.0, 30.0, 30.0]);

        // humidity only known on day 2 -> constant
        assert!(series.values(Field::Humidity).iter().all(|h| *h == 70.0));
    }

    #[test]
    fn interpolation_weights_by_elapsed_days() {
        let knots = vec![(d(1), 0.0), (d(2), 10.0), (d(12), 20.0)];
        assert_eq!(interpolate_time(&knots, d(7)), 15.0);
        assert_eq!(interpolate_time(&knots, d(20)), 20.0);
    }

    #[test]
    fn incidence_is_cases_per_100k() {
        let series = unify(&base_sources(), None).unwrap();
        assert_eq!(series.values(Field::Incidence), vec![10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn zero_population_yields_zero_incidence_and_an_issue() {
        let mut sources = base_sources();
        sources.tables[2] = table(
            SourceKind::Population,
            vec![Field::PopulationEstimate],
            vec![(d(1), vec![Some(100_000.0)]), (d(3), vec![Some(0.0)]), (d(4), vec![Some(100_000.0)])],
        );
        let series = unify(&sources, None).unwrap();
        assert_eq!(series.records()[2].incidence, 0.0);
        assert!(series.issues().contains(&DataQualityIssue::InvalidPopulation { date: d(3) }));
        assert!(series.values(Field::Incidence).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn missing_mandatory_source_is_fatal() {
        let mut sources = base_sources();
        sources.tables.remove(3);
        let err = unify(&sources, None).unwrap_err();
        assert_eq!(err, UnifyError::MissingSource(SourceKind::NightLight));
    }

    #[test]
    fn absent_economic_source_defaults_to_zero() {
        let sources = base_sources();
        let series = unify(&sources, None).unwrap();
        assert!(series.values(Field::GdpGrowthRate).iter().all(|v| *v == 0.0));
        assert!(series.issues().contains(&DataQualityIssue::NoObservations { field: Field::GdpGrowthRate }));
        assert_eq!(macro_context(&sources), MacroContext::default());
    }

    #[test]
    fn live_observation_supersedes_same_day_history() {
        let mut sources = base_sources();
        sources.live = Some(LiveObservation {
            date: d(4),
            temperature: 35.0,
            humidity: 90.0,
            rainfall: Some(7.5),
        });
        let series = unify(&sources, None).unwrap();
        let day4 = &series.records()[3];
        assert_eq!(day4.temperature, 35.0);
        assert_eq!(day4.humidity, 90.0);
        assert_eq!(day4.rainfall, 7.5);
        // other days keep interpolating from historical knots
        assert_eq!(series.records()[1].temperature, 28.0);
    }

    #[test]
    fn live_observation_on_the_next_day_extends_span() {
        let mut sources = base_sources();
        sources.live = Some(LiveObservation {
            date: d(6),
            temperature: 31.0,
            humidity: 80.0,
            rainfall: None,
        });
        let series = unify(&sources, None).unwrap();
        assert_eq!(series.last_date(), Some(d(6)));
        assert_eq!(series.records()[5].case_count, 50.0);
        assert_eq!(series.records()[5].temperature, 31.0);
    }

    #[test]
    fn distant_live_observation_adds_no_days() {
        let mut sources = base_sources();
        sources.live = Some(LiveObservation {
            date: d(30),
            temperature: 31.0,
            humidity: 80.0,
            rainfall: None,
        });
        let series = unify(&sources, None).unwrap();
        assert_eq!(series.last_date(), Some(d(5)));
        assert_eq!(series.values(Field::CaseCount), vec![10.0, 20.0, 30.0, 40.0, 50.0]);
        // forward fill from history, not pulled towards the live reading
        assert_eq!(series.records()[4].temperature, 30.0);
        assert!(series.issues().contains(&DataQualityIssue::LiveOutsideSpan { date: d(30) }));
    }

    #[test]
    fn incidence_is_exact_for_round_populations() {
        assert_eq!(incidence_per_100k(30.0, 100_000.0), Some(30.0));
        assert_eq!(incidence_per_100k(10.0, 100_000.0), Some(10.0));
        assert_eq!(incidence_per_100k(5.0, 0.0), None);
        assert_eq!(incidence_per_100k(5.0, f64::NAN), None);
    }

    #[test]
    fn duplicate_dates_keep_last_row() {
        let mut sources = base_sources();
        sources.tables[3] = table(
            SourceKind::NightLight,
            vec![Field::Radiance],
            vec![(d(1), vec![Some(40.0)]), (d(1), vec![Some(42.0)])],
        );
        let series = unify(&sources, None).unwrap();
        assert_eq!(series.records()[0].radiance, 42.0);
        assert!(series.issues().contains(&DataQualityIssue::DuplicateDate {
            table: SourceKind::NightLight,
            date: d(1)
        }));
    }

    #[test]
    fn configured_window_clips_but_keeps_anchors() {
        let window = DateWindow { start: d(2), end: d(3) };
        let series = unify(&base_sources(), Some(window)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.values(Field::CaseCount), vec![20.0, 30.0]);

        let bad = DateWindow { start: d(3), end: d(2) };
        assert!(matches!(unify(&base_sources(), Some(bad)), Err(UnifyError::EmptyWindow { .. })));
    }

    #[test]
    fn macro_context_uses_latest_economic_row() {
        let mut sources = base_sources();
        sources.tables.push(table(
            SourceKind::Economic,
            vec![Field::GdpGrowthRate, Field::InflationRate],
            vec![
                (NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), vec![Some(5.8), Some(9.0)]),
                (NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), vec![Some(7.1), Some(6.2)]),
            ],
        ));
        let ctx = macro_context(&sources);
        assert_eq!(ctx.gdp_growth_rate, 5.8);
        assert_eq!(ctx.inflation_rate, 9.0);

        // anchors before the span still fill the series
        let series = unify(&sources, None).unwrap();
        assert!(series.values(Field::GdpGrowthRate).iter().all(|v| *v == 5.8));
    }
}
