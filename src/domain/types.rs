//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages as immutable tables
//! - exported to CSV/JSON
//! - constructed directly in unit tests without touching the filesystem

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// A numeric field carried by every observation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    CaseCount,
    CumulativeDeaths,
    PopulationEstimate,
    Temperature,
    Humidity,
    Rainfall,
    Radiance,
    GdpGrowthRate,
    InflationRate,
    /// Derived target: cases per 100k population.
    Incidence,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::CaseCount,
        Field::CumulativeDeaths,
        Field::PopulationEstimate,
        Field::Temperature,
        Field::Humidity,
        Field::Rainfall,
        Field::Radiance,
        Field::GdpGrowthRate,
        Field::InflationRate,
        Field::Incidence,
    ];

    /// Canonical column name used in inputs, exports and feature names.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::CaseCount => "case_count",
            Field::CumulativeDeaths => "cumulative_deaths",
            Field::PopulationEstimate => "population_estimate",
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Rainfall => "rainfall",
            Field::Radiance => "radiance",
            Field::GdpGrowthRate => "gdp_growth_rate",
            Field::InflationRate => "inflation_rate",
            Field::Incidence => "incidence_per_100k",
        }
    }

    /// Fields that are read from sources (everything except the derived target).
    pub fn is_observed(self) -> bool {
        self != Field::Incidence
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Field::ALL
            .into_iter()
            .find(|f| f.column_name() == s)
            .ok_or_else(|| format!("Unknown field `{s}`."))
    }
}

/// An engineered feature addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    /// A unified field value as-is.
    Raw(Field),
    DayOfYear,
    /// 1 for June..=September, 0 otherwise.
    Monsoon,
    /// Trailing mean over `window` records ending at (and including) the current one.
    RollingMean { field: Field, window: usize },
}

impl Feature {
    pub fn name(&self) -> String {
        match self {
            Feature::Raw(field) => field.column_name().to_string(),
            Feature::DayOfYear => "day_of_year".to_string(),
            Feature::Monsoon => "is_monsoon".to_string(),
            Feature::RollingMean { field, window } => {
                format!("{}_rolling_mean_{window}", field.column_name())
            }
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "day_of_year" => return Ok(Feature::DayOfYear),
            "is_monsoon" => return Ok(Feature::Monsoon),
            _ => {}
        }

        if let Some((field, window)) = s.rsplit_once("_rolling_mean_") {
            let field = field.parse::<Field>()?;
            let window = window
                .parse::<usize>()
                .ok()
                .filter(|w| *w > 0)
                .ok_or_else(|| format!("Invalid rolling window in `{s}`."))?;
            return Ok(Feature::RollingMean { field, window });
        }

        s.parse::<Field>()
            .map(Feature::Raw)
            .map_err(|_| format!("Unknown feature `{s}`."))
    }
}

impl Serialize for Feature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for Feature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One calendar day of fused data.
///
/// After unification every field is set; there is no "missing" state here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub case_count: f64,
    pub cumulative_deaths: f64,
    pub population_estimate: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub radiance: f64,
    pub gdp_growth_rate: f64,
    pub inflation_rate: f64,
    #[serde(rename = "incidence_per_100k")]
    pub incidence: f64,
}

impl Observation {
    /// A record with every numeric field set to zero.
    pub fn zeroed(date: NaiveDate) -> Self {
        Self {
            date,
            case_count: 0.0,
            cumulative_deaths: 0.0,
            population_estimate: 0.0,
            temperature: 0.0,
            humidity: 0.0,
            rainfall: 0.0,
            radiance: 0.0,
            gdp_growth_rate: 0.0,
            inflation_rate: 0.0,
            incidence: 0.0,
        }
    }

    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::CaseCount => self.case_count,
            Field::CumulativeDeaths => self.cumulative_deaths,
            Field::PopulationEstimate => self.population_estimate,
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
            Field::Rainfall => self.rainfall,
            Field::Radiance => self.radiance,
            Field::GdpGrowthRate => self.gdp_growth_rate,
            Field::InflationRate => self.inflation_rate,
            Field::Incidence => self.incidence,
        }
    }

    pub fn set(&mut self, field: Field, value: f64) {
        let slot = match field {
            Field::CaseCount => &mut self.case_count,
            Field::CumulativeDeaths => &mut self.cumulative_deaths,
            Field::PopulationEstimate => &mut self.population_estimate,
            Field::Temperature => &mut self.temperature,
            Field::Humidity => &mut self.humidity,
            Field::Rainfall => &mut self.rainfall,
            Field::Radiance => &mut self.radiance,
            Field::GdpGrowthRate => &mut self.gdp_growth_rate,
            Field::InflationRate => &mut self.inflation_rate,
            Field::Incidence => &mut self.incidence,
        };
        *slot = value;
    }
}

/// Day-of-year (1..=366) for a date.
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}

/// Peak transmission months (June..=September).
pub fn is_monsoon(date: NaiveDate) -> bool {
    (6..=9).contains(&date.month())
}

/// Which external table a set of rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Disease,
    Weather,
    Population,
    NightLight,
    Economic,
    Live,
}

impl SourceKind {
    /// Sources whose absence aborts the pipeline.
    pub const MANDATORY: [SourceKind; 4] = [
        SourceKind::Disease,
        SourceKind::Weather,
        SourceKind::Population,
        SourceKind::NightLight,
    ];

    pub fn is_mandatory(self) -> bool {
        Self::MANDATORY.contains(&self)
    }

    pub fn required_columns(self) -> &'static [Field] {
        match self {
            SourceKind::Disease => &[Field::CaseCount],
            SourceKind::Weather => &[Field::Temperature, Field::Humidity, Field::Rainfall],
            SourceKind::Population => &[Field::PopulationEstimate],
            SourceKind::NightLight => &[Field::Radiance],
            SourceKind::Economic | SourceKind::Live => &[],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Disease => "disease",
            SourceKind::Weather => "weather",
            SourceKind::Population => "population",
            SourceKind::NightLight => "night-light",
            SourceKind::Economic => "economic",
            SourceKind::Live => "live",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One dated row of a source table. `values` is aligned with `SourceTable::columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

/// A date-keyed input table that passed its schema contract.
#[derive(Debug, Clone)]
pub struct SourceTable {
    kind: SourceKind,
    columns: Vec<Field>,
    rows: Vec<SourceRow>,
}

impl SourceTable {
    /// Validate a table against the schema contract for `kind`.
    pub fn new(kind: SourceKind, columns: Vec<Field>, rows: Vec<SourceRow>) -> Result<Self, SchemaError> {
        for &required in kind.required_columns() {
            if !columns.contains(&required) {
                return Err(SchemaError::MissingColumn {
                    table: kind,
                    column: required,
                });
            }
        }
        if columns.contains(&Field::Incidence) {
            return Err(SchemaError::DerivedColumn {
                table: kind,
                column: Field::Incidence,
            });
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.values.len() != columns.len() {
                return Err(SchemaError::RowWidth {
                    table: kind,
                    row: idx,
                    expected: columns.len(),
                    found: row.values.len(),
                });
            }
        }
        Ok(Self { kind, columns, rows })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn columns(&self) -> &[Field] {
        &self.columns
    }

    pub fn rows(&self) -> &[SourceRow] {
        &self.rows
    }

    /// Known `(date, value)` pairs for one column, in row order.
    pub fn values_of(&self, field: Field) -> Vec<(NaiveDate, f64)> {
        let Some(col) = self.columns.iter().position(|c| *c == field) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|r| r.values[col].filter(|v| v.is_finite()).map(|v| (r.date, v)))
            .collect()
    }
}

/// A single current-conditions reading (e.g. from a weather API).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveObservation {
    pub date: NaiveDate,
    pub temperature: f64,
    pub humidity: f64,
    /// Rainfall over the last hour, if the provider reported it.
    pub rainfall: Option<f64>,
}

impl LiveObservation {
    /// Express the reading as a one-row weather-like table.
    ///
    /// Missing rainfall is recorded as 0.0 mm (no rain reported in the last hour).
    pub fn to_source_table(&self) -> SourceTable {
        let row = SourceRow {
            date: self.date,
            values: vec![
                Some(self.temperature),
                Some(self.humidity),
                Some(self.rainfall.unwrap_or(0.0)),
            ],
        };
        SourceTable {
            kind: SourceKind::Live,
            columns: vec![Field::Temperature, Field::Humidity, Field::Rainfall],
            rows: vec![row],
        }
    }
}

/// Collection of the input tables for one run.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    pub tables: Vec<SourceTable>,
    pub live: Option<LiveObservation>,
}

impl SourceSet {
    pub fn get(&self, kind: SourceKind) -> Option<&SourceTable> {
        self.tables.iter().find(|t| t.kind() == kind)
    }
}

/// Condition noticed while fusing data. Never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityIssue {
    /// Population was zero, negative or non-finite; incidence set to 0.
    InvalidPopulation { date: NaiveDate },
    /// No source supplied any value for this field; it was set to 0 everywhere.
    NoObservations { field: Field },
    /// A source listed the same date more than once; the last row won.
    DuplicateDate { table: SourceKind, date: NaiveDate },
    /// The live reading is neither inside the history nor on the day after it;
    /// it still sets the risk index but adds no record.
    LiveOutsideSpan { date: NaiveDate },
}

impl fmt::Display for DataQualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityIssue::InvalidPopulation { date } => {
                write!(f, "{date}: population missing or non-positive; incidence set to 0")
            }
            DataQualityIssue::NoObservations { field } => {
                write!(f, "no values for `{field}` in any source; defaulted to 0")
            }
            DataQualityIssue::DuplicateDate { table, date } => {
                write!(f, "{table} source lists {date} more than once; last row kept")
            }
            DataQualityIssue::LiveOutsideSpan { date } => {
                write!(f, "live reading of {date} is not adjacent to the history; used for the risk index only")
            }
        }
    }
}

/// Continuous daily table produced by the Unifier.
#[derive(Debug, Clone)]
pub struct UnifiedSeries {
    records: Vec<Observation>,
    issues: Vec<DataQualityIssue>,
}

impl UnifiedSeries {
    pub fn new(records: Vec<Observation>, issues: Vec<DataQualityIssue>) -> Self {
        Self { records, issues }
    }

    pub fn records(&self) -> &[Observation] {
        &self.records
    }

    pub fn issues(&self) -> &[DataQualityIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn values(&self, field: Field) -> Vec<f64> {
        self.records.iter().map(|r| r.get(field)).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }
}

/// One rolling-mean value attached to a feature row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingValue {
    pub field: Field,
    pub window: usize,
    pub value: f64,
}

/// An observation plus its engineered features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub observation: Observation,
    pub day_of_year: u32,
    pub monsoon: bool,
    pub rolling: Vec<RollingValue>,
}

impl FeatureRow {
    pub fn date(&self) -> NaiveDate {
        self.observation.date
    }

    /// Value of a feature, or `None` if this row does not carry it.
    pub fn value(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Raw(field) => Some(self.observation.get(field)),
            Feature::DayOfYear => Some(f64::from(self.day_of_year)),
            Feature::Monsoon => Some(if self.monsoon { 1.0 } else { 0.0 }),
            Feature::RollingMean { field, window } => self
                .rolling
                .iter()
                .find(|r| r.field == field && r.window == window)
                .map(|r| r.value),
        }
    }

    /// True when every listed feature is present and finite.
    pub fn is_resolved(&self, features: &[Feature]) -> bool {
        features
            .iter()
            .all(|f| self.value(*f).is_some_and(f64::is_finite))
    }
}

/// Engineered table shared by the causal and forecasting stages.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the first row carries `feature` (all rows share one layout).
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.rows.first().is_some_and(|r| r.value(feature).is_some())
    }

    /// Full column for a feature, or `None` if any row lacks it.
    pub fn column(&self, feature: Feature) -> Option<Vec<f64>> {
        self.rows.iter().map(|r| r.value(feature)).collect()
    }
}

/// Directed lagged association `cause -> effect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CausalLink {
    pub cause: Feature,
    pub effect: Feature,
    /// Lag in days (1..=max_lag) with the strongest absolute correlation.
    pub lag: usize,
    /// Signed Pearson correlation at `lag`.
    pub correlation: f64,
}

/// One forecast day.
///
/// Invariant: `0 <= lower <= point <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Latest macroeconomic context (percent values).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MacroContext {
    pub gdp_growth_rate: f64,
    pub inflation_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_names_round_trip_through_parser() {
        let names = [
            "day_of_year",
            "is_monsoon",
            "temperature_rolling_mean_14",
            "incidence_per_100k_rolling_mean_7",
            "radiance",
        ];
        for name in names {
            let feature: Feature = name.parse().unwrap();
            assert_eq!(feature.name(), name);
        }
    }

    #[test]
    fn feature_parser_rejects_bad_window() {
        assert!("humidity_rolling_mean_0".parse::<Feature>().is_err());
        assert!("humidity_rolling_mean_x".parse::<Feature>().is_err());
        assert!("wind_speed".parse::<Feature>().is_err());
    }

    #[test]
    fn monsoon_covers_june_to_september() {
        let d = |m| NaiveDate::from_ymd_opt(2024, m, 15).unwrap();
        assert!(!is_monsoon(d(5)));
        assert!(is_monsoon(d(6)));
        assert!(is_monsoon(d(9)));
        assert!(!is_monsoon(d(10)));
        assert_eq!(day_of_year(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()), 366);
    }

    #[test]
    fn source_table_rejects_missing_required_column() {
        let err = SourceTable::new(SourceKind::Weather, vec![Field::Temperature, Field::Humidity], vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MissingColumn {
                table: SourceKind::Weather,
                column: Field::Rainfall
            }
        ));
    }

    #[test]
    fn live_observation_defaults_missing_rainfall_to_zero() {
        let live = LiveObservation {
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            temperature: 30.0,
            humidity: 85.0,
            rainfall: None,
        };
        let table = live.to_source_table();
        assert_eq!(table.values_of(Field::Rainfall), vec![(live.date, 0.0)]);
    }
}
