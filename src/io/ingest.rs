//! CSV ingest for the source tables.
//!
//! Each file becomes one `SourceTable` that satisfies its schema contract.
//!
//! Design goals:
//! - **Strict schema** for required columns (typed `SchemaError`, exit code 2)
//! - **Row-level validation** (skip rows with a bad date, but report them)
//! - **Lenient cells**: blank or non-numeric values are missing, the Unifier fills them
//! - **No analysis here**: values are stored as read

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::domain::{Field, SourceKind, SourceRow, SourceSet, SourceTable};
use crate::error::SchemaError;

/// Known column spellings mapped to canonical field names.
const ALIASES: [(&str, &str); 9] = [
    ("dhaka_cases", "case_count"),
    ("dhaka_population_estimated", "population_estimate"),
    ("nightlight_radiance", "radiance"),
    ("avg_rad", "radiance"),
    ("gdp_growth", "gdp_growth_rate"),
    ("inflation", "inflation_rate"),
    ("temp", "temperature"),
    ("rain", "rainfall"),
    ("precipitation", "rainfall"),
];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// One parsed file: validated table plus what was skipped.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub table: SourceTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Where each source lives. Missing optional files are skipped.
#[derive(Debug, Clone)]
pub struct SourceFiles {
    pub disease: PathBuf,
    pub weather: PathBuf,
    pub population: PathBuf,
    pub nightlight: PathBuf,
    pub economic: PathBuf,
}

impl SourceFiles {
    /// Conventional file names inside a data directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            disease: dir.join("disease.csv"),
            weather: dir.join("weather.csv"),
            population: dir.join("population.csv"),
            nightlight: dir.join("nightlights.csv"),
            economic: dir.join("economic.csv"),
        }
    }

    fn entries(&self) -> [(SourceKind, &Path); 5] {
        [
            (SourceKind::Disease, self.disease.as_path()),
            (SourceKind::Weather, self.weather.as_path()),
            (SourceKind::Population, self.population.as_path()),
            (SourceKind::NightLight, self.nightlight.as_path()),
            (SourceKind::Economic, self.economic.as_path()),
        ]
    }
}

/// All loaded tables plus per-table row errors.
#[derive(Debug, Clone, Default)]
pub struct IngestedSources {
    pub sources: SourceSet,
    pub row_errors: Vec<(SourceKind, RowError)>,
    pub rows_read: usize,
}

/// Load every configured source. Mandatory files must exist.
pub fn load_sources(files: &SourceFiles) -> Result<IngestedSources, SchemaError> {
    let mut out = IngestedSources::default();
    for (kind, path) in files.entries() {
        if !kind.is_mandatory() && !path.exists() {
            info!(source = %kind, path = %path.display(), "optional source not found; skipped");
            continue;
        }
        let loaded = load_source(path, kind)?;
        info!(
            source = %kind,
            rows = loaded.table.rows().len(),
            skipped = loaded.row_errors.len(),
            "loaded source"
        );
        out.rows_read += loaded.rows_read;
        out.row_errors
            .extend(loaded.row_errors.into_iter().map(|e| (kind, e)));
        out.sources.tables.push(loaded.table);
    }
    Ok(out)
}

pub fn load_source(path: &Path, kind: SourceKind) -> Result<LoadedSource, SchemaError> {
    let file = File::open(path).map_err(|e| SchemaError::Unreadable {
        table: kind,
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    read_source(file, kind, &path.display().to_string())
}

/// Parse one source table from any reader. `origin` names it in errors.
pub fn read_source<R: Read>(input: R, kind: SourceKind, origin: &str) -> Result<LoadedSource, SchemaError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| SchemaError::Unreadable {
            table: kind,
            path: origin.to_string(),
            reason: format!("failed to read CSV headers: {e}"),
        })?
        .clone();
    let header_map = build_header_map(&headers);

    let date_key = if header_map.contains_key("date") {
        DateKey::Date
    } else if header_map.contains_key("year") {
        DateKey::Year
    } else {
        return Err(SchemaError::MissingDateColumn { table: kind });
    };

    let columns: Vec<Field> = Field::ALL
        .into_iter()
        .filter(|f| f.is_observed() && header_map.contains_key(f.column_name()))
        .collect();
    if header_map.contains_key(Field::Incidence.column_name()) {
        debug!(source = %kind, "ignoring supplied incidence column; it is always derived");
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; CSV lines are 1-based
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map, date_key, &columns) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        warn!(source = %kind, skipped = row_errors.len(), "skipped rows with unusable dates");
    }

    let table = SourceTable::new(kind, columns, rows)?;
    Ok(LoadedSource {
        table,
        row_errors,
        rows_read,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateKey {
    Date,
    /// Annual rows, dated January 1.
    Year,
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        let name = normalize_header_name(name);
        let canonical = ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name.clone(), |(_, canon)| (*canon).to_string());
        // A canonical header wins over an alias of the same field.
        if canonical != name && map.contains_key(&canonical) {
            continue;
        }
        map.insert(canonical, idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    date_key: DateKey,
    columns: &[Field],
) -> Result<SourceRow, String> {
    let date = match date_key {
        DateKey::Date => parse_date(get_required(record, header_map, "date")?)?,
        DateKey::Year => parse_year(get_required(record, header_map, "year")?)?,
    };
    let values = columns
        .iter()
        .map(|f| parse_opt_f64(get_optional(record, header_map, f.column_name())))
        .collect();
    Ok(SourceRow { date, values })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    // Timestamps such as `2024-03-01 00:00:00` or `2024-03-01T06:00:00Z`.
    if let Some(prefix) = s.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD."
    ))
}

fn parse_year(s: &str) -> Result<NaiveDate, String> {
    let year = s
        .parse::<i32>()
        .ok()
        .or_else(|| {
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && v.fract() == 0.0)
                .map(|v| v as i32)
        })
        .ok_or_else(|| format!("Invalid year '{s}'."))?;
    NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| format!("Year out of range: {year}."))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?;
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
