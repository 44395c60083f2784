//! Export run results to CSV, JSON and text.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{CausalLink, ForecastPoint};
use crate::error::{AppError, EXIT_INPUT};
use crate::forecast::ValidationReport;
use crate::report::AnalysisReport;

pub const FORECAST_FILE: &str = "forecast_table.csv";
pub const LINKS_FILE: &str = "causal_links.csv";
pub const VALIDATION_FILE: &str = "validation.csv";
pub const BRIEFING_FILE: &str = "executive_briefing.txt";
pub const REPORT_FILE: &str = "analysis_report.json";

fn create(path: &Path, what: &str) -> Result<File, AppError> {
    File::create(path).map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create {what} '{}': {e}", path.display())))
}

fn write_err(what: &str) -> impl Fn(std::io::Error) -> AppError + '_ {
    move |e| AppError::new(EXIT_INPUT, format!("Failed to write {what}: {e}"))
}

pub fn write_forecast_csv(path: &Path, points: &[ForecastPoint]) -> Result<(), AppError> {
    let mut file = create(path, "forecast CSV")?;
    writeln!(file, "date,forecast,lower_ci,upper_ci").map_err(write_err("forecast CSV header"))?;
    for p in points {
        writeln!(file, "{},{:.6},{:.6},{:.6}", p.date, p.point, p.lower, p.upper)
            .map_err(write_err("forecast CSV row"))?;
    }
    Ok(())
}

pub fn write_causal_links_csv(path: &Path, links: &[CausalLink]) -> Result<(), AppError> {
    let mut file = create(path, "causal links CSV")?;
    writeln!(file, "cause,effect,lag_days,correlation").map_err(write_err("causal links CSV header"))?;
    for l in links {
        writeln!(file, "{},{},{},{:.6}", l.cause, l.effect, l.lag, l.correlation)
            .map_err(write_err("causal links CSV row"))?;
    }
    Ok(())
}

pub fn write_validation_csv(path: &Path, report: &ValidationReport) -> Result<(), AppError> {
    let mut file = create(path, "validation CSV")?;
    writeln!(file, "date,actual,predicted,std").map_err(write_err("validation CSV header"))?;
    for r in &report.rows {
        writeln!(file, "{},{:.6},{:.6},{:.6}", r.date, r.actual, r.predicted, r.std)
            .map_err(write_err("validation CSV row"))?;
    }
    Ok(())
}

pub fn write_briefing(path: &Path, briefing: &str) -> Result<(), AppError> {
    let mut file = create(path, "briefing")?;
    file.write_all(briefing.as_bytes()).map_err(write_err("briefing"))?;
    Ok(())
}

pub fn write_report_json(path: &Path, report: &AnalysisReport) -> Result<(), AppError> {
    let file = create(path, "report JSON")?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Write every export into `dir` (created if needed). Returns the files written.
///
/// The forecast and validation files are only written when those stages produced output.
pub fn write_all(dir: &Path, report: &AnalysisReport, briefing: &str) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create output directory '{}': {e}", dir.display())))?;

    let mut written = Vec::new();

    if let Some(forecast) = &report.forecast {
        let path = dir.join(FORECAST_FILE);
        write_forecast_csv(&path, &forecast.points)?;
        written.push(path);

        if let Some(validation) = &forecast.validation {
            let path = dir.join(VALIDATION_FILE);
            write_validation_csv(&path, validation)?;
            written.push(path);
        }
    }

    let path = dir.join(LINKS_FILE);
    write_causal_links_csv(&path, &report.causal_links)?;
    written.push(path);

    let path = dir.join(BRIEFING_FILE);
    write_briefing(&path, briefing)?;
    written.push(path);

    let path = dir.join(REPORT_FILE);
    write_report_json(&path, report)?;
    written.push(path);

    info!(dir = %dir.display(), files = written.len(), "exports written");
    Ok(written)
}
