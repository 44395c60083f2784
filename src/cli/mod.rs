//! Command-line parsing for the dengue early-warning pipeline.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the analysis code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::RegressorKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "hawkeye",
    version,
    about = "Dengue early warning: data fusion, causal discovery, probabilistic forecasting and burden estimates"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load source CSVs from a data directory, run the pipeline and write exports.
    Run(RunArgs),
    /// Run the pipeline on a seeded synthetic dataset (no files or network needed).
    Demo(DemoArgs),
}

/// Options shared by every command that runs the pipeline.
#[derive(Debug, Args, Clone)]
pub struct AnalysisArgs {
    /// Directory for forecast/links/validation CSVs, the briefing and the JSON report.
    #[arg(short = 'o', long, default_value = "output")]
    pub out_dir: PathBuf,

    /// Skip writing export files (briefing is still printed).
    #[arg(long)]
    pub no_export: bool,

    /// Print the technical run summary after the briefing.
    #[arg(long)]
    pub summary: bool,

    /// Days to forecast past the last known date.
    #[arg(long, default_value_t = 14)]
    pub horizon: usize,

    /// Largest lag (days) scanned by the causal discoverer.
    #[arg(long, default_value_t = 7)]
    pub max_lag: usize,

    /// Minimum absolute correlation for a causal test to accept a variable.
    #[arg(long, default_value_t = 0.25)]
    pub threshold: f64,

    /// Share of the most recent rows held out for validation.
    #[arg(long, default_value_t = 0.2)]
    pub validation_fraction: f64,

    /// Probabilistic regressor used by the forecaster.
    #[arg(long, value_enum, default_value_t = RegressorKind::BayesRidge)]
    pub regressor: RegressorKind,

    /// Cap on the number of most recent rows a Gaussian process trains on.
    #[arg(long, default_value_t = 365)]
    pub gp_max_rows: usize,

    /// First day of the analysis window (YYYY-MM-DD).
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,

    /// Last day of the analysis window (YYYY-MM-DD).
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    /// Direct treatment cost per case (USD).
    #[arg(long, default_value_t = 150.0)]
    pub cost_per_case: f64,

    /// Lost productivity per case (USD).
    #[arg(long, default_value_t = 500.0)]
    pub productivity_loss: f64,

    /// Vector-control spend per resident (USD).
    #[arg(long, default_value_t = 5.0)]
    pub prevention_cost: f64,

    /// Share of cases a prevention programme averts (0..=1).
    #[arg(long, default_value_t = 0.5)]
    pub prevention_efficacy: f64,
}

/// Options for `hawkeye run`.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Directory holding disease.csv, weather.csv, population.csv, nightlights.csv
    /// and (optionally) economic.csv.
    #[arg(short = 'd', long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Do not query the live weather service.
    #[arg(long)]
    pub no_live: bool,

    /// Latitude for the live weather lookup.
    #[arg(long, default_value_t = 23.8103, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude for the live weather lookup.
    #[arg(long, default_value_t = 90.4125, allow_negative_numbers = true)]
    pub lon: f64,

    /// Live weather request timeout (seconds).
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

/// Options for `hawkeye demo`.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Random seed for the synthetic dataset.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of historical days to generate.
    #[arg(long, default_value_t = 730)]
    pub days: usize,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}
