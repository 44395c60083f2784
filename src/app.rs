//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads source CSVs (or generates the demo dataset)
//! - optionally fetches a live weather reading
//! - runs the analysis pipeline
//! - prints the briefing and writes exports

use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use crate::cli::{AnalysisArgs, Command, DemoArgs, RunArgs};
use crate::data::{DemoConfig, LiveWeatherSource, OpenWeatherClient, StaticReading, generate_demo};
use crate::domain::{Coordinates, CostModel, DateWindow, PipelineConfig, SourceSet};
use crate::error::{AppError, EXIT_INPUT};
use crate::io::{SourceFiles, load_sources, write_all};
use crate::report::{AnalysisReport, format_briefing, format_run_summary};

pub mod pipeline;

/// Entry point for the `hawkeye` binary.
pub fn run() -> Result<(), AppError> {
    crate::logging::init_tracing();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let mut config = config_from_args(&args.analysis)?;
    config.location = Coordinates {
        lat: args.lat,
        lon: args.lon,
    };
    config.live_timeout = Duration::from_secs(args.timeout_secs);

    let ingested = load_sources(&SourceFiles::in_dir(&args.data_dir))?;
    for (kind, err) in &ingested.row_errors {
        warn!(source = %kind, line = err.line, "{}", err.message);
    }
    info!(
        dir = %args.data_dir.display(),
        rows = ingested.rows_read,
        skipped = ingested.row_errors.len(),
        "sources loaded"
    );

    let client = if args.no_live {
        None
    } else {
        match OpenWeatherClient::from_env(config.live_timeout) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(error = %e, "live weather disabled");
                None
            }
        }
    };
    let live = client.as_ref().map(|c| c as &dyn LiveWeatherSource);

    execute(ingested.sources, live, &config, &args.analysis)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = config_from_args(&args.analysis)?;
    let demo = generate_demo(&DemoConfig {
        seed: args.seed,
        days: args.days,
        ..DemoConfig::default()
    })?;
    info!(seed = args.seed, days = args.days, "synthetic dataset generated");

    let reading = StaticReading(demo.live);
    execute(demo.sources, Some(&reading), &config, &args.analysis)
}

/// Run the pipeline, print the briefing and write exports.
fn execute(
    sources: SourceSet,
    live: Option<&dyn LiveWeatherSource>,
    config: &PipelineConfig,
    args: &AnalysisArgs,
) -> Result<(), AppError> {
    let output = pipeline::run_pipeline(sources, live, config)?;
    let briefing = format_briefing(&output, &config.costs);

    println!("{briefing}");
    if args.summary {
        println!("{}", format_run_summary(&output));
    }

    if !args.no_export {
        let report = AnalysisReport::from_output(&output, &config.costs);
        let written = write_all(&args.out_dir, &report, &briefing)?;
        for path in written {
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}

/// Build the pipeline configuration from CLI flags, rejecting out-of-range values.
pub fn config_from_args(args: &AnalysisArgs) -> Result<PipelineConfig, AppError> {
    if args.horizon == 0 {
        return Err(AppError::new(EXIT_INPUT, "--horizon must be at least 1."));
    }
    if args.max_lag == 0 {
        return Err(AppError::new(EXIT_INPUT, "--max-lag must be at least 1."));
    }
    if !(args.threshold.is_finite() && (0.0..=1.0).contains(&args.threshold)) {
        return Err(AppError::new(EXIT_INPUT, "--threshold must be within [0, 1]."));
    }
    if !(args.validation_fraction > 0.0 && args.validation_fraction < 1.0) {
        return Err(AppError::new(EXIT_INPUT, "--validation-fraction must be within (0, 1)."));
    }
    if !(0.0..=1.0).contains(&args.prevention_efficacy) {
        return Err(AppError::new(EXIT_INPUT, "--prevention-efficacy must be within [0, 1]."));
    }
    let costs = [args.cost_per_case, args.productivity_loss, args.prevention_cost];
    if costs.iter().any(|c| !c.is_finite() || *c < 0.0) {
        return Err(AppError::new(EXIT_INPUT, "Cost options must be finite and non-negative."));
    }

    let window = match (args.start, args.end) {
        (Some(start), Some(end)) if start > end => {
            return Err(AppError::new(EXIT_INPUT, format!("--start {start} is after --end {end}.")));
        }
        (Some(start), Some(end)) => Some(DateWindow { start, end }),
        _ => None,
    };

    let mut config = PipelineConfig {
        window,
        costs: CostModel {
            cost_per_case: args.cost_per_case,
            productivity_loss_per_case: args.productivity_loss,
            prevention_cost_per_capita: args.prevention_cost,
            prevention_efficacy: args.prevention_efficacy,
        },
        ..PipelineConfig::default()
    };
    config.causal.max_lag = args.max_lag;
    config.causal.threshold = args.threshold;
    config.forecast.horizon = args.horizon;
    config.forecast.validation_fraction = args.validation_fraction;
    config.forecast.regressor = args.regressor;
    config.forecast.gp_max_train_rows = args.gp_max_rows.max(1);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::domain::RegressorKind;

    fn analysis(extra: &[&str]) -> AnalysisArgs {
        let mut argv = vec!["hawkeye", "demo"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Demo(args) => args.analysis,
            Command::Run(_) => unreachable!(),
        }
    }

    #[test]
    fn defaults_match_pipeline_defaults() {
        let config = config_from_args(&analysis(&[])).unwrap();
        let defaults = PipelineConfig::default();
        assert_eq!(config.forecast.horizon, defaults.forecast.horizon);
        assert_eq!(config.causal.max_lag, defaults.causal.max_lag);
        assert_eq!(config.causal.threshold, defaults.causal.threshold);
        assert_eq!(config.forecast.validation_fraction, defaults.forecast.validation_fraction);
        assert_eq!(config.costs, defaults.costs);
        assert!(config.window.is_none());
    }

    #[test]
    fn flags_flow_into_config() {
        let config = config_from_args(&analysis(&[
            "--horizon",
            "30",
            "--regressor",
            "gp",
            "--cost-per-case",
            "200",
            "--start",
            "2023-01-10",
            "--end",
            "2023-06-30",
        ]))
        .unwrap();
        assert_eq!(config.forecast.horizon, 30);
        assert_eq!(config.forecast.regressor, RegressorKind::Gp);
        assert_eq!(config.costs.cost_per_case, 200.0);
        assert_eq!(config.window.unwrap().end.to_string(), "2023-06-30");
    }

    #[test]
    fn invalid_values_are_input_errors() {
        for bad in [
            &["--horizon", "0"][..],
            &["--validation-fraction", "1.0"][..],
            &["--threshold", "1.5"][..],
            &["--start", "2023-05-01", "--end", "2023-04-01"][..],
        ] {
            let err = config_from_args(&analysis(bad)).unwrap_err();
            assert_eq!(err.exit_code(), EXIT_INPUT, "{bad:?}");
        }
    }

    #[test]
    fn demo_run_writes_every_export() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let out_str = out.to_string_lossy().to_string();
        let args = match Cli::try_parse_from(["hawkeye", "demo", "--days", "120", "-o", out_str.as_str()])
            .unwrap()
            .command
        {
            Command::Demo(args) => args,
            Command::Run(_) => unreachable!(),
        };
        handle_demo(args).unwrap();

        for file in [
            crate::io::FORECAST_FILE,
            crate::io::VALIDATION_FILE,
            crate::io::LINKS_FILE,
            crate::io::BRIEFING_FILE,
            crate::io::REPORT_FILE,
        ] {
            assert!(out.join(file).exists(), "{file} missing");
        }
        let briefing = std::fs::read_to_string(out.join(crate::io::BRIEFING_FILE)).unwrap();
        assert!(briefing.contains("--- CURRENT RISK DASHBOARD ---"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join(crate::io::REPORT_FILE)).unwrap()).unwrap();
        assert_eq!(json["data"]["days"], 121);
    }
}
