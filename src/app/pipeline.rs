//! Shared analysis pipeline used by the `run` and `demo` commands.
//!
//! Stages run strictly in order, each consuming the previous stage's output:
//! live fetch (optional) -> unify -> features -> {causal, forecast} -> burden
//!
//! The commands only differ in where the source tables come from.

use tracing::{info, warn};

use crate::burden::{BurdenReport, RiskLevel, assess, classify_risk};
use crate::causal::{CausalDiscovery, discover};
use crate::data::LiveWeatherSource;
use crate::domain::{FeatureTable, LiveObservation, MacroContext, PipelineConfig, SourceSet, UnifiedSeries};
use crate::error::{AppError, ForecastError};
use crate::features::engineer;
use crate::forecast::{Forecast, forecast};
use crate::unify::{macro_context, unify};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub series: UnifiedSeries,
    pub features: FeatureTable,
    pub causal: CausalDiscovery,
    pub forecast: Option<Forecast>,
    /// Why the forecast is missing, when it is.
    pub forecast_error: Option<ForecastError>,
    pub burden: BurdenReport,
    pub live: Option<LiveObservation>,
    pub risk: RiskLevel,
    pub macro_context: MacroContext,
}

/// Execute the full pipeline.
///
/// A live reading already present in `sources` is used as is; otherwise
/// `live_source` is asked once. A failed fetch is logged and skipped.
pub fn run_pipeline(
    mut sources: SourceSet,
    live_source: Option<&dyn LiveWeatherSource>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, AppError> {
    // 1) Live reading.
    if sources.live.is_none() {
        if let Some(src) = live_source {
            match src.current(config.location) {
                Ok(obs) => {
                    info!(
                        date = %obs.date,
                        temperature = obs.temperature,
                        humidity = obs.humidity,
                        "live weather fetched"
                    );
                    sources.live = Some(obs);
                }
                Err(e) => warn!(error = %e, "live weather unavailable; proceeding with historical data only"),
            }
        }
    }
    let live = sources.live.clone();
    let risk = classify_risk(live.as_ref());

    // 2) Unify and engineer.
    let series = unify(&sources, config.window)?;
    let features = engineer(&series, &config.features);
    info!(
        days = series.len(),
        first = ?series.first_date(),
        last = ?series.last_date(),
        issues = series.issues().len(),
        "unified series ready"
    );

    // 3) Causal discovery and forecasting read the same table independently.
    let causal = discover(&features, &config.causal);
    let (forecast, forecast_error) = match forecast(&features, &config.forecast, &config.features) {
        Ok(f) => (Some(f), None),
        Err(e) => {
            warn!(error = %e, "forecast omitted");
            (None, Some(e))
        }
    };

    // 4) Burden from historical totals plus whatever forecast exists.
    let points = forecast.as_ref().map_or(&[][..], |f| f.points.as_slice());
    let burden = assess(&series, points, &config.costs);

    Ok(PipelineOutput {
        macro_context: macro_context(&sources),
        series,
        features,
        causal,
        forecast,
        forecast_error,
        burden,
        live,
        risk,
    })
}
