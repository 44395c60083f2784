//! Reporting: the briefing text, the terminal summary and the
//! machine-readable run report.

pub mod format;

use chrono::NaiveDate;
use serde::Serialize;

use crate::app::pipeline::PipelineOutput;
use crate::burden::{BurdenReport, RiskLevel};
use crate::domain::{CausalLink, CostModel, DataQualityIssue, LiveObservation, MacroContext};
use crate::forecast::Forecast;

pub use format::*;

#[derive(Debug, Clone, Serialize)]
pub struct DataSummary {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub days: usize,
    pub feature_rows: usize,
    pub issues: Vec<DataQualityIssue>,
}

/// Everything a downstream tool needs from one run (`analysis_report.json`).
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub tool: String,
    pub version: String,
    pub data: DataSummary,
    pub risk: RiskLevel,
    pub live: Option<LiveObservation>,
    pub causal_links: Vec<CausalLink>,
    pub forecast: Option<Forecast>,
    pub forecast_error: Option<String>,
    pub burden: BurdenReport,
    pub costs: CostModel,
    pub macro_context: MacroContext,
}

impl AnalysisReport {
    pub fn from_output(output: &PipelineOutput, costs: &CostModel) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            data: DataSummary {
                first_date: output.series.first_date(),
                last_date: output.series.last_date(),
                days: output.series.len(),
                feature_rows: output.features.len(),
                issues: output.series.issues().to_vec(),
            },
            risk: output.risk,
            live: output.live.clone(),
            causal_links: output.causal.links.clone(),
            forecast: output.forecast.clone(),
            forecast_error: output.forecast_error.as_ref().map(ToString::to_string),
            burden: output.burden.clone(),
            costs: *costs,
            macro_context: output.macro_context,
        }
    }
}
