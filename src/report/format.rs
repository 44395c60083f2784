//! Formatted terminal and text output.
//!
//! We keep formatting code in one place so:
//! - the analysis code stays clean and testable
//! - output changes are localized (important for snapshot-style tests)

use crate::app::pipeline::PipelineOutput;
use crate::domain::{CausalLink, CostModel, ForecastPoint};
use crate::forecast::ValidationReport;

const RULE_WIDTH: usize = 70;
/// Data-quality lines shown in the briefing before collapsing the rest.
const MAX_ISSUES_SHOWN: usize = 10;

/// Human-readable briefing for decision makers.
pub fn format_briefing(output: &PipelineOutput, costs: &CostModel) -> String {
    let mut out = String::new();

    out.push_str("HAWKEYE - EXECUTIVE BRIEFING\n");
    if let (Some(first), Some(last)) = (output.series.first_date(), output.series.last_date()) {
        out.push_str(&format!("Data: {first} to {last} ({} days)\n", output.series.len()));
    }
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push_str("\n\n");

    out.push_str("--- CURRENT RISK DASHBOARD ---\n");
    out.push_str(&format!(
        "  - Live Mosquito Risk Index: {}\n",
        output.risk.as_str().to_uppercase()
    ));
    match &output.live {
        Some(live) => out.push_str(&format!(
            "    (Based on Temp: {:.1}°C, Humidity: {:.0}% on {})\n",
            live.temperature, live.humidity, live.date
        )),
        None => out.push_str("    (No live reading available)\n"),
    }
    out.push_str(&format!("  - Recent Case Trend (7-day avg): {}\n", output.burden.trend));
    match (&output.burden.peak, &output.forecast_error) {
        (Some(peak), _) => out.push_str(&format!(
            "  - Forecasted Peak: {:.1} cases/100k around {}\n",
            peak.value, peak.date
        )),
        (None, Some(err)) => out.push_str(&format!("  - Forecast unavailable: {err}\n")),
        (None, None) => out.push_str("  - Forecast unavailable\n"),
    }
    out.push('\n');

    let burden = &output.burden.burden;
    out.push_str("--- HISTORICAL ANALYSIS & ECONOMIC BURDEN ---\n");
    out.push_str(&format!("  - Total Cases Analyzed: {}\n", group_thousands(burden.total_cases)));
    out.push_str(&format!(
        "  - High-Confidence Causal Links Found: {}\n",
        output.causal.links.len()
    ));
    out.push_str(&format!(
        "  - Estimated Economic Burden to Date: ${} USD\n",
        group_thousands(burden.total)
    ));
    out.push_str(&format!(
        "    (direct care ${} + productivity loss ${}; ${:.0}/case treatment, ${:.0}/case productivity loss)\n",
        group_thousands(burden.direct_cost),
        group_thousands(burden.productivity_loss),
        costs.cost_per_case,
        costs.productivity_loss_per_case
    ));
    let roi = &output.burden.roi;
    out.push_str(&format!(
        "  - Prevention ROI: {:.1}% (programme ${}, potential savings ${})\n",
        roi.roi_percent,
        group_thousands(roi.prevention_cost),
        group_thousands(roi.potential_savings)
    ));
    if let Some(severity) = output.burden.latest_severity {
        out.push_str(&format!("  - Latest Incidence Severity: {severity}\n"));
    }
    out.push('\n');

    out.push_str("--- MACROECONOMIC CONTEXT ---\n");
    out.push_str(&format!(
        "  - Latest Annual GDP Growth Rate: {:.2}%\n",
        output.macro_context.gdp_growth_rate
    ));
    out.push_str(&format!(
        "  - Latest Annual Inflation Rate: {:.2}%\n",
        output.macro_context.inflation_rate
    ));

    let issues = output.series.issues();
    if !issues.is_empty() {
        out.push_str("\n--- DATA QUALITY ---\n");
        for issue in issues.iter().take(MAX_ISSUES_SHOWN) {
            out.push_str(&format!("  - {issue}\n"));
        }
        if issues.len() > MAX_ISSUES_SHOWN {
            out.push_str(&format!("  - ... and {} more\n", issues.len() - MAX_ISSUES_SHOWN));
        }
    }

    out
}

/// Technical run summary: links, forecast table and validation metrics.
pub fn format_run_summary(output: &PipelineOutput) -> String {
    let mut out = String::new();

    out.push_str("=== hawkeye - run summary ===\n");
    out.push_str(&format!(
        "Unified: {} days | feature rows: {} | data-quality issues: {}\n",
        output.series.len(),
        output.features.len(),
        output.series.issues().len()
    ));

    out.push_str("\nCausal links:\n");
    out.push_str(&format_links(&output.causal.links));

    match &output.forecast {
        Some(f) => {
            let names: Vec<String> = f.features.iter().map(|x| x.name()).collect();
            out.push_str(&format!(
                "\nForecast ({}, {} training rows, features: {}):\n",
                f.regressor.display_name(),
                f.training_rows,
                names.join(", ")
            ));
            out.push_str(&format_forecast_table(&f.points));
            match &f.validation {
                Some(v) => out.push_str(&format_validation(v)),
                None => out.push_str("\nValidation: skipped (training split too small)\n"),
            }
        }
        None => {
            let reason = output
                .forecast_error
                .as_ref()
                .map_or_else(|| "not run".to_string(), |e| e.to_string());
            out.push_str(&format!("\nForecast: omitted ({reason})\n"));
        }
    }

    out
}

fn format_links(links: &[CausalLink]) -> String {
    if links.is_empty() {
        return "  (none)\n".to_string();
    }
    let mut out = String::new();
    out.push_str(&format!("{:<36} {:<20} {:>4} {:>8}\n", "cause", "effect", "lag", "r"));
    out.push_str(&format!("{:-<36} {:-<20} {:->4} {:->8}\n", "", "", "", ""));
    for l in links {
        out.push_str(&format!(
            "{:<36} {:<20} {:>4} {:>8.3}\n",
            truncate(&l.cause.name(), 36),
            truncate(&l.effect.name(), 20),
            l.lag,
            l.correlation
        ));
    }
    out
}

fn format_forecast_table(points: &[ForecastPoint]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<10} {:>10} {:>10} {:>10}\n", "date", "forecast", "lower", "upper"));
    out.push_str(&format!("{:-<10} {:->10} {:->10} {:->10}\n", "", "", "", ""));
    for p in points {
        out.push_str(&format!(
            "{:<10} {:>10.3} {:>10.3} {:>10.3}\n",
            p.date, p.point, p.lower, p.upper
        ));
    }
    out
}

fn format_validation(v: &ValidationReport) -> String {
    format!(
        "\nValidation: train={} held-out={} | MAE={:.4} RMSE={:.4} R²={:.4} | 95% coverage={:.0}%\n",
        v.train_rows,
        v.rows.len(),
        v.mae,
        v.rmse,
        v.r2,
        v.coverage(crate::forecast::INTERVAL_Z) * 100.0
    )
}

/// Whole-number rendering with `,` thousands separators.
pub fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.4), "999");
        assert_eq!(group_thousands(1_000.0), "1,000");
        assert_eq!(group_thousands(8_024_250.0), "8,024,250");
        assert_eq!(group_thousands(-12_345.6), "-12,346");
    }

    fn demo_output(days: usize) -> PipelineOutput {
        use crate::app::pipeline::run_pipeline;
        use crate::data::{DemoConfig, StaticReading, generate_demo};
        use crate::domain::PipelineConfig;

        let demo = generate_demo(&DemoConfig {
            days,
            ..DemoConfig::default()
        })
        .unwrap();
        let reading = StaticReading(demo.live.clone());
        run_pipeline(demo.sources, Some(&reading), &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn briefing_has_every_section() {
        let out = demo_output(90);
        let text = format_briefing(&out, &CostModel::default());

        assert!(text.starts_with("HAWKEYE - EXECUTIVE BRIEFING\n"));
        let dashboard = text.find("--- CURRENT RISK DASHBOARD ---").unwrap();
        let burden = text.find("--- HISTORICAL ANALYSIS & ECONOMIC BURDEN ---").unwrap();
        let macro_ctx = text.find("--- MACROECONOMIC CONTEXT ---").unwrap();
        assert!(dashboard < burden && burden < macro_ctx);

        assert!(text.contains(&format!("Live Mosquito Risk Index: {}", out.risk.as_str().to_uppercase())));
        assert!(text.contains("Forecasted Peak:"));
        assert!(text.contains(&format!(
            "Total Cases Analyzed: {}",
            group_thousands(out.burden.burden.total_cases)
        )));
        assert!(text.contains(&format!(
            "Latest Annual GDP Growth Rate: {:.2}%",
            out.macro_context.gdp_growth_rate
        )));
    }

    #[test]
    fn briefing_explains_missing_forecast() {
        let out = demo_output(6);
        assert!(out.forecast.is_none());
        let text = format_briefing(&out, &CostModel::default());
        assert!(text.contains("Forecast unavailable: insufficient data"));

        let summary = format_run_summary(&out);
        assert!(summary.contains("Forecast: omitted (insufficient data"));
    }

    #[test]
    fn run_summary_lists_forecast_rows() {
        let out = demo_output(90);
        let summary = format_run_summary(&out);
        let f = out.forecast.as_ref().unwrap();
        assert!(summary.contains("Bayesian ridge"));
        assert!(summary.contains(&f.points[0].date.to_string()));
        assert!(summary.contains("Validation: train="));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("temperature", 20), "temperature");
        assert_eq!(truncate("temperature_rolling_mean_14", 10), "temperatu.");
    }
}
