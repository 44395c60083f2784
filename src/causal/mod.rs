//! Consensus lagged-link discovery.
//!
//! A candidate driver `v` is linked to the target only when two cheap tests agree:
//!
//! - **lagged correlation**: `max |corr(target(t), v(t - lag))|` over `lag = 1..=L` exceeds `τ`
//! - **one-step association**: `corr(target(t), v(t - 1))` beats the target's own lag-1
//!   autocorrelation in absolute value and exceeds `τ`
//!
//! The one-step test is a heuristic in the spirit of Granger causality, not a
//! hypothesis test: it compares one cross-correlation against one
//! autocorrelation and fits nothing. A stronger multivariate test would
//! replace `one_step_accepts` only.

use tracing::{debug, info, warn};

use crate::domain::{CausalConfig, CausalLink, Feature, FeatureTable};
use crate::math::lagged_correlation;

/// Result of a discovery pass, including the per-test acceptance sets.
#[derive(Debug, Clone, Default)]
pub struct CausalDiscovery {
    /// Candidates accepted by the lagged-correlation test (candidate order).
    pub lagged_accepted: Vec<Feature>,
    /// Candidates accepted by the one-step association test (candidate order).
    pub one_step_accepted: Vec<Feature>,
    /// One link per candidate accepted by both tests.
    pub links: Vec<CausalLink>,
}

/// Correlation at each lag `1..=max_lag` (index 0 is lag 1).
pub fn lag_profile(target: &[f64], driver: &[f64], max_lag: usize) -> Vec<Option<f64>> {
    (1..=max_lag)
        .map(|lag| lagged_correlation(target, driver, lag))
        .collect()
}

/// Lag (1-based) with the largest absolute correlation; ties keep the smaller lag.
pub fn strongest_lag(profile: &[Option<f64>]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, r) in profile.iter().enumerate() {
        let Some(r) = *r else { continue };
        if best.is_none_or(|(_, b)| r.abs() > b.abs()) {
            best = Some((idx + 1, r));
        }
    }
    best
}

pub fn lagged_accepts(profile: &[Option<f64>], threshold: f64) -> bool {
    strongest_lag(profile).is_some_and(|(_, r)| r.abs() > threshold)
}

pub fn one_step_accepts(target: &[f64], driver: &[f64], threshold: f64) -> bool {
    let base = lagged_correlation(target, target, 1).unwrap_or(0.0);
    let Some(cross) = lagged_correlation(target, driver, 1) else {
        return false;
    };
    cross.abs() > base.abs() && cross.abs() > threshold
}

/// Scan the candidates in `config` against the target column of `table`.
///
/// An empty link set is a valid outcome.
pub fn discover(table: &FeatureTable, config: &CausalConfig) -> CausalDiscovery {
    let Some(target) = table.column(config.target) else {
        warn!(target = %config.target, "target column missing; no causal scan");
        return CausalDiscovery::default();
    };

    let mut candidates: Vec<Feature> = Vec::with_capacity(config.candidates.len());
    for c in &config.candidates {
        if *c != config.target && !candidates.contains(c) {
            candidates.push(*c);
        }
    }

    let mut out = CausalDiscovery::default();
    for candidate in candidates {
        let Some(driver) = table.column(candidate) else {
            warn!(candidate = %candidate, "candidate column missing; skipped");
            continue;
        };

        let profile = lag_profile(&target, &driver, config.max_lag);
        let in_lagged = lagged_accepts(&profile, config.threshold);
        let in_one_step = one_step_accepts(&target, &driver, config.threshold);
        debug!(candidate = %candidate, in_lagged, in_one_step, "causal tests");

        if in_lagged {
            out.lagged_accepted.push(candidate);
        }
        if in_one_step {
            out.one_step_accepted.push(candidate);
        }
        if in_lagged && in_one_step {
            if let Some((lag, correlation)) = strongest_lag(&profile) {
                info!(cause = %candidate, effect = %config.target, lag, correlation, "consensus link");
                out.links.push(CausalLink {
                    cause: candidate,
                    effect: config.target,
                    lag,
                    correlation,
                });
            }
        }
    }

    if out.links.is_empty() {
        info!("no consensus links found");
    }
    out
}
