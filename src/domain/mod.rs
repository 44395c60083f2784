//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - field and feature identifiers (`Field`, `Feature`)
//! - input tables and their schema contract (`SourceKind`, `SourceTable`)
//! - stage tables (`UnifiedSeries`, `FeatureTable`) and outputs (`CausalLink`, `ForecastPoint`)
//! - run configuration (`PipelineConfig` and its per-stage parts)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
