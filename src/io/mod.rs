//! Input/output helpers.
//!
//! - CSV ingest + schema contract (`ingest`)
//! - result exports (CSV/JSON/text) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
