//! `hawkeye` library crate.
//!
//! The binary (`hawkeye`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - stages are reusable (notebooks, a future scheduler, etc.)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod burden;
pub mod causal;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod forecast;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;
pub mod unify;
