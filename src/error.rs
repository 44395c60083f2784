use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Field, SourceKind};

/// Exit code for bad input files, schema violations and invalid flags.
pub const EXIT_INPUT: u8 = 2;
/// Exit code when too little data remains to compute a result.
pub const EXIT_INSUFFICIENT: u8 = 3;
/// Exit code for numerical or remote failures.
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Violation of a source table's schema contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("{table} table is missing required column `{column}`")]
    MissingColumn { table: SourceKind, column: Field },
    #[error("{table} table supplies derived column `{column}`")]
    DerivedColumn { table: SourceKind, column: Field },
    #[error("{table} table row {row} has {found} values, expected {expected}")]
    RowWidth {
        table: SourceKind,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{table} table has neither a `date` nor a `year` column")]
    MissingDateColumn { table: SourceKind },
    #[error("failed to read {table} table '{path}': {reason}")]
    Unreadable {
        table: SourceKind,
        path: String,
        reason: String,
    },
}

/// Fatal conditions of the unification stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnifyError {
    #[error("mandatory {0} source is missing")]
    MissingSource(SourceKind),
    #[error("no dated rows in any mandatory source")]
    NoDates,
    #[error("analysis window {start}..={end} is empty")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },
}

/// Failures local to the forecasting stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("insufficient data for forecasting: {rows} usable rows, need {required}")]
    InsufficientData { rows: usize, required: usize },
    #[error("none of the configured forecast features exist in the feature table")]
    NoFeatures,
    #[error("model fit failed: {0}")]
    Numerical(String),
}

/// Why the live weather reading is unavailable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LiveWeatherError {
    #[error("missing OPENWEATHER_API_KEY in environment (.env)")]
    MissingApiKey,
    #[error("weather request timed out")]
    Timeout,
    #[error("weather request failed: {0}")]
    Transport(String),
    #[error("weather request failed with status {0}")]
    Status(u16),
    #[error("unexpected weather payload: {0}")]
    Payload(String),
}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        AppError::new(EXIT_INPUT, err.to_string())
    }
}

impl From<UnifyError> for AppError {
    fn from(err: UnifyError) -> Self {
        let code = match err {
            UnifyError::MissingSource(_) => EXIT_INPUT,
            UnifyError::NoDates | UnifyError::EmptyWindow { .. } => EXIT_INSUFFICIENT,
        };
        AppError::new(code, err.to_string())
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        let code = match err {
            ForecastError::InsufficientData { .. } => EXIT_INSUFFICIENT,
            ForecastError::NoFeatures => EXIT_INPUT,
            ForecastError::Numerical(_) => EXIT_RUNTIME,
        };
        AppError::new(code, err.to_string())
    }
}

impl From<LiveWeatherError> for AppError {
    fn from(err: LiveWeatherError) -> Self {
        AppError::new(EXIT_RUNTIME, err.to_string())
    }
}
