// Errors raised while loading a registration file.
// Any bad row fails the whole load; partial tables are never returned.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("missing required column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("line {line}: malformed row: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: missing value for column '{column}'")]
    MissingValue { line: u64, column: &'static str },

    #[error("line {line}: invalid date '{value}' (expected YYYY-MM or YYYY-MM-DD)")]
    InvalidDate { line: u64, value: String },

    #[error("line {line}: unknown vehicle category '{value}'")]
    InvalidCategory { line: u64, value: String },

    #[error("line {line}: registrations '{value}' is not a non-negative integer")]
    InvalidCount { line: u64, value: String },

    #[error("line {line}: duplicate record for {period} / {category} / {manufacturer}")]
    DuplicateRecord {
        line: u64,
        period: String,
        category: String,
        manufacturer: String,
    },
}

impl LoadError {
    /// Line number of the offending row, when the error is row-specific
    pub fn line(&self) -> Option<u64> {
        match self {
            LoadError::Open { .. } | LoadError::MissingColumn { .. } => None,
            LoadError::Malformed { line, .. }
            | LoadError::MissingValue { line, .. }
            | LoadError::InvalidDate { line, .. }
            | LoadError::InvalidCategory { line, .. }
            | LoadError::InvalidCount { line, .. }
            | LoadError::DuplicateRecord { line, .. } => Some(*line),
        }
    }
}
