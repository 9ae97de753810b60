use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions raised while aggregating run directories.
///
/// None of these are recovered locally: any of them means the upstream
/// experiment output is not shaped the way the aggregation expects.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("unable to find data directory: '{path}'")]
    DataDirMissing { path: PathBuf },

    /// A data line's token count disagrees with its legend.
    #[error("data fields mismatch in {path}: legend {fields:?}, line {tokens:?}")]
    ParseSchema {
        path: String,
        fields: Vec<String>,
        tokens: Vec<String>,
    },

    #[error("length mismatch: '{left}' vs '{right}'")]
    LengthMismatch { left: String, right: String },

    #[error("{what}: all={all} odd={odd} even={even}")]
    RecordCountMismatch {
        what: &'static str,
        all: usize,
        odd: usize,
        even: usize,
    },

    /// Two runs produced different column sets.
    #[error("header mismatch in run {run}: expected [{expected}], found [{found}]")]
    HeaderMismatch {
        run: String,
        expected: String,
        found: String,
    },

    #[error("missing field '{field}'")]
    MissingField { field: String },

    #[error("field '{field}' is not an integer: '{value}'")]
    InvalidInteger { field: String, value: String },

    #[error("malformed command log segment: '{segment}'")]
    MalformedCommandLog { segment: String },

    #[error("no record at update {update} in {what}")]
    MissingPhaseBoundary { what: &'static str, update: String },

    #[error("no run directories were aggregated")]
    NoRuns,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AggregateError>;
