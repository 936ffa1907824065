//! Error types for the Tinbergen data core

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, converting, or resampling observations
#[derive(Debug, Error)]
pub enum TinbergenError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed line {line} (expected 'entry: value'): {text}")]
    FormatError { line: usize, text: String },

    #[error("Shape mismatch: {0}")]
    ShapeError(String),

    #[error("Query time precedes the first observation and no initial value was given")]
    MissingInitialValue,

    #[error(
        "No initial value for behavior '{behavior}' (source '{source_file}', observer '{observer}') \
         at requested start time {start}"
    )]
    MissingInitialValueFor {
        behavior: String,
        source_file: String,
        observer: String,
        start: f64,
    },

    #[error("Converter for '{behavior}' returned {actual} values, expected {expected}")]
    ConversionError {
        behavior: String,
        expected: usize,
        actual: usize,
    },

    #[error("Missing required entry: {0}")]
    MissingEntry(String),

    #[error("Invalid behavior kind: {0}")]
    InvalidKind(String),

    #[error("Duplicate behavior name: {0}")]
    DuplicateBehavior(String),

    #[error("Invalid observation time: {0}")]
    InvalidTime(String),

    #[error("Sampling rate must be positive and finite, got {0}")]
    InvalidRate(f64),

    #[error("Invalid sampling grid: {0}")]
    InvalidGrid(String),

    #[error("Duplicate observer code: {0}")]
    DuplicateObserver(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, TinbergenError>;
