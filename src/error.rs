//! Error types for the merge pipeline.
//!
//! `Error` covers everything that aborts a run. Per-record problems are
//! `LineError`s; the loader logs and skips them and they never escape it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Structurally invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Cannot parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid address {0}")]
    InvalidAddress(String),
}

/// Why a single input line was skipped.
#[derive(Error, Debug)]
pub enum LineError {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("bad address: {0}")]
    Address(#[source] Error),

    #[error("bad coordinate '{value}', country vote for {country} dropped with it")]
    Coordinate { value: String, country: String },

    #[error("range start {start} is after end {end}")]
    Inverted { start: String, end: String },

    #[error("record is not valid UTF-8")]
    Encoding,
}
