// Error Types
// Failures that can stop the detector from being built or a batch file from
// being read. Detection itself is total.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("stop-word list is corrupt at line {line}: {reason}")]
    StopWords { line: usize, reason: String },
    #[error("stop-word list contains no entries")]
    EmptyStopWords,
    #[error("invalid weight table: {0}")]
    InvalidWeights(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
