use polars::error::PolarsError;
use std::io::Error as IoError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cannot read {} as a table: {reason}", .path.display())]
    InputConversion { path: PathBuf, reason: String },

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },
}
