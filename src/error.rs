//! Error type shared by every pipeline stage.
//!
//! Row-level parse failures never surface here: they are reported through
//! [`RowRejection`](crate::record::RowRejection) and the row is skipped.
//! `PipelineError` covers the failures that stop a stage or a whole run.

use thiserror::Error;

/// Failures raised by readers, stages, writers and the remote fetcher.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "remote")]
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("invalid item: {0}")]
    ItemError(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

impl From<tempfile::PersistError> for PipelineError {
    fn from(err: tempfile::PersistError) -> Self {
        PipelineError::Io(err.error)
    }
}
