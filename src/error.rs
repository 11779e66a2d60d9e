//! Error type for the layers around the analysis core.
//!
//! The analysis functions themselves are total and never return these.
//! Storage, logging setup and the CLI do.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PktlensError {
    /// Filesystem failure while reading or writing captures or logs.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A capture file is not a JSON array of packet records.
    #[error("invalid capture JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A capture name that would escape the storage directory.
    #[error("invalid capture file name '{0}'")]
    InvalidFileName(String),

    /// Refused to write a capture with no packets.
    #[error("refusing to save an empty capture")]
    EmptyCapture,

    /// The named capture does not exist.
    #[error("capture '{0}' not found")]
    NotFound(String),

    /// Bad command-line or runtime configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PktlensError>;
